// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability interface over building elements
//!
//! Extraction code talks to these traits rather than to the STEP decoder, so
//! it can run against [`IfcModel`](crate::IfcModel) or an in-memory fake.
//!
//! Absent data is `None` or an empty vector. `Err` means the object graph is
//! broken (a dangling reference, a record that will not parse).

use std::fmt;

use crate::error::Result;
use crate::schema::IfcType;
use crate::units::LengthUnit;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Read access to one building element
pub trait ElementView {
    /// STEP id (`#n`)
    fn express_id(&self) -> u32;

    /// Direct string attribute by IFC name (`Name`, `Description`, `GlobalId`,
    /// `ObjectType`, `Tag`). Unknown names and `$` read as `None`.
    fn try_get_attribute(&self, name: &str) -> Result<Option<String>>;

    /// Property sets attached through `IfcRelDefinesByProperties`
    fn try_get_property_sets(&self) -> Result<Vec<PropertySet>>;

    /// Materials attached through `IfcRelAssociatesMaterial`
    fn try_get_materials(&self) -> Result<Vec<MaterialSelect>>;

    /// Element quantity sets attached through `IfcRelDefinesByProperties`
    fn try_get_quantities(&self) -> Result<Vec<QuantitySet>>;

    /// Items of the `Body` shape representation
    fn try_get_body_items(&self) -> Result<Vec<BodyItem>>;
}

/// A model that can enumerate and open elements
pub trait BuildingModel {
    type Element<'m>: ElementView
    where
        Self: 'm;

    /// Ids of all instances of a type (and its subtypes), in file order
    fn by_type(&self, ifc_type: IfcType) -> Vec<u32>;

    /// Open one element
    fn element(&self, id: u32) -> Result<Self::Element<'_>>;

    /// Declared project length unit
    fn length_unit(&self) -> LengthUnit;
}

/// Nominal value of a single-value property
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum PropertyValue {
    Text(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
}

impl PropertyValue {
    /// Numeric view, for measure-typed values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Real(v) => Some(*v),
            PropertyValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Real(v) => write!(f, "{}", v),
            PropertyValue::Integer(v) => write!(f, "{}", v),
            PropertyValue::Boolean(true) => f.write_str("True"),
            PropertyValue::Boolean(false) => f.write_str("False"),
        }
    }
}

/// `IfcPropertySingleValue`; other property kinds carry no value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Property {
    pub name: String,
    pub value: Option<PropertyValue>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PropertySet {
    pub id: u32,
    pub name: Option<String>,
    pub properties: Vec<Property>,
}

impl PropertySet {
    /// First property with this exact name
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Material {
    pub id: u32,
    pub name: Option<String>,
    /// Properties from every material-property definition of this material
    pub properties: Vec<Property>,
}

impl Material {
    /// `SpecificGravity` from the material's property definitions
    pub fn specific_gravity(&self) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == "SpecificGravity")
            .and_then(|p| p.value.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct MaterialProfile {
    pub name: Option<String>,
    /// `ProfileName` of the referenced profile definition
    pub profile_name: Option<String>,
    pub material: Option<Material>,
}

/// Resolved `RelatingMaterial` of a material association
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum MaterialSelect {
    Material(Material),
    /// `IfcMaterialProfileSet`, reached directly or through its usage
    ProfileSet {
        name: Option<String>,
        profiles: Vec<MaterialProfile>,
    },
    /// `IfcMaterialLayerSet`, reached directly or through its usage
    LayerSet { materials: Vec<Material> },
    List(Vec<Material>),
    Other(String),
}

impl MaterialSelect {
    /// Every material reachable from this selection
    pub fn materials(&self) -> Vec<&Material> {
        match self {
            MaterialSelect::Material(m) => vec![m],
            MaterialSelect::ProfileSet { profiles, .. } => {
                profiles.iter().filter_map(|p| p.material.as_ref()).collect()
            }
            MaterialSelect::LayerSet { materials } | MaterialSelect::List(materials) => {
                materials.iter().collect()
            }
            MaterialSelect::Other(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum QuantityKind {
    Length,
    Area,
    Volume,
    Count,
    Weight,
    Time,
}

impl QuantityKind {
    pub fn from_type(ifc_type: IfcType) -> Option<Self> {
        Some(match ifc_type {
            IfcType::IfcQuantityLength => QuantityKind::Length,
            IfcType::IfcQuantityArea => QuantityKind::Area,
            IfcType::IfcQuantityVolume => QuantityKind::Volume,
            IfcType::IfcQuantityCount => QuantityKind::Count,
            IfcType::IfcQuantityWeight => QuantityKind::Weight,
            IfcType::IfcQuantityTime => QuantityKind::Time,
            _ => return None,
        })
    }
}

/// A physical quantity, value in model units
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Quantity {
    pub name: String,
    pub kind: QuantityKind,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QuantitySet {
    pub id: u32,
    pub name: Option<String>,
    pub quantities: Vec<Quantity>,
}

/// Item of a `Body` representation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum BodyItem {
    /// Extrusion depth in model units
    ExtrudedAreaSolid { depth: f64 },
    Other(String),
}
