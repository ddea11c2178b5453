// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`ElementView`] over decoded STEP records
//!
//! Each element owns its own decoder (and cache) so elements can be read
//! from different threads against one shared [`IfcModel`].

use std::cell::RefCell;
use std::sync::Arc;

use crate::attribute::{AttributeValue, DecodedEntity};
use crate::decoder::EntityDecoder;
use crate::error::{Error, Result};
use crate::model::IfcModel;
use crate::schema::IfcType;
use crate::view::{
    BodyItem, ElementView, Material, MaterialProfile, MaterialSelect, Property, PropertySet,
    PropertyValue, Quantity, QuantityKind, QuantitySet,
};

// IfcRoot / IfcProduct attribute positions
const GLOBAL_ID: usize = 0;
const NAME: usize = 2;
const DESCRIPTION: usize = 3;
const OBJECT_TYPE: usize = 4;
const REPRESENTATION: usize = 6;
const TAG: usize = 7;

/// One building element of an [`IfcModel`]
pub struct IfcElement<'m> {
    model: &'m IfcModel,
    entity: Arc<DecodedEntity>,
    decoder: RefCell<EntityDecoder<'m>>,
}

impl<'m> IfcElement<'m> {
    pub(crate) fn open(model: &'m IfcModel, id: u32) -> Result<Self> {
        let mut decoder = model.decoder();
        let entity = decoder.decode_by_id(id)?;
        Ok(Self {
            model,
            entity,
            decoder: RefCell::new(decoder),
        })
    }

    /// Entity type of the element record
    pub fn ifc_type(&self) -> IfcType {
        self.entity.ifc_type
    }

    /// Relating definitions of this element's IfcRelDefinesByProperties
    fn property_definitions(
        &self,
        decoder: &mut EntityDecoder<'m>,
    ) -> Result<Vec<Arc<DecodedEntity>>> {
        let mut definitions = Vec::new();
        for &rel_id in self.model.defined_by(self.entity.id) {
            let rel = decoder.decode_by_id(rel_id)?;
            // RelatingPropertyDefinition [5]
            if let Some(def) = decoder.resolve_ref(rel.get_or_null(5))? {
                definitions.push(def);
            }
        }
        Ok(definitions)
    }
}

impl ElementView for IfcElement<'_> {
    fn express_id(&self) -> u32 {
        self.entity.id
    }

    fn try_get_attribute(&self, name: &str) -> Result<Option<String>> {
        let index = match name {
            "GlobalId" => GLOBAL_ID,
            "Name" => NAME,
            "Description" => DESCRIPTION,
            "ObjectType" => OBJECT_TYPE,
            "Tag" => TAG,
            _ => return Ok(None),
        };
        Ok(self.entity.get_string(index).map(str::to_string))
    }

    fn try_get_property_sets(&self) -> Result<Vec<PropertySet>> {
        let mut decoder = self.decoder.borrow_mut();
        let definitions = self.property_definitions(&mut decoder)?;
        definitions
            .iter()
            .filter(|def| def.ifc_type == IfcType::IfcPropertySet)
            .map(|def| property_set_from(&mut decoder, def))
            .collect()
    }

    fn try_get_materials(&self) -> Result<Vec<MaterialSelect>> {
        let mut decoder = self.decoder.borrow_mut();
        let mut selects = Vec::new();
        for &rel_id in self.model.associations(self.entity.id) {
            let rel = decoder.decode_by_id(rel_id)?;
            // RelatingMaterial [5]
            if let Some(relating) = decoder.resolve_ref(rel.get_or_null(5))? {
                selects.push(material_select(self.model, &mut decoder, &relating)?);
            }
        }
        Ok(selects)
    }

    fn try_get_quantities(&self) -> Result<Vec<QuantitySet>> {
        let mut decoder = self.decoder.borrow_mut();
        let definitions = self.property_definitions(&mut decoder)?;
        let mut sets = Vec::new();
        for def in definitions
            .iter()
            .filter(|def| def.ifc_type == IfcType::IfcElementQuantity)
        {
            // IfcElementQuantity: Name [2], Quantities [5]
            let mut quantities = Vec::new();
            for quantity in decoder.resolve_ref_list(def.get_or_null(5))? {
                let Some(kind) = QuantityKind::from_type(quantity.ifc_type) else {
                    continue;
                };
                // IfcQuantity*: Name [0], value [3]
                if let Some(value) = quantity.get_float(3) {
                    quantities.push(Quantity {
                        name: quantity.get_string(0).unwrap_or_default().to_string(),
                        kind,
                        value,
                    });
                }
            }
            sets.push(QuantitySet {
                id: def.id,
                name: def.get_string(2).map(str::to_string),
                quantities,
            });
        }
        Ok(sets)
    }

    fn try_get_body_items(&self) -> Result<Vec<BodyItem>> {
        let mut decoder = self.decoder.borrow_mut();
        let Some(shape) = decoder.resolve_ref(self.entity.get_or_null(REPRESENTATION))? else {
            return Ok(Vec::new());
        };
        expect_type(&shape, IfcType::IfcProductDefinitionShape)?;

        let mut items = Vec::new();
        // IfcProductDefinitionShape: Representations [2]
        for representation in decoder.resolve_ref_list(shape.get_or_null(2))? {
            // IfcShapeRepresentation: RepresentationIdentifier [1], Items [3]
            if representation.get_string(1) != Some("Body") {
                continue;
            }
            for item in decoder.resolve_ref_list(representation.get_or_null(3))? {
                let body_item = match (item.ifc_type, item.get_float(3)) {
                    // IfcExtrudedAreaSolid: Depth [3]
                    (IfcType::IfcExtrudedAreaSolid, Some(depth)) => {
                        BodyItem::ExtrudedAreaSolid { depth }
                    }
                    (other, _) => BodyItem::Other(other.name()),
                };
                items.push(body_item);
            }
        }
        Ok(items)
    }
}

fn expect_type(entity: &DecodedEntity, expected: IfcType) -> Result<()> {
    if entity.ifc_type == expected {
        Ok(())
    } else {
        Err(Error::UnexpectedType {
            id: entity.id,
            expected: expected.as_str(),
            actual: entity.ifc_type.to_string(),
        })
    }
}

/// Nominal value → property value; `$` and lists have none
fn property_value(value: &AttributeValue) -> Option<PropertyValue> {
    match value.inner() {
        AttributeValue::String(s) => Some(PropertyValue::Text(s.clone())),
        AttributeValue::Float(f) => Some(PropertyValue::Real(*f)),
        AttributeValue::Integer(i) => Some(PropertyValue::Integer(*i)),
        AttributeValue::Enum(_) => match value.as_bool() {
            Some(b) => Some(PropertyValue::Boolean(b)),
            None => value.as_enum().map(|e| PropertyValue::Text(e.to_string())),
        },
        _ => None,
    }
}

/// Properties referenced from a list attribute. Only single values carry a
/// value; other property kinds are listed by name.
fn read_properties(decoder: &mut EntityDecoder, list: &AttributeValue) -> Result<Vec<Property>> {
    let mut properties = Vec::new();
    for prop in decoder.resolve_ref_list(list)? {
        // IfcProperty: Name [0]; IfcPropertySingleValue: NominalValue [2]
        let name = prop.get_string(0).unwrap_or_default().to_string();
        let value = if prop.ifc_type == IfcType::IfcPropertySingleValue {
            prop.get(2).and_then(property_value)
        } else {
            None
        };
        properties.push(Property { name, value });
    }
    Ok(properties)
}

fn property_set_from(decoder: &mut EntityDecoder, pset: &DecodedEntity) -> Result<PropertySet> {
    // IfcPropertySet: Name [2], HasProperties [4]
    Ok(PropertySet {
        id: pset.id,
        name: pset.get_string(2).map(str::to_string),
        properties: read_properties(decoder, pset.get_or_null(4))?,
    })
}

/// Decode an IfcPropertySet by id
pub(crate) fn read_property_set(decoder: &mut EntityDecoder, id: u32) -> Result<PropertySet> {
    let pset = decoder.decode_by_id(id)?;
    expect_type(&pset, IfcType::IfcPropertySet)?;
    property_set_from(decoder, &pset)
}

fn material_from(
    model: &IfcModel,
    decoder: &mut EntityDecoder,
    material: &DecodedEntity,
) -> Result<Material> {
    expect_type(material, IfcType::IfcMaterial)?;

    let mut properties = Vec::new();
    for &def_id in model.material_property_defs(material.id) {
        let def = decoder.decode_by_id(def_id)?;
        let list_index = match def.ifc_type {
            IfcType::IfcExtendedMaterialProperties => 1,
            _ => 2,
        };
        properties.extend(read_properties(decoder, def.get_or_null(list_index))?);
    }

    // IfcMaterial: Name [0]
    Ok(Material {
        id: material.id,
        name: material.get_string(0).map(str::to_string),
        properties,
    })
}

/// Decode an IfcMaterial by id with its property definitions
pub(crate) fn read_material(
    model: &IfcModel,
    decoder: &mut EntityDecoder,
    id: u32,
) -> Result<Material> {
    let material = decoder.decode_by_id(id)?;
    material_from(model, decoder, &material)
}

fn materials_in(
    model: &IfcModel,
    decoder: &mut EntityDecoder,
    list: &AttributeValue,
) -> Result<Vec<Material>> {
    let mut materials = Vec::new();
    for material in decoder.resolve_ref_list(list)? {
        materials.push(material_from(model, decoder, &material)?);
    }
    Ok(materials)
}

fn profile_set(
    model: &IfcModel,
    decoder: &mut EntityDecoder,
    set: &DecodedEntity,
) -> Result<MaterialSelect> {
    expect_type(set, IfcType::IfcMaterialProfileSet)?;

    let mut profiles = Vec::new();
    // IfcMaterialProfileSet: Name [0], MaterialProfiles [2]
    for profile in decoder.resolve_ref_list(set.get_or_null(2))? {
        expect_type(&profile, IfcType::IfcMaterialProfile)?;
        // IfcMaterialProfile: Name [0], Material [2], Profile [3]
        let material = match decoder.resolve_ref(profile.get_or_null(2))? {
            Some(m) => Some(material_from(model, decoder, &m)?),
            None => None,
        };
        // IfcProfileDef: ProfileName [1]
        let profile_name = decoder
            .resolve_ref(profile.get_or_null(3))?
            .and_then(|def| def.get_string(1).map(str::to_string));
        profiles.push(MaterialProfile {
            name: profile.get_string(0).map(str::to_string),
            profile_name,
            material,
        });
    }

    Ok(MaterialSelect::ProfileSet {
        name: set.get_string(0).map(str::to_string),
        profiles,
    })
}

fn layer_set(
    model: &IfcModel,
    decoder: &mut EntityDecoder,
    set: &DecodedEntity,
) -> Result<MaterialSelect> {
    expect_type(set, IfcType::IfcMaterialLayerSet)?;

    let mut materials = Vec::new();
    // IfcMaterialLayerSet: MaterialLayers [0]; IfcMaterialLayer: Material [0]
    for layer in decoder.resolve_ref_list(set.get_or_null(0))? {
        if let Some(material) = decoder.resolve_ref(layer.get_or_null(0))? {
            materials.push(material_from(model, decoder, &material)?);
        }
    }
    Ok(MaterialSelect::LayerSet { materials })
}

/// Resolve a RelatingMaterial record
fn material_select(
    model: &IfcModel,
    decoder: &mut EntityDecoder,
    relating: &DecodedEntity,
) -> Result<MaterialSelect> {
    match relating.ifc_type {
        IfcType::IfcMaterial => Ok(MaterialSelect::Material(material_from(
            model, decoder, relating,
        )?)),
        IfcType::IfcMaterialProfileSet => profile_set(model, decoder, relating),
        IfcType::IfcMaterialProfileSetUsage => {
            // ForProfileSet [0]
            let set = decoder.decode_by_id(required_ref(relating, 0)?)?;
            profile_set(model, decoder, &set)
        }
        IfcType::IfcMaterialLayerSet => layer_set(model, decoder, relating),
        IfcType::IfcMaterialLayerSetUsage => {
            // ForLayerSet [0]
            let set = decoder.decode_by_id(required_ref(relating, 0)?)?;
            layer_set(model, decoder, &set)
        }
        IfcType::IfcMaterialList => Ok(MaterialSelect::List(materials_in(
            model,
            decoder,
            relating.get_or_null(0),
        )?)),
        other => Ok(MaterialSelect::Other(other.name())),
    }
}

fn required_ref(entity: &DecodedEntity, index: usize) -> Result<u32> {
    entity.get_ref(index).ok_or_else(|| {
        Error::parse(
            0,
            format!("#{} attribute {} is not a reference", entity.id, index),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::TWO_MEMBER_MODEL;
    use crate::view::BuildingModel;

    fn wrap(data: &str) -> String {
        format!(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
            data
        )
    }

    #[test]
    fn test_beam_attributes_and_psets() {
        let model = IfcModel::from_content(TWO_MEMBER_MODEL).unwrap();
        let beam = model.element(100).unwrap();

        assert_eq!(beam.ifc_type(), IfcType::IfcBeam);
        assert_eq!(beam.try_get_attribute("Name").unwrap().as_deref(), Some("B-1"));
        assert_eq!(beam.try_get_attribute("Description").unwrap(), None);
        assert_eq!(beam.try_get_attribute("Tag").unwrap().as_deref(), Some("B1"));
        assert_eq!(beam.try_get_attribute("Volume").unwrap(), None);

        let psets = beam.try_get_property_sets().unwrap();
        assert_eq!(psets.len(), 1);
        let pset = &psets[0];
        assert_eq!(pset.name.as_deref(), Some("Pset_BeamCommon"));
        assert_eq!(
            pset.get("ProfileSize").unwrap().value,
            Some(PropertyValue::Text("H-400x200x8x13".into()))
        );
        assert_eq!(pset.get("重量").unwrap().value, Some(PropertyValue::Real(66.0)));
        assert_eq!(
            pset.get("IsExternal").unwrap().value,
            Some(PropertyValue::Boolean(false))
        );
    }

    #[test]
    fn test_beam_quantities() {
        let model = IfcModel::from_content(TWO_MEMBER_MODEL).unwrap();
        let beam = model.element(100).unwrap();

        let sets = beam.try_get_quantities().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(
            sets[0].quantities,
            vec![Quantity {
                name: "Length".into(),
                kind: QuantityKind::Length,
                value: 6000.0
            }]
        );
        assert!(beam.try_get_materials().unwrap().is_empty());
        assert!(beam.try_get_body_items().unwrap().is_empty());
    }

    #[test]
    fn test_column_material_and_body() {
        let model = IfcModel::from_content(TWO_MEMBER_MODEL).unwrap();
        let column = model.element(200).unwrap();

        let materials = column.try_get_materials().unwrap();
        assert_eq!(materials.len(), 1);
        let MaterialSelect::Material(material) = &materials[0] else {
            panic!("expected a single material, got {:?}", materials[0]);
        };
        assert_eq!(material.name.as_deref(), Some("SN490B"));
        assert_eq!(material.specific_gravity(), Some(&PropertyValue::Real(7.85)));

        assert_eq!(
            column.try_get_body_items().unwrap(),
            vec![BodyItem::ExtrudedAreaSolid { depth: 3500.0 }]
        );
        assert!(column.try_get_property_sets().unwrap().is_empty());
    }

    #[test]
    fn test_profile_set_usage() {
        let content = wrap(
            "#1=IFCBEAM('g',$,'B-9',$,$,$,$,$,$);\n\
#2=IFCMATERIAL('SS400',$,$);\n\
#3=IFCISHAPEPROFILEDEF(.AREA.,'H-300x150x6.5x9',$,150.,300.,6.5,9.,13.,$,$);\n\
#4=IFCMATERIALPROFILE('Web',$,#2,#3,$,$);\n\
#5=IFCMATERIALPROFILESET('Steel H',$,(#4),$);\n\
#6=IFCMATERIALPROFILESETUSAGE(#5,$,$);\n\
#7=IFCRELASSOCIATESMATERIAL('r',$,$,$,(#1),#6);",
        );
        let model = IfcModel::from_content(content).unwrap();
        let beam = model.element(1).unwrap();

        let materials = beam.try_get_materials().unwrap();
        let MaterialSelect::ProfileSet { name, profiles } = &materials[0] else {
            panic!("expected a profile set, got {:?}", materials[0]);
        };
        assert_eq!(name.as_deref(), Some("Steel H"));
        assert_eq!(profiles[0].profile_name.as_deref(), Some("H-300x150x6.5x9"));
        assert_eq!(
            profiles[0].material.as_ref().and_then(|m| m.name.as_deref()),
            Some("SS400")
        );
    }

    #[test]
    fn test_dangling_reference_is_an_error() {
        let content = wrap(
            "#1=IFCBEAM('g',$,'B-1',$,$,$,$,$,$);\n\
#2=IFCRELDEFINESBYPROPERTIES('r',$,$,$,(#1),#999);\n\
#3=IFCRELASSOCIATESMATERIAL('m',$,$,$,(#1),#998);",
        );
        let model = IfcModel::from_content(content).unwrap();
        let beam = model.element(1).unwrap();

        assert!(matches!(
            beam.try_get_property_sets(),
            Err(Error::EntityNotFound(999))
        ));
        assert!(beam.try_get_materials().is_err());
        // Direct attributes do not touch the graph
        assert_eq!(beam.try_get_attribute("Name").unwrap().as_deref(), Some("B-1"));
    }

    #[test]
    fn test_representation_of_wrong_type() {
        let content = wrap(
            "#1=IFCCOLUMN('g',$,'C-1',$,$,$,#2,$,$);\n\
#2=IFCMATERIAL('oops',$,$);",
        );
        let model = IfcModel::from_content(content).unwrap();
        let column = model.element(1).unwrap();
        assert!(matches!(
            column.try_get_body_items(),
            Err(Error::UnexpectedType { id: 2, .. })
        ));
    }
}
