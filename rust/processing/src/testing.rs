// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory elements and models for unit tests.

use ifc_takeoff_core::{
    BodyItem, BuildingModel, ElementView, Error, IfcType, LengthUnit, MaterialSelect, Property,
    PropertySet, PropertyValue, Quantity, QuantityKind, QuantitySet, Result,
};

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    id: u32,
    name: Option<String>,
    description: Option<String>,
    properties: Vec<Property>,
    materials: Vec<MaterialSelect>,
    quantities: Vec<Quantity>,
    body: Vec<BodyItem>,
    broken: bool,
}

impl FakeElement {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn property(mut self, name: &str, value: PropertyValue) -> Self {
        self.properties.push(Property {
            name: name.to_string(),
            value: Some(value),
        });
        self
    }

    pub fn material(mut self, select: MaterialSelect) -> Self {
        self.materials.push(select);
        self
    }

    pub fn length_quantity(mut self, value: f64) -> Self {
        self.quantities.push(Quantity {
            name: "Length".to_string(),
            kind: QuantityKind::Length,
            value,
        });
        self
    }

    pub fn extrusion(mut self, depth: f64) -> Self {
        self.body.push(BodyItem::ExtrudedAreaSolid { depth });
        self
    }

    /// Every relationship lookup fails as if it pointed at a missing record
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    fn check(&self) -> Result<()> {
        if self.broken {
            Err(Error::EntityNotFound(999))
        } else {
            Ok(())
        }
    }
}

impl ElementView for FakeElement {
    fn express_id(&self) -> u32 {
        self.id
    }

    fn try_get_attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(match name {
            "Name" => self.name.clone(),
            "Description" => self.description.clone(),
            _ => None,
        })
    }

    fn try_get_property_sets(&self) -> Result<Vec<PropertySet>> {
        self.check()?;
        if self.properties.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![PropertySet {
            id: self.id + 1000,
            name: Some("Pset_Test".to_string()),
            properties: self.properties.clone(),
        }])
    }

    fn try_get_materials(&self) -> Result<Vec<MaterialSelect>> {
        self.check()?;
        Ok(self.materials.clone())
    }

    fn try_get_quantities(&self) -> Result<Vec<QuantitySet>> {
        self.check()?;
        if self.quantities.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![QuantitySet {
            id: self.id + 2000,
            name: Some("Qto_Test".to_string()),
            quantities: self.quantities.clone(),
        }])
    }

    fn try_get_body_items(&self) -> Result<Vec<BodyItem>> {
        self.check()?;
        Ok(self.body.clone())
    }
}

/// Beams and columns held in file order
#[derive(Debug, Default)]
pub struct FakeModel {
    pub beams: Vec<FakeElement>,
    pub columns: Vec<FakeElement>,
    pub length_unit: LengthUnit,
}

impl FakeModel {
    fn all(&self) -> impl Iterator<Item = &FakeElement> {
        self.beams.iter().chain(self.columns.iter())
    }
}

impl BuildingModel for FakeModel {
    type Element<'m> = FakeElement;

    fn by_type(&self, ifc_type: IfcType) -> Vec<u32> {
        let list = match ifc_type {
            IfcType::IfcBeam => &self.beams,
            IfcType::IfcColumn => &self.columns,
            _ => return Vec::new(),
        };
        list.iter().map(|e| e.id).collect()
    }

    fn element(&self, id: u32) -> Result<FakeElement> {
        self.all()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(Error::EntityNotFound(id))
    }

    fn length_unit(&self) -> LengthUnit {
        self.length_unit
    }
}
