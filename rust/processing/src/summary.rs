// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-model summary: project header, building elements, materials and
//! every property set.

use ifc_takeoff_core::{BuildingModel, ElementView, IfcModel, IfcType, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNNAMED: &str = "名称なし";
pub const NO_DESCRIPTION: &str = "説明なし";
pub const NO_VALUE: &str = "値なし";

/// Element types listed in [`ModelSummary::building_elements`]
pub const SUMMARY_TYPES: [IfcType; 6] = [
    IfcType::IfcWall,
    IfcType::IfcSlab,
    IfcType::IfcColumn,
    IfcType::IfcBeam,
    IfcType::IfcDoor,
    IfcType::IfcWindow,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    pub description: String,
    pub global_id: Option<String>,
}

impl Default for ProjectSummary {
    fn default() -> Self {
        Self {
            name: UNNAMED.to_string(),
            description: NO_DESCRIPTION.to_string(),
            global_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSummary {
    pub id: u32,
    #[serde(rename = "type")]
    pub ifc_type: String,
    pub name: String,
    pub global_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSummary {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub project_info: ProjectSummary,
    pub building_elements: Vec<ElementSummary>,
    pub materials: Vec<MaterialSummary>,
    /// Property set name → property name → value
    pub properties: IndexMap<String, IndexMap<String, Value>>,
}

/// Missing or empty text becomes `fallback`
fn or_placeholder(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Collect the summary of a whole model.
pub fn summarize(model: &IfcModel) -> Result<ModelSummary> {
    let project_info = match model.project()? {
        Some(project) => ProjectSummary {
            name: or_placeholder(project.name, UNNAMED),
            description: or_placeholder(project.description, NO_DESCRIPTION),
            global_id: project.global_id,
        },
        None => ProjectSummary::default(),
    };

    let mut building_elements = Vec::new();
    for ifc_type in SUMMARY_TYPES {
        // Subtypes are reported under the queried type
        for id in model.by_type(ifc_type) {
            let element = model.element(id)?;
            building_elements.push(ElementSummary {
                id,
                ifc_type: ifc_type.name(),
                name: or_placeholder(element.try_get_attribute("Name")?, UNNAMED),
                global_id: element.try_get_attribute("GlobalId")?,
            });
        }
    }

    let mut materials = Vec::new();
    for id in model.by_type(IfcType::IfcMaterial) {
        let material = model.material(id)?;
        materials.push(MaterialSummary {
            id,
            name: or_placeholder(material.name, UNNAMED),
        });
    }

    // A later set with the same name replaces the earlier one in place
    let mut properties: IndexMap<String, IndexMap<String, Value>> = IndexMap::new();
    for id in model.by_type(IfcType::IfcPropertySet) {
        let pset = model.property_set(id)?;
        let mut values = IndexMap::new();
        for property in pset.properties {
            let value = match property.value {
                Some(value) => serde_json::to_value(value).unwrap_or(Value::Null),
                None => Value::String(NO_VALUE.to_string()),
            };
            values.insert(property.name, value);
        }
        properties.insert(or_placeholder(pset.name, UNNAMED), values);
    }

    tracing::debug!(
        elements = building_elements.len(),
        materials = materials.len(),
        property_sets = properties.len(),
        "Model summarized"
    );

    Ok(ModelSummary {
        project_info,
        building_elements,
        materials,
        properties,
    })
}

/// `Pset.Property` names in summary order
pub fn list_properties(summary: &ModelSummary) -> Vec<String> {
    summary
        .properties
        .iter()
        .flat_map(|(pset, props)| props.keys().map(move |prop| format!("{}.{}", pset, prop)))
        .collect()
}
