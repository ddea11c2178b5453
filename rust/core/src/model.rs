// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory IFC model
//!
//! Holds the file text plus the indices needed to navigate it: id → byte
//! range, type → ids in file order, and the inverse relationship maps that
//! IFC only stores on the relationship side.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::decoder::{EntityDecoder, EntityIndex};
use crate::element::{read_material, read_property_set, IfcElement};
use crate::error::{Error, Result};
use crate::parser::{parse_header, EntityScanner};
use crate::schema::IfcType;
use crate::units::{extract_length_unit, LengthUnit};
use crate::view::{BuildingModel, Material, PropertySet};

/// Project header attributes
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInfo {
    pub id: u32,
    pub global_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A parsed IFC file
pub struct IfcModel {
    content: String,
    schema: String,
    index: Arc<EntityIndex>,
    types: FxHashMap<IfcType, Vec<u32>>,
    /// element → IfcRelDefinesByProperties ids
    defined_by: FxHashMap<u32, Vec<u32>>,
    /// element → IfcRelAssociatesMaterial ids
    associations: FxHashMap<u32, Vec<u32>>,
    /// material → material property definition ids
    material_properties: FxHashMap<u32, Vec<u32>>,
    /// Relationship records that could not be decoded while indexing
    malformed: Vec<u32>,
    length_unit: LengthUnit,
}

impl IfcModel {
    /// Read and index a model from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let content = String::from_utf8(bytes).map_err(|_| Error::Encoding)?;
        Self::from_content(content)
    }

    /// Index a model from its STEP text
    pub fn from_content(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        let header = parse_header(&content)?;

        let mut index = EntityIndex::default();
        let mut types: FxHashMap<IfcType, Vec<u32>> = FxHashMap::default();
        {
            let mut scanner = EntityScanner::from_offset(&content, header.data_start);
            while let Some((id, type_name, start, end)) = scanner.next_entity() {
                index.insert(id, (start, end));
                if let Some(ifc_type) = IfcType::from_str(type_name) {
                    types.entry(ifc_type).or_default().push(id);
                }
            }
        }

        let mut model = Self {
            content,
            schema: header.schema,
            index: Arc::new(index),
            types,
            defined_by: FxHashMap::default(),
            associations: FxHashMap::default(),
            material_properties: FxHashMap::default(),
            malformed: Vec::new(),
            length_unit: LengthUnit::METRE,
        };
        model.build_inverse_indices();
        model.length_unit = model.detect_length_unit();
        Ok(model)
    }

    fn build_inverse_indices(&mut self) {
        let mut defined_by: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        let mut associations: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        let mut material_properties: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        let mut malformed = Vec::new();

        let mut decoder = self.decoder();

        // IfcRelDefinesByProperties / IfcRelAssociatesMaterial:
        // RelatedObjects [4], Relating* [5]
        let relations = [
            (IfcType::IfcRelDefinesByProperties, &mut defined_by),
            (IfcType::IfcRelAssociatesMaterial, &mut associations),
        ];
        for (rel_type, target) in relations {
            for &rel_id in self.ids(rel_type) {
                match decoder.decode_by_id(rel_id) {
                    Ok(rel) => {
                        for related in rel.get_refs(4) {
                            target.entry(related).or_default().push(rel_id);
                        }
                    }
                    Err(_) => malformed.push(rel_id),
                }
            }
        }

        // IFC4 IfcMaterialProperties(Name, Description, Properties, Material)
        // IFC2X3 IfcExtendedMaterialProperties(Material, ExtendedProperties, ...)
        let definitions = [
            (IfcType::IfcMaterialProperties, 3),
            (IfcType::IfcExtendedMaterialProperties, 0),
        ];
        for (def_type, material_attr) in definitions {
            for &def_id in self.ids(def_type) {
                match decoder.decode_by_id(def_id) {
                    Ok(def) => {
                        if let Some(material) = def.get_ref(material_attr) {
                            material_properties.entry(material).or_default().push(def_id);
                        }
                    }
                    Err(_) => malformed.push(def_id),
                }
            }
        }

        drop(decoder);
        self.defined_by = defined_by;
        self.associations = associations;
        self.material_properties = material_properties;
        self.malformed = malformed;
    }

    fn detect_length_unit(&self) -> LengthUnit {
        let Some(&project_id) = self.ids(IfcType::IfcProject).first() else {
            return LengthUnit::METRE;
        };
        let mut decoder = self.decoder();
        extract_length_unit(&mut decoder, project_id).unwrap_or(LengthUnit::METRE)
    }

    /// Fresh decoder sharing this model's index
    pub fn decoder(&self) -> EntityDecoder<'_> {
        EntityDecoder::with_arc_index(&self.content, Arc::clone(&self.index))
    }

    /// FILE_SCHEMA identifier, e.g. `IFC4`
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Ids of exactly this type, in file order
    fn ids(&self, ifc_type: IfcType) -> &[u32] {
        self.types.get(&ifc_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Relationship or definition records skipped while indexing
    pub fn malformed_records(&self) -> &[u32] {
        &self.malformed
    }

    pub(crate) fn defined_by(&self, element: u32) -> &[u32] {
        self.defined_by.get(&element).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn associations(&self, element: u32) -> &[u32] {
        self.associations.get(&element).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn material_property_defs(&self, material: u32) -> &[u32] {
        self.material_properties
            .get(&material)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First IfcProject in the file
    pub fn project(&self) -> Result<Option<ProjectInfo>> {
        let Some(&id) = self.ids(IfcType::IfcProject).first() else {
            return Ok(None);
        };
        let project = self.decoder().decode_by_id(id)?;
        let text = |i: usize| project.get_string(i).map(str::to_string);
        Ok(Some(ProjectInfo {
            id,
            global_id: text(0),
            name: text(2),
            description: text(3),
        }))
    }

    /// Decode one IfcPropertySet
    pub fn property_set(&self, id: u32) -> Result<PropertySet> {
        read_property_set(&mut self.decoder(), id)
    }

    /// Decode one IfcMaterial with its property definitions
    pub fn material(&self, id: u32) -> Result<Material> {
        read_material(self, &mut self.decoder(), id)
    }
}

impl BuildingModel for IfcModel {
    type Element<'m> = IfcElement<'m>;

    fn by_type(&self, ifc_type: IfcType) -> Vec<u32> {
        let subtypes = ifc_type.with_subtypes();
        if subtypes.len() <= 1 {
            return self.ids(ifc_type).to_vec();
        }
        let mut ids: Vec<u32> = subtypes
            .iter()
            .flat_map(|t| self.ids(*t).iter().copied())
            .collect();
        // File order across subtypes
        ids.sort_unstable_by_key(|id| self.index.get(id).map(|r| r.0).unwrap_or(usize::MAX));
        ids
    }

    fn element(&self, id: u32) -> Result<IfcElement<'_>> {
        IfcElement::open(self, id)
    }

    fn length_unit(&self) -> LengthUnit {
        self.length_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::TWO_MEMBER_MODEL;
    use crate::view::ElementView;

    #[test]
    fn test_open_missing_file() {
        let err = IfcModel::open("/definitely/not/here.ifc").err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ifc");
        std::fs::write(&path, TWO_MEMBER_MODEL).unwrap();

        let model = IfcModel::open(&path).unwrap();
        assert_eq!(model.schema(), "IFC4");
        assert_eq!(model.by_type(IfcType::IfcBeam), vec![100]);
    }

    #[test]
    fn test_rejects_non_step() {
        assert!(matches!(
            IfcModel::from_content("just some text"),
            Err(Error::NotStep(_))
        ));
    }

    #[test]
    fn test_indices_and_unit() {
        let model = IfcModel::from_content(TWO_MEMBER_MODEL).unwrap();
        assert_eq!(model.length_unit(), LengthUnit::MILLIMETRE);
        assert_eq!(model.by_type(IfcType::IfcColumn), vec![200]);
        assert_eq!(model.defined_by(100).len(), 2);
        assert_eq!(model.associations(200).len(), 1);
        assert!(model.malformed_records().is_empty());

        let project = model.project().unwrap().unwrap();
        assert_eq!(project.name.as_deref(), Some("Sample Project"));
    }

    #[test]
    fn test_by_type_includes_standard_case_in_file_order() {
        let content = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n\
#3=IFCBEAMSTANDARDCASE('c',$,'B-2',$,$,$,$,$,$);\n\
#1=IFCBEAM('a',$,'B-1',$,$,$,$,$,$);\n\
#7=IFCBEAM('b',$,'B-3',$,$,$,$,$,$);\n\
ENDSEC;\nEND-ISO-10303-21;\n";
        let model = IfcModel::from_content(content).unwrap();
        assert_eq!(model.by_type(IfcType::IfcBeam), vec![3, 1, 7]);
        assert_eq!(model.by_type(IfcType::IfcBeamStandardCase), vec![3]);
        assert!(model.by_type(IfcType::IfcColumn).is_empty());
        assert_eq!(model.length_unit(), LengthUnit::METRE);

        let element = model.element(1).unwrap();
        assert_eq!(element.express_id(), 1);
        assert!(matches!(model.element(42), Err(Error::EntityNotFound(42))));
    }

    #[test]
    fn test_model_level_lookups() {
        let model = IfcModel::from_content(TWO_MEMBER_MODEL).unwrap();
        let pset = model.property_set(110).unwrap();
        assert_eq!(pset.name.as_deref(), Some("Pset_BeamCommon"));

        let material = model.material(210).unwrap();
        assert_eq!(material.name.as_deref(), Some("SN490B"));
        assert!(material.specific_gravity().is_some());
    }
}
