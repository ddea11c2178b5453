// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Decoder - On-demand entity parsing
//!
//! Lazily decode IFC entities from byte offsets. Only the records a caller
//! actually follows are ever tokenized.

use crate::attribute::{AttributeValue, DecodedEntity};
use crate::error::{Error, Result};
use crate::parser::parse_entity;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Pre-built entity index type
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Entity decoder for lazy parsing
///
/// One decoder per thread: the cache is not shared, the index is.
pub struct EntityDecoder<'a> {
    content: &'a str,
    /// Decoded entities by id
    cache: FxHashMap<u32, Arc<DecodedEntity>>,
    entity_index: Arc<EntityIndex>,
}

impl<'a> EntityDecoder<'a> {
    /// Create decoder with shared Arc index (for parallel processing)
    pub fn with_arc_index(content: &'a str, index: Arc<EntityIndex>) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            entity_index: index,
        }
    }

    /// Decode the record at a byte range, bypassing the cache lookup
    fn decode_at(&mut self, start: usize, end: usize) -> Result<Arc<DecodedEntity>> {
        let line = self
            .content
            .get(start..end)
            .ok_or_else(|| Error::parse(start, "entity range out of bounds"))?;
        let (id, ifc_type, tokens) = parse_entity(line).map_err(|e| match e {
            Error::Parse { message, .. } => Error::parse(start, message),
            other => other,
        })?;

        let attributes = tokens.iter().map(AttributeValue::from_token).collect();
        let entity = Arc::new(DecodedEntity::new(id, ifc_type, attributes));
        self.cache.insert(id, Arc::clone(&entity));
        Ok(entity)
    }

    /// Decode entity by ID - O(1) lookup using entity index
    pub fn decode_by_id(&mut self, entity_id: u32) -> Result<Arc<DecodedEntity>> {
        if let Some(entity) = self.cache.get(&entity_id) {
            return Ok(Arc::clone(entity));
        }

        let (start, end) = self
            .entity_index
            .get(&entity_id)
            .copied()
            .ok_or(Error::EntityNotFound(entity_id))?;

        self.decode_at(start, end)
    }

    /// Resolve entity reference (follow #ID)
    /// Returns None for null/derived values
    pub fn resolve_ref(&mut self, attr: &AttributeValue) -> Result<Option<Arc<DecodedEntity>>> {
        match attr.as_entity_ref() {
            Some(id) => Ok(Some(self.decode_by_id(id)?)),
            None => Ok(None),
        }
    }

    /// Resolve list of entity references
    /// Null is an empty list; any other non-list value is an error
    pub fn resolve_ref_list(&mut self, attr: &AttributeValue) -> Result<Vec<Arc<DecodedEntity>>> {
        if attr.is_null() {
            return Ok(Vec::new());
        }
        let list = attr
            .as_list()
            .ok_or_else(|| Error::parse(0, format!("Expected list, found {:?}", attr)))?;

        let mut entities = Vec::with_capacity(list.len());
        for item in list {
            if let Some(id) = item.as_entity_ref() {
                entities.push(self.decode_by_id(id)?);
            }
        }
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IfcType;
    use crate::test_fixtures::decoder_for;

    #[test]
    fn test_decode_by_id() {
        let content = r#"
#1=IFCPROJECT('guid',$,$,$,$,$,$,$,$);
#5=IFCBEAM('guid2',$,'Beam-001',$,$,$,$,$,$);
#10=IFCCOLUMN('guid3',$,'Column-001',$,$,$,$,$,$);
"#;

        let mut decoder = decoder_for(content);

        let entity = decoder.decode_by_id(5).unwrap();
        assert_eq!(entity.id, 5);
        assert_eq!(entity.ifc_type, IfcType::IfcBeam);
        assert_eq!(entity.get_string(2), Some("Beam-001"));
    }

    #[test]
    fn test_missing_entity() {
        let mut decoder = decoder_for("#1=IFCBEAM('g',$,$,$,$,$,$,$,$);");
        assert!(matches!(
            decoder.decode_by_id(999),
            Err(Error::EntityNotFound(999))
        ));
    }

    #[test]
    fn test_resolve_ref() {
        let content = r#"
#1=IFCPROJECT('guid',$,$,$,$,$,$,$,$);
#2=IFCBEAM('guid2',$,$,$,$,$,#1,$,$);
"#;

        let mut decoder = decoder_for(content);

        let beam = decoder.decode_by_id(2).unwrap();
        let referenced = decoder.resolve_ref(&beam.attributes[6]).unwrap().unwrap();
        assert_eq!(referenced.id, 1);
        assert_eq!(referenced.ifc_type, IfcType::IfcProject);

        assert!(decoder.resolve_ref(&beam.attributes[7]).unwrap().is_none());
    }

    #[test]
    fn test_resolve_ref_list() {
        let content = r#"
#2=IFCBEAM('guid1',$,$,$,$,$,$,$,$);
#3=IFCCOLUMN('guid2',$,$,$,$,$,$,$,$);
#4=IFCRELASSOCIATESMATERIAL('guid3',$,$,$,(#2,#3),#9);
#5=IFCRELASSOCIATESMATERIAL('guid4',$,$,$,(#2,#77),#9);
"#;

        let mut decoder = decoder_for(content);

        let rel = decoder.decode_by_id(4).unwrap();
        let elements = decoder.resolve_ref_list(&rel.attributes[4]).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].ifc_type, IfcType::IfcBeam);
        assert_eq!(elements[1].ifc_type, IfcType::IfcColumn);

        assert!(decoder.resolve_ref_list(&AttributeValue::Null).unwrap().is_empty());

        let broken = decoder.decode_by_id(5).unwrap();
        assert!(decoder.resolve_ref_list(&broken.attributes[4]).is_err());
    }

    #[test]
    fn test_repeat_decode_hits_cache() {
        let content = r#"
#1=IFCPROJECT('guid',$,$,$,$,$,$,$,$);
#2=IFCWALL('guid2',$,$,$,$,$,$,$);
"#;

        let mut decoder = decoder_for(content);
        let first = decoder.decode_by_id(1).unwrap();
        decoder.decode_by_id(2).unwrap();
        let again = decoder.decode_by_id(1).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }
}
