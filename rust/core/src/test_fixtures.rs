// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::decoder::{EntityDecoder, EntityIndex};
use crate::parser::EntityScanner;

/// IFC4 millimetre model: beam B-1 (pset size/weight, length quantity) and
/// column C-1 (description, material specific gravity, extruded body).
pub(crate) const TWO_MEMBER_MODEL: &str = include_str!("../tests/fixtures/two_members.ifc");

/// Decoder over bare `#id=...;` records, indexed the way `IfcModel` does
pub(crate) fn decoder_for(content: &str) -> EntityDecoder<'_> {
    let mut index = EntityIndex::default();
    let mut scanner = EntityScanner::from_offset(content, 0);
    while let Some((id, _, start, end)) = scanner.next_entity() {
        index.insert(id, (start, end));
    }
    EntityDecoder::with_arc_index(content, Arc::new(index))
}
