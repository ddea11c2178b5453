// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC Takeoff Processing
//!
//! Turns an IFC model into a flat takeoff of beams and columns.
//!
//! - [`extract_elements`]: parallel, order-preserving extraction over any
//!   [`BuildingModel`](ifc_takeoff_core::BuildingModel)
//! - [`resolvers`]: ordered fallback lists for size, weight and length
//! - [`write_csv`] / [`read_csv`]: CSV export and import
//! - [`summarize`]: project, element, material and property overview

pub mod csv_export;
pub mod extract;
pub mod record;
pub mod resolvers;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

pub use csv_export::{read_csv, to_csv_bytes, write_csv, CsvError, CSV_HEADER};
pub use extract::{extract_elements, extract_from_path, extract_record, ExtractError};
pub use record::{ElementRecord, MemberKind, UNDEFINED};
pub use resolvers::{
    resolve_first, FieldResolver, ResolveContext, LENGTH_RESOLVERS, SIZE_RESOLVERS,
    WEIGHT_RESOLVERS,
};
pub use summary::{list_properties, summarize, ModelSummary};
