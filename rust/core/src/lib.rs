// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC Takeoff Core
//!
//! STEP/IFC reading layer built with [nom](https://docs.rs/nom).
//! Provides zero-copy tokenization, fast entity scanning and a typed
//! capability interface over building elements.
//!
//! ## Overview
//!
//! - **STEP Tokenization**: nom parsers for entity records, header and
//!   string escapes (`\X2\…\X0\`)
//! - **Entity Scanning**: [memchr](https://docs.rs/memchr) accelerated,
//!   quote-aware record discovery
//! - **Lazy Decoding**: records are tokenized only when followed
//! - **Model**: [`IfcModel`] with by-type lists, inverse relationship
//!   indices and the project length unit
//! - **Capabilities**: [`ElementView`] and [`BuildingModel`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifc_takeoff_core::{BuildingModel, ElementView, IfcModel, IfcType};
//!
//! let model = IfcModel::open("model.ifc")?;
//! for id in model.by_type(IfcType::IfcBeam) {
//!     let beam = model.element(id)?;
//!     println!("{:?}", beam.try_get_attribute("Name")?);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize` for the capability value types

pub mod attribute;
pub mod decoder;
pub mod element;
pub mod error;
pub mod model;
pub mod parser;
pub mod schema;
pub mod step_string;
pub mod units;
pub mod view;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use attribute::{AttributeValue, DecodedEntity};
pub use decoder::{EntityDecoder, EntityIndex};
pub use element::IfcElement;
pub use error::{Error, Result};
pub use model::{IfcModel, ProjectInfo};
pub use parser::{parse_entity, parse_header, EntityScanner, StepHeader, Token};
pub use schema::IfcType;
pub use step_string::decode_step_string;
pub use units::{extract_length_unit, get_si_prefix_multiplier, LengthUnit};
pub use view::{
    BodyItem, BuildingModel, ElementView, Material, MaterialProfile, MaterialSelect, Property,
    PropertySet, PropertyValue, Quantity, QuantityKind, QuantitySet,
};
