// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extracted member records.

use std::fmt;
use std::str::FromStr;

use ifc_takeoff_core::IfcType;
use serde::{Deserialize, Serialize};

/// Placeholder for any field that could not be resolved.
pub const UNDEFINED: &str = "未定義";

/// Structural member kinds that are taken off, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Beam,
    Column,
}

impl MemberKind {
    pub const ALL: [MemberKind; 2] = [MemberKind::Beam, MemberKind::Column];

    /// IFC supertype queried for this kind
    pub fn ifc_type(self) -> IfcType {
        match self {
            MemberKind::Beam => IfcType::IfcBeam,
            MemberKind::Column => IfcType::IfcColumn,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemberKind::Beam => "Beam",
            MemberKind::Column => "Column",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beam" => Ok(MemberKind::Beam),
            "Column" => Ok(MemberKind::Column),
            other => Err(format!("unknown member type '{}'", other)),
        }
    }
}

/// One row of the takeoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(rename = "type")]
    pub kind: MemberKind,
    pub name: String,
    pub description: String,
    pub size: String,
    pub weight: String,
    pub length: String,
}

impl ElementRecord {
    /// A record with every derived field set to [`UNDEFINED`]
    pub fn undefined(kind: MemberKind) -> Self {
        Self {
            kind,
            name: UNDEFINED.to_string(),
            description: UNDEFINED.to_string(),
            size: UNDEFINED.to_string(),
            weight: UNDEFINED.to_string(),
            length: UNDEFINED.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_uses_type_key() {
        let record = ElementRecord::undefined(MemberKind::Column);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "Column");
        assert_eq!(json["size"], UNDEFINED);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Beam".parse::<MemberKind>().unwrap(), MemberKind::Beam);
        assert!("Slab".parse::<MemberKind>().is_err());
        assert_eq!(MemberKind::Column.to_string(), "Column");
    }
}
