// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checking using an enum instead of string comparison. Only the
//! entity types the takeoff pipeline inspects are named; everything else is
//! carried as [`IfcType::Unknown`].

use std::fmt;

/// IFC Entity Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfcType {
    // Structural members
    IfcBeam,
    IfcBeamStandardCase,
    IfcColumn,
    IfcColumnStandardCase,

    // Other building elements (summary only)
    IfcWall,
    IfcWallStandardCase,
    IfcSlab,
    IfcDoor,
    IfcWindow,

    // Context
    IfcProject,
    IfcUnitAssignment,
    IfcSIUnit,
    IfcConversionBasedUnit,
    IfcMeasureWithUnit,

    // Relationships
    IfcRelDefinesByProperties,
    IfcRelAssociatesMaterial,

    // Properties and quantities
    IfcPropertySet,
    IfcPropertySingleValue,
    IfcElementQuantity,
    IfcQuantityLength,
    IfcQuantityArea,
    IfcQuantityVolume,
    IfcQuantityCount,
    IfcQuantityWeight,
    IfcQuantityTime,

    // Materials
    IfcMaterial,
    IfcMaterialList,
    IfcMaterialLayer,
    IfcMaterialLayerSet,
    IfcMaterialLayerSetUsage,
    IfcMaterialProfile,
    IfcMaterialProfileSet,
    IfcMaterialProfileSetUsage,
    IfcMaterialProperties,
    IfcExtendedMaterialProperties,

    // Representation
    IfcProductDefinitionShape,
    IfcShapeRepresentation,
    IfcExtrudedAreaSolid,

    // Fallback for unknown types
    Unknown(u16), // Store hash for unknown types
}

impl IfcType {
    /// Parse IFC type from a STEP entity keyword (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        let upper = s.to_ascii_uppercase();
        let t = match upper.as_str() {
            "IFCBEAM" => Self::IfcBeam,
            "IFCBEAMSTANDARDCASE" => Self::IfcBeamStandardCase,
            "IFCCOLUMN" => Self::IfcColumn,
            "IFCCOLUMNSTANDARDCASE" => Self::IfcColumnStandardCase,

            "IFCWALL" => Self::IfcWall,
            "IFCWALLSTANDARDCASE" => Self::IfcWallStandardCase,
            "IFCSLAB" => Self::IfcSlab,
            "IFCDOOR" => Self::IfcDoor,
            "IFCWINDOW" => Self::IfcWindow,

            "IFCPROJECT" => Self::IfcProject,
            "IFCUNITASSIGNMENT" => Self::IfcUnitAssignment,
            "IFCSIUNIT" => Self::IfcSIUnit,
            "IFCCONVERSIONBASEDUNIT" => Self::IfcConversionBasedUnit,
            "IFCMEASUREWITHUNIT" => Self::IfcMeasureWithUnit,

            "IFCRELDEFINESBYPROPERTIES" => Self::IfcRelDefinesByProperties,
            "IFCRELASSOCIATESMATERIAL" => Self::IfcRelAssociatesMaterial,

            "IFCPROPERTYSET" => Self::IfcPropertySet,
            "IFCPROPERTYSINGLEVALUE" => Self::IfcPropertySingleValue,
            "IFCELEMENTQUANTITY" => Self::IfcElementQuantity,
            "IFCQUANTITYLENGTH" => Self::IfcQuantityLength,
            "IFCQUANTITYAREA" => Self::IfcQuantityArea,
            "IFCQUANTITYVOLUME" => Self::IfcQuantityVolume,
            "IFCQUANTITYCOUNT" => Self::IfcQuantityCount,
            "IFCQUANTITYWEIGHT" => Self::IfcQuantityWeight,
            "IFCQUANTITYTIME" => Self::IfcQuantityTime,

            "IFCMATERIAL" => Self::IfcMaterial,
            "IFCMATERIALLIST" => Self::IfcMaterialList,
            "IFCMATERIALLAYER" => Self::IfcMaterialLayer,
            "IFCMATERIALLAYERSET" => Self::IfcMaterialLayerSet,
            "IFCMATERIALLAYERSETUSAGE" => Self::IfcMaterialLayerSetUsage,
            "IFCMATERIALPROFILE" => Self::IfcMaterialProfile,
            "IFCMATERIALPROFILESET" => Self::IfcMaterialProfileSet,
            "IFCMATERIALPROFILESETUSAGE" => Self::IfcMaterialProfileSetUsage,
            "IFCMATERIALPROPERTIES" => Self::IfcMaterialProperties,
            "IFCEXTENDEDMATERIALPROPERTIES" => Self::IfcExtendedMaterialProperties,

            "IFCPRODUCTDEFINITIONSHAPE" => Self::IfcProductDefinitionShape,
            "IFCSHAPEREPRESENTATION" => Self::IfcShapeRepresentation,
            "IFCEXTRUDEDAREASOLID" => Self::IfcExtrudedAreaSolid,

            other => Self::Unknown(simple_hash(other)),
        };
        Some(t)
    }

    /// STEP keyword for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IfcBeam => "IFCBEAM",
            Self::IfcBeamStandardCase => "IFCBEAMSTANDARDCASE",
            Self::IfcColumn => "IFCCOLUMN",
            Self::IfcColumnStandardCase => "IFCCOLUMNSTANDARDCASE",

            Self::IfcWall => "IFCWALL",
            Self::IfcWallStandardCase => "IFCWALLSTANDARDCASE",
            Self::IfcSlab => "IFCSLAB",
            Self::IfcDoor => "IFCDOOR",
            Self::IfcWindow => "IFCWINDOW",

            Self::IfcProject => "IFCPROJECT",
            Self::IfcUnitAssignment => "IFCUNITASSIGNMENT",
            Self::IfcSIUnit => "IFCSIUNIT",
            Self::IfcConversionBasedUnit => "IFCCONVERSIONBASEDUNIT",
            Self::IfcMeasureWithUnit => "IFCMEASUREWITHUNIT",

            Self::IfcRelDefinesByProperties => "IFCRELDEFINESBYPROPERTIES",
            Self::IfcRelAssociatesMaterial => "IFCRELASSOCIATESMATERIAL",

            Self::IfcPropertySet => "IFCPROPERTYSET",
            Self::IfcPropertySingleValue => "IFCPROPERTYSINGLEVALUE",
            Self::IfcElementQuantity => "IFCELEMENTQUANTITY",
            Self::IfcQuantityLength => "IFCQUANTITYLENGTH",
            Self::IfcQuantityArea => "IFCQUANTITYAREA",
            Self::IfcQuantityVolume => "IFCQUANTITYVOLUME",
            Self::IfcQuantityCount => "IFCQUANTITYCOUNT",
            Self::IfcQuantityWeight => "IFCQUANTITYWEIGHT",
            Self::IfcQuantityTime => "IFCQUANTITYTIME",

            Self::IfcMaterial => "IFCMATERIAL",
            Self::IfcMaterialList => "IFCMATERIALLIST",
            Self::IfcMaterialLayer => "IFCMATERIALLAYER",
            Self::IfcMaterialLayerSet => "IFCMATERIALLAYERSET",
            Self::IfcMaterialLayerSetUsage => "IFCMATERIALLAYERSETUSAGE",
            Self::IfcMaterialProfile => "IFCMATERIALPROFILE",
            Self::IfcMaterialProfileSet => "IFCMATERIALPROFILESET",
            Self::IfcMaterialProfileSetUsage => "IFCMATERIALPROFILESETUSAGE",
            Self::IfcMaterialProperties => "IFCMATERIALPROPERTIES",
            Self::IfcExtendedMaterialProperties => "IFCEXTENDEDMATERIALPROPERTIES",

            Self::IfcProductDefinitionShape => "IFCPRODUCTDEFINITIONSHAPE",
            Self::IfcShapeRepresentation => "IFCSHAPEREPRESENTATION",
            Self::IfcExtrudedAreaSolid => "IFCEXTRUDEDAREASOLID",

            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Schema name in IFC casing, e.g. `IfcBeam`.
    pub fn name(&self) -> String {
        format!("{:?}", self)
    }

    /// The type itself followed by the subtypes `by_type` should include.
    ///
    /// IFC4 splits beams and columns into a parametric `*StandardCase`
    /// subtype; a lookup for the supertype returns both.
    pub fn with_subtypes(&self) -> &'static [IfcType] {
        match self {
            Self::IfcBeam => &[Self::IfcBeam, Self::IfcBeamStandardCase],
            Self::IfcColumn => &[Self::IfcColumn, Self::IfcColumnStandardCase],
            Self::IfcWall => &[Self::IfcWall, Self::IfcWallStandardCase],
            Self::IfcMaterialProperties => {
                &[Self::IfcMaterialProperties, Self::IfcExtendedMaterialProperties]
            }
            Self::IfcBeamStandardCase => &[Self::IfcBeamStandardCase],
            Self::IfcColumnStandardCase => &[Self::IfcColumnStandardCase],
            Self::IfcWallStandardCase => &[Self::IfcWallStandardCase],
            Self::IfcSlab => &[Self::IfcSlab],
            Self::IfcDoor => &[Self::IfcDoor],
            Self::IfcWindow => &[Self::IfcWindow],
            Self::IfcProject => &[Self::IfcProject],
            Self::IfcMaterial => &[Self::IfcMaterial],
            Self::IfcPropertySet => &[Self::IfcPropertySet],
            _ => &[],
        }
    }

    /// Physical quantity types (`IfcQuantity*`).
    pub fn is_quantity(&self) -> bool {
        matches!(
            self,
            Self::IfcQuantityLength
                | Self::IfcQuantityArea
                | Self::IfcQuantityVolume
                | Self::IfcQuantityCount
                | Self::IfcQuantityWeight
                | Self::IfcQuantityTime
        )
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Simple hash function for unknown type names
fn simple_hash(s: &str) -> u16 {
    let mut hash: u32 = 5381;
    for byte in s.bytes() {
        hash = ((hash << 5).wrapping_add(hash)).wrapping_add(byte as u32);
    }
    (hash & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_roundtrip() {
        assert_eq!(IfcType::from_str("IFCBEAM"), Some(IfcType::IfcBeam));
        assert_eq!(IfcType::from_str("IfcColumn"), Some(IfcType::IfcColumn));
        assert_eq!(IfcType::IfcBeam.as_str(), "IFCBEAM");
        assert_eq!(IfcType::IfcBeam.name(), "IfcBeam");
    }

    #[test]
    fn test_unknown_type() {
        let t = IfcType::from_str("IFCFLOWTERMINAL").unwrap();
        assert!(matches!(t, IfcType::Unknown(_)));
        assert_eq!(t, IfcType::from_str("IFCFLOWTERMINAL").unwrap());
        assert_eq!(IfcType::from_str(""), None);
    }

    #[test]
    fn test_subtypes() {
        assert_eq!(
            IfcType::IfcBeam.with_subtypes(),
            &[IfcType::IfcBeam, IfcType::IfcBeamStandardCase]
        );
        assert!(IfcType::IfcQuantityLength.is_quantity());
        assert!(!IfcType::IfcPropertySet.is_quantity());
    }
}
