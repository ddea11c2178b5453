// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit extraction and conversion for IFC files
//!
//! Reads the project length unit (`IFCSIUNIT` with an SI prefix, or an
//! `IFCCONVERSIONBASEDUNIT` such as feet) so lengths can be normalized to
//! millimetres.

use crate::attribute::DecodedEntity;
use crate::decoder::EntityDecoder;
use crate::error::Result;
use crate::schema::IfcType;

/// SI Prefix multipliers as defined in IFC specification
/// Maps IfcSIPrefix enum values to their numeric multipliers
#[inline]
pub fn get_si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "ATTO" => 1e-18,
        "FEMTO" => 1e-15,
        "PICO" => 1e-12,
        "NANO" => 1e-9,
        "MICRO" => 1e-6,
        "MILLI" => 1e-3,
        "CENTI" => 1e-2,
        "DECI" => 1e-1,
        "DECA" => 1e1,
        "HECTO" => 1e2,
        "KILO" => 1e3,
        "MEGA" => 1e6,
        "GIGA" => 1e9,
        "TERA" => 1e12,
        "PETA" => 1e15,
        "EXA" => 1e18,
        _ => 1.0, // No prefix or unknown = base unit
    }
}

/// Model length unit as a scale to metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthUnit {
    metres_per_unit: f64,
}

impl LengthUnit {
    pub const METRE: LengthUnit = LengthUnit { metres_per_unit: 1.0 };
    pub const MILLIMETRE: LengthUnit = LengthUnit { metres_per_unit: 1e-3 };

    /// Unit from a metres-per-unit factor; non-finite or non-positive
    /// factors fall back to metres
    pub fn from_scale(metres_per_unit: f64) -> Self {
        if metres_per_unit.is_finite() && metres_per_unit > 0.0 {
            Self { metres_per_unit }
        } else {
            Self::METRE
        }
    }

    /// Metres per model unit (0.001 for millimetre models)
    pub fn scale(&self) -> f64 {
        self.metres_per_unit
    }

    pub fn to_metres(&self, value: f64) -> f64 {
        value * self.metres_per_unit
    }

    /// Model length → whole millimetres, rounded to nearest
    pub fn to_millimetres(&self, value: f64) -> i64 {
        (self.to_metres(value) * 1000.0).round() as i64
    }
}

impl Default for LengthUnit {
    fn default() -> Self {
        Self::METRE
    }
}

/// Extract the length unit from IFC file
///
/// Follows the chain: IFCPROJECT → IFCUNITASSIGNMENT → IFCSIUNIT or
/// IFCCONVERSIONBASEDUNIT. Anything unreadable past the project defaults to
/// metres.
pub fn extract_length_unit(decoder: &mut EntityDecoder, project_id: u32) -> Result<LengthUnit> {
    let project = decoder.decode_by_id(project_id)?;

    if project.ifc_type != IfcType::IfcProject {
        return Ok(LengthUnit::METRE);
    }

    // IFCPROJECT attribute 8: UnitsInContext
    let units_ref = match project.get_ref(8) {
        Some(id) => id,
        None => return Ok(LengthUnit::METRE),
    };

    let assignment = match decoder.decode_by_id(units_ref) {
        Ok(entity) if entity.ifc_type == IfcType::IfcUnitAssignment => entity,
        _ => return Ok(LengthUnit::METRE),
    };

    for unit_ref in assignment.get_refs(0) {
        let unit = match decoder.decode_by_id(unit_ref) {
            Ok(entity) => entity,
            Err(_) => continue,
        };

        if !is_length_unit(&unit) {
            continue;
        }

        if let Some(scale) = unit_scale(decoder, &unit, 0) {
            return Ok(LengthUnit::from_scale(scale));
        }
    }

    Ok(LengthUnit::METRE)
}

/// IFCSIUNIT and IFCCONVERSIONBASEDUNIT both carry UnitType at attribute 1
fn is_length_unit(unit: &DecodedEntity) -> bool {
    matches!(
        unit.ifc_type,
        IfcType::IfcSIUnit | IfcType::IfcConversionBasedUnit
    ) && unit.get(1).and_then(|a| a.as_enum()) == Some("LENGTHUNIT")
}

/// Metres per unit for an SI or conversion-based unit
fn unit_scale(decoder: &mut EntityDecoder, unit: &DecodedEntity, depth: u8) -> Option<f64> {
    match unit.ifc_type {
        IfcType::IfcSIUnit => {
            // Attribute 2: Prefix (.MILLI.) or $
            let prefix = unit.get(2).and_then(|a| a.as_enum()).unwrap_or("");
            Some(get_si_prefix_multiplier(prefix))
        }
        IfcType::IfcConversionBasedUnit if depth < 4 => {
            // Attribute 3: ConversionFactor (IFCMEASUREWITHUNIT)
            let factor = decoder.decode_by_id(unit.get_ref(3)?).ok()?;
            if factor.ifc_type != IfcType::IfcMeasureWithUnit {
                return None;
            }
            // IFCMEASUREWITHUNIT(ValueComponent, UnitComponent)
            let value = factor.get_float(0)?;
            let base = decoder.decode_by_id(factor.get_ref(1)?).ok()?;
            let base_scale = unit_scale(decoder, &base, depth + 1)?;
            Some(value * base_scale)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::decoder_for;

    #[test]
    fn test_si_prefix_multipliers() {
        assert_eq!(get_si_prefix_multiplier("MILLI"), 0.001);
        assert_eq!(get_si_prefix_multiplier("CENTI"), 0.01);
        assert_eq!(get_si_prefix_multiplier("KILO"), 1000.0);
        assert_eq!(get_si_prefix_multiplier(""), 1.0);
        assert_eq!(get_si_prefix_multiplier("UNKNOWN"), 1.0);
    }

    #[test]
    fn test_millimetre_conversion() {
        assert_eq!(LengthUnit::MILLIMETRE.to_millimetres(6000.0), 6000);
        assert_eq!(LengthUnit::METRE.to_millimetres(6.0), 6000);
        assert_eq!(LengthUnit::METRE.to_millimetres(3.5004), 3500);
        assert_eq!(LengthUnit::from_scale(-1.0), LengthUnit::METRE);
    }

    #[test]
    fn test_extract_si_length_unit() {
        let content = r#"
#1=IFCPROJECT('g',$,'P',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3,#4));
#3=IFCSIUNIT(*,.AREAUNIT.,$,.SQUARE_METRE.);
#4=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
"#;
        let mut decoder = decoder_for(content);
        let unit = extract_length_unit(&mut decoder, 1).unwrap();
        assert_eq!(unit.scale(), 0.001);
    }

    #[test]
    fn test_extract_conversion_based_unit() {
        let content = r#"
#1=IFCPROJECT('g',$,'P',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#5));
#4=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);
#5=IFCCONVERSIONBASEDUNIT(#6,.LENGTHUNIT.,'FOOT',#7);
#6=IFCDIMENSIONALEXPONENTS(1,0,0,0,0,0,0);
#7=IFCMEASUREWITHUNIT(IFCLENGTHMEASURE(0.3048),#4);
"#;
        let mut decoder = decoder_for(content);
        let unit = extract_length_unit(&mut decoder, 1).unwrap();
        assert!((unit.scale() - 0.3048).abs() < 1e-12);
        assert_eq!(unit.to_millimetres(10.0), 3048);
    }

    #[test]
    fn test_missing_units_default_to_metres() {
        let content = "#1=IFCPROJECT('g',$,'P',$,$,$,$,$,$);";
        let mut decoder = decoder_for(content);
        assert_eq!(extract_length_unit(&mut decoder, 1).unwrap(), LengthUnit::METRE);
    }
}
