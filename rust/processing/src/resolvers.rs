// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ordered field resolvers.
//!
//! Each derived field (size, weight, length) is resolved by walking a list of
//! named resolvers and taking the first value found. A resolver returns
//! `Ok(None)` when its source is absent and `Err` when the element's object
//! graph is broken.

use ifc_takeoff_core::{
    BodyItem, ElementView, LengthUnit, PropertyValue, QuantityKind, Result,
};

/// Model-wide inputs to resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext {
    pub length_unit: LengthUnit,
}

type ResolveFn = fn(&dyn ElementView, &ResolveContext) -> Result<Option<String>>;

/// A named resolution step.
#[derive(Clone, Copy)]
pub struct FieldResolver {
    pub name: &'static str,
    pub resolve: ResolveFn,
}

impl std::fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldResolver").field("name", &self.name).finish()
    }
}

pub const SIZE_KEYWORDS: &[&str] = &["section", "profile", "size"];
pub const WEIGHT_KEYWORDS: &[&str] = &["weight", "mass", "重量", "質量"];
pub const LENGTH_KEYWORDS: &[&str] = &["length", "長さ"];

pub static SIZE_RESOLVERS: &[FieldResolver] = &[
    FieldResolver {
        name: "description",
        resolve: size_from_description,
    },
    FieldResolver {
        name: "profile_property",
        resolve: size_from_property,
    },
    FieldResolver {
        name: "material_profile",
        resolve: size_from_material_profile,
    },
];

pub static WEIGHT_RESOLVERS: &[FieldResolver] = &[
    FieldResolver {
        name: "specific_gravity",
        resolve: weight_from_specific_gravity,
    },
    FieldResolver {
        name: "weight_property",
        resolve: weight_from_property,
    },
];

pub static LENGTH_RESOLVERS: &[FieldResolver] = &[
    FieldResolver {
        name: "length_quantity",
        resolve: length_from_quantity,
    },
    FieldResolver {
        name: "length_property",
        resolve: length_from_property,
    },
    FieldResolver {
        name: "extrusion_depth",
        resolve: length_from_extrusion,
    },
];

/// First value produced by the list, or `None` when every step comes up empty.
pub fn resolve_first(
    resolvers: &[FieldResolver],
    element: &dyn ElementView,
    ctx: &ResolveContext,
) -> Result<Option<String>> {
    for resolver in resolvers {
        if let Some(value) = (resolver.resolve)(element, ctx)? {
            tracing::trace!(
                element = element.express_id(),
                resolver = resolver.name,
                "Field resolved"
            );
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Case-insensitive substring match against any keyword
fn name_matches(name: &str, keywords: &[&str]) -> bool {
    let lower = name.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// First property-set value whose property name matches a keyword
fn keyword_property(element: &dyn ElementView, keywords: &[&str]) -> Result<Option<PropertyValue>> {
    for pset in element.try_get_property_sets()? {
        for property in pset.properties {
            if name_matches(&property.name, keywords) {
                if let Some(value) = property.value {
                    return Ok(Some(value));
                }
            }
        }
    }
    Ok(None)
}

fn format_kg(value: &PropertyValue) -> String {
    format!("{}kg", value)
}

fn format_mm(unit: LengthUnit, value: f64) -> String {
    format!("{}mm", unit.to_millimetres(value))
}

fn size_from_description(element: &dyn ElementView, _: &ResolveContext) -> Result<Option<String>> {
    Ok(element
        .try_get_attribute("Description")?
        .filter(|d| !d.is_empty()))
}

fn size_from_property(element: &dyn ElementView, _: &ResolveContext) -> Result<Option<String>> {
    Ok(keyword_property(element, SIZE_KEYWORDS)?.map(|v| v.to_string()))
}

fn size_from_material_profile(
    element: &dyn ElementView,
    _: &ResolveContext,
) -> Result<Option<String>> {
    use ifc_takeoff_core::MaterialSelect;

    for select in element.try_get_materials()? {
        // Only the first profile of a set names the section
        if let MaterialSelect::ProfileSet { profiles, .. } = select {
            if let Some(first) = profiles.into_iter().next() {
                return Ok(first.profile_name.filter(|n| !n.is_empty()));
            }
        }
    }
    Ok(None)
}

fn weight_from_specific_gravity(
    element: &dyn ElementView,
    _: &ResolveContext,
) -> Result<Option<String>> {
    for select in element.try_get_materials()? {
        if let Some(gravity) = select
            .materials()
            .into_iter()
            .find_map(|m| m.specific_gravity())
        {
            return Ok(Some(format_kg(gravity)));
        }
    }
    Ok(None)
}

fn weight_from_property(element: &dyn ElementView, _: &ResolveContext) -> Result<Option<String>> {
    Ok(keyword_property(element, WEIGHT_KEYWORDS)?.map(|value| {
        if value.is_numeric() {
            format_kg(&value)
        } else {
            value.to_string()
        }
    }))
}

fn length_from_quantity(element: &dyn ElementView, ctx: &ResolveContext) -> Result<Option<String>> {
    Ok(element
        .try_get_quantities()?
        .into_iter()
        .flat_map(|set| set.quantities)
        .find(|q| q.kind == QuantityKind::Length)
        .map(|q| format_mm(ctx.length_unit, q.value)))
}

fn length_from_property(element: &dyn ElementView, ctx: &ResolveContext) -> Result<Option<String>> {
    Ok(keyword_property(element, LENGTH_KEYWORDS)?.map(|value| match value.as_f64() {
        Some(n) => format_mm(ctx.length_unit, n),
        None => value.to_string(),
    }))
}

fn length_from_extrusion(element: &dyn ElementView, ctx: &ResolveContext) -> Result<Option<String>> {
    Ok(element
        .try_get_body_items()?
        .into_iter()
        .find_map(|item| match item {
            BodyItem::ExtrudedAreaSolid { depth } => Some(format_mm(ctx.length_unit, depth)),
            BodyItem::Other(_) => None,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeElement;
    use ifc_takeoff_core::{Material, MaterialProfile, MaterialSelect, Property};

    fn mm() -> ResolveContext {
        ResolveContext {
            length_unit: LengthUnit::MILLIMETRE,
        }
    }

    #[test]
    fn test_keyword_matching() {
        assert!(name_matches("ProfileSize", SIZE_KEYWORDS));
        assert!(name_matches("CROSS_SECTION", SIZE_KEYWORDS));
        assert!(name_matches("単位重量", WEIGHT_KEYWORDS));
        assert!(!name_matches("IsExternal", SIZE_KEYWORDS));
    }

    #[test]
    fn test_description_wins_for_size() {
        let element = FakeElement::new(1)
            .description("BCR295 300x300x12")
            .property("ProfileSize", PropertyValue::Text("ignored".into()));
        assert_eq!(
            resolve_first(SIZE_RESOLVERS, &element, &mm()).unwrap().as_deref(),
            Some("BCR295 300x300x12")
        );
    }

    #[test]
    fn test_empty_description_falls_through() {
        let element = FakeElement::new(1)
            .description("")
            .property("Section", PropertyValue::Text("H-200x100".into()));
        assert_eq!(
            resolve_first(SIZE_RESOLVERS, &element, &mm()).unwrap().as_deref(),
            Some("H-200x100")
        );
    }

    #[test]
    fn test_size_from_material_profile() {
        let profile = |profile_name: Option<&str>| MaterialProfile {
            name: None,
            profile_name: profile_name.map(str::to_string),
            material: None,
        };

        let element = FakeElement::new(1).material(MaterialSelect::ProfileSet {
            name: None,
            profiles: vec![profile(Some("H-300x150x6.5x9")), profile(Some("H-200x100x5.5x8"))],
        });
        assert_eq!(
            resolve_first(SIZE_RESOLVERS, &element, &mm()).unwrap().as_deref(),
            Some("H-300x150x6.5x9")
        );

        // A later named profile does not stand in for an unnamed first one
        let element = FakeElement::new(2).material(MaterialSelect::ProfileSet {
            name: None,
            profiles: vec![profile(None), profile(Some("H-300x150x6.5x9"))],
        });
        assert_eq!(resolve_first(SIZE_RESOLVERS, &element, &mm()).unwrap(), None);
    }

    #[test]
    fn test_weight_sources() {
        let steel = Material {
            id: 9,
            name: Some("SN490B".into()),
            properties: vec![Property {
                name: "SpecificGravity".into(),
                value: Some(PropertyValue::Real(7.85)),
            }],
        };
        let element = FakeElement::new(1)
            .material(MaterialSelect::Material(steel))
            .property("Weight", PropertyValue::Real(120.0));
        assert_eq!(
            resolve_first(WEIGHT_RESOLVERS, &element, &mm()).unwrap().as_deref(),
            Some("7.85kg")
        );

        let element = FakeElement::new(2).property("質量", PropertyValue::Real(66.0));
        assert_eq!(
            resolve_first(WEIGHT_RESOLVERS, &element, &mm()).unwrap().as_deref(),
            Some("66kg")
        );

        let element = FakeElement::new(3).property("Mass", PropertyValue::Text("approx. 1t".into()));
        assert_eq!(
            resolve_first(WEIGHT_RESOLVERS, &element, &mm()).unwrap().as_deref(),
            Some("approx. 1t")
        );
    }

    #[test]
    fn test_length_honours_model_unit() {
        let metre = ResolveContext {
            length_unit: LengthUnit::METRE,
        };

        let element = FakeElement::new(1).length_quantity(6.0);
        assert_eq!(
            resolve_first(LENGTH_RESOLVERS, &element, &metre).unwrap().as_deref(),
            Some("6000mm")
        );

        let element = FakeElement::new(2).length_quantity(6000.0);
        assert_eq!(
            resolve_first(LENGTH_RESOLVERS, &element, &mm()).unwrap().as_deref(),
            Some("6000mm")
        );

        let element = FakeElement::new(3).property("長さ", PropertyValue::Real(4.25));
        assert_eq!(
            resolve_first(LENGTH_RESOLVERS, &element, &metre).unwrap().as_deref(),
            Some("4250mm")
        );

        let element = FakeElement::new(4).property("Length", PropertyValue::Text("L=4m".into()));
        assert_eq!(
            resolve_first(LENGTH_RESOLVERS, &element, &metre).unwrap().as_deref(),
            Some("L=4m")
        );

        let element = FakeElement::new(5).extrusion(3500.0);
        assert_eq!(
            resolve_first(LENGTH_RESOLVERS, &element, &mm()).unwrap().as_deref(),
            Some("3500mm")
        );
    }

    #[test]
    fn test_nothing_found() {
        let element = FakeElement::new(1);
        for list in [SIZE_RESOLVERS, WEIGHT_RESOLVERS, LENGTH_RESOLVERS] {
            assert_eq!(resolve_first(list, &element, &mm()).unwrap(), None);
        }
    }

    #[test]
    fn test_broken_graph_propagates() {
        let element = FakeElement::new(1).broken();
        assert!(resolve_first(SIZE_RESOLVERS, &element, &mm()).is_err());
    }
}
