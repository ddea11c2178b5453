// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Beam and column extraction.

use std::path::{Path, PathBuf};

use ifc_takeoff_core::{BuildingModel, ElementView, IfcModel, Result as CoreResult};
use rayon::prelude::*;
use thiserror::Error;

use crate::record::{ElementRecord, MemberKind, UNDEFINED};
use crate::resolvers::{
    resolve_first, FieldResolver, ResolveContext, LENGTH_RESOLVERS, SIZE_RESOLVERS,
    WEIGHT_RESOLVERS,
};

/// Fatal extraction failures. Per-element failures are logged and skipped.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("IFC file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read IFC model: {0}")]
    Model(#[source] ifc_takeoff_core::Error),
}

/// Open a model from disk and extract its members.
pub fn extract_from_path(path: impl AsRef<Path>) -> Result<Vec<ElementRecord>, ExtractError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::error!(path = %path.display(), "IFC file not found");
        return Err(ExtractError::FileNotFound(path.to_path_buf()));
    }

    tracing::info!(path = %path.display(), "Opening IFC model");
    let model = IfcModel::open(path).map_err(|e| {
        if e.is_not_found() {
            ExtractError::FileNotFound(path.to_path_buf())
        } else {
            tracing::error!(path = %path.display(), error = %e, "Failed to open IFC model");
            ExtractError::Model(e)
        }
    })?;
    tracing::debug!(schema = model.schema(), "IFC model indexed");

    if !model.malformed_records().is_empty() {
        tracing::warn!(
            count = model.malformed_records().len(),
            "Skipped malformed relationship records"
        );
    }

    Ok(extract_elements(&model))
}

/// Extract all beams, then all columns, each in model order.
///
/// An element whose graph cannot be read is logged and left out; the rest of
/// the model is still extracted.
pub fn extract_elements<M>(model: &M) -> Vec<ElementRecord>
where
    M: BuildingModel + Sync,
{
    let extract_start = std::time::Instant::now();
    let ctx = ResolveContext {
        length_unit: model.length_unit(),
    };

    let ids: Vec<(MemberKind, Vec<u32>)> = MemberKind::ALL
        .iter()
        .map(|&kind| (kind, model.by_type(kind.ifc_type())))
        .collect();

    tracing::info!(
        beams = ids[0].1.len(),
        columns = ids[1].1.len(),
        length_scale = ctx.length_unit.scale(),
        "Detected members"
    );

    let mut records = Vec::new();
    for (kind, kind_ids) in &ids {
        let batch: Vec<ElementRecord> = kind_ids
            .par_iter()
            .filter_map(|&id| match extract_member(model, id, *kind, &ctx) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        element = id,
                        kind = %kind,
                        error = %e,
                        "Skipping member that could not be read"
                    );
                    None
                }
            })
            .collect();
        records.extend(batch);
    }

    if records.is_empty() {
        tracing::warn!("No members could be extracted");
    }

    tracing::info!(
        elements = records.len(),
        extract_time_ms = extract_start.elapsed().as_millis(),
        "Member extraction complete"
    );

    records
}

fn extract_member<M: BuildingModel>(
    model: &M,
    id: u32,
    kind: MemberKind,
    ctx: &ResolveContext,
) -> CoreResult<ElementRecord> {
    let element = model.element(id)?;
    extract_record(&element, kind, ctx)
}

/// Resolve every field of one element.
pub fn extract_record(
    element: &dyn ElementView,
    kind: MemberKind,
    ctx: &ResolveContext,
) -> CoreResult<ElementRecord> {
    let attribute = |name: &str| -> CoreResult<String> {
        Ok(element
            .try_get_attribute(name)?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNDEFINED.to_string()))
    };
    let field = |resolvers: &[FieldResolver]| -> CoreResult<String> {
        Ok(resolve_first(resolvers, element, ctx)?.unwrap_or_else(|| UNDEFINED.to_string()))
    };

    Ok(ElementRecord {
        kind,
        name: attribute("Name")?,
        description: attribute("Description")?,
        size: field(SIZE_RESOLVERS)?,
        weight: field(WEIGHT_RESOLVERS)?,
        length: field(LENGTH_RESOLVERS)?,
    })
}
