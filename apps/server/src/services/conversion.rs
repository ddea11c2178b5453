// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extraction of stored models and the element cache around it.

use std::path::PathBuf;

use ifc_takeoff_processing::{extract_from_path, ElementRecord};
use sqlx::SqlitePool;

use super::storage::StoredFile;
use crate::db::history::{self, ConversionHistory, ConversionStatus};
use crate::db::elements;
use crate::error::ApiError;

/// Extract a model file on the blocking pool.
pub async fn run_extraction(path: PathBuf) -> Result<Vec<ElementRecord>, ApiError> {
    let records = tokio::task::spawn_blocking(move || extract_from_path(&path)).await??;
    Ok(records)
}

/// Extract a freshly stored model and record the outcome on its history row.
///
/// Returns the number of extracted elements. Extraction failures mark the
/// row `failed` and are returned to the caller.
pub async fn convert_stored(
    pool: &SqlitePool,
    history_id: i64,
    stored: &StoredFile,
) -> Result<usize, ApiError> {
    let start = std::time::Instant::now();

    history::set_stored_file(
        pool,
        history_id,
        &stored.path.to_string_lossy(),
        &stored.hash,
    )
    .await?;
    history::set_status(pool, history_id, ConversionStatus::Processing).await?;

    tracing::info!(
        history_id,
        size = stored.size,
        file_hash = %stored.hash,
        "Processing upload"
    );

    match run_extraction(stored.path.clone()).await {
        Ok(records) => {
            cache_elements(pool, history_id, &records).await;
            history::mark_completed(pool, history_id, records.len()).await?;

            tracing::info!(
                history_id,
                elements = records.len(),
                total_time_ms = start.elapsed().as_millis(),
                "Conversion completed"
            );
            Ok(records.len())
        }
        Err(e) => {
            tracing::warn!(history_id, error = %e, "Conversion failed");
            history::mark_failed(pool, history_id, &e.to_string()).await?;
            Err(e)
        }
    }
}

/// Write records to the element cache. Failures are logged, not returned.
pub async fn cache_elements(pool: &SqlitePool, history_id: i64, records: &[ElementRecord]) {
    if let Err(e) = elements::store(pool, history_id, records).await {
        tracing::warn!(
            history_id,
            error = %e,
            "Failed to cache elements, serving uncached result"
        );
    }
}

/// Elements of a conversion, from the cache or re-extracted on a miss.
pub async fn load_or_extract(
    pool: &SqlitePool,
    entry: &ConversionHistory,
) -> Result<Vec<ElementRecord>, ApiError> {
    let cached = elements::load(pool, entry.id).await?;
    if !cached.is_empty() {
        tracing::debug!(history_id = entry.id, elements = cached.len(), "Element cache HIT");
        return Ok(cached);
    }
    if entry.status == ConversionStatus::Completed && entry.element_count == 0 {
        return Ok(cached);
    }

    let Some(path) = entry.stored_path.as_deref() else {
        return Err(ApiError::NotFound("IFCファイルが見つかりません".into()));
    };

    tracing::info!(history_id = entry.id, "Element cache MISS - extracting");
    let records = run_extraction(PathBuf::from(path)).await?;
    cache_elements(pool, entry.id, &records).await;

    if entry.status != ConversionStatus::Completed
        || entry.element_count != records.len() as i64
    {
        history::mark_completed(pool, entry.id, records.len()).await?;
    }

    Ok(records)
}
