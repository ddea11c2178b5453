// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion history, preview, CSV download and deletion.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Form, Json,
};
use ifc_takeoff_processing::{to_csv_bytes, ElementRecord};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::CurrentUser;
use crate::db::history::{self, ConversionHistory, ConversionStatus};
use crate::error::ApiError;
use crate::flash::IncomingFlash;
use crate::services::conversion::load_or_extract;
use crate::services::storage::csv_filename;
use crate::AppState;

const HISTORY_NOT_FOUND: &str = "変換履歴が見つかりません";

/// `?format=json` switches a page to its JSON form.
#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

impl FormatQuery {
    fn wants_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryList {
    pub histories: Vec<ConversionHistory>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub history_id: i64,
    pub filename: String,
    pub status: ConversionStatus,
    pub element_count: usize,
    pub elements: Vec<ElementRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CsrfForm {
    pub csrf_token: Option<String>,
}

async fn owned_history(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
) -> Result<ConversionHistory, ApiError> {
    history::find_for_user(&state.pool, id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(HISTORY_NOT_FOUND.into()))
}

/// GET /history
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<FormatQuery>,
    flash: IncomingFlash,
) -> Result<Response, ApiError> {
    let histories = history::list_for_user(&state.pool, user.user_id).await?;

    if query.wants_json() {
        return Ok(Json(HistoryList { histories }).into_response());
    }

    let rows: Vec<_> = histories
        .iter()
        .map(|h| {
            json!({
                "id": h.id,
                "filename": h.filename,
                "processed_date": h.processed_date.format("%Y-%m-%d %H:%M").to_string(),
                "element_count": h.element_count,
                "status": h.status,
                "error_message": h.error_message,
            })
        })
        .collect();

    state.templates.page(
        "history",
        "変換履歴",
        Some(&user),
        &flash,
        None,
        json!({ "histories": rows }),
    )
}

/// GET /preview/:id
pub async fn preview(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<FormatQuery>,
    flash: IncomingFlash,
) -> Result<Response, ApiError> {
    let entry = owned_history(&state, &user, id).await?;
    let elements = load_or_extract(&state.pool, &entry).await?;

    tracing::debug!(history_id = id, elements = elements.len(), "Preview");

    if query.wants_json() {
        return Ok(Json(PreviewResponse {
            history_id: entry.id,
            filename: entry.filename,
            status: entry.status,
            element_count: elements.len(),
            elements,
        })
        .into_response());
    }

    state.templates.page(
        "preview",
        &entry.filename,
        Some(&user),
        &flash,
        None,
        json!({ "history": entry, "elements": elements }),
    )
}

/// GET /download_csv/:id
pub async fn download_csv(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let entry = owned_history(&state, &user, id).await?;
    if entry.status != ConversionStatus::Completed {
        return Err(ApiError::NotCompleted);
    }

    let elements = load_or_extract(&state.pool, &entry).await?;
    let body = to_csv_bytes(&elements)?;
    let disposition = format!("attachment; filename=\"{}\"", csv_filename(&entry.filename));

    tracing::info!(history_id = id, rows = elements.len(), "CSV download");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// POST /history/:id/delete
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    headers: HeaderMap,
    form: Option<Form<CsrfForm>>,
) -> Result<Response, ApiError> {
    let field = form.and_then(|Form(f)| f.csrf_token);
    user.verify_csrf(&headers, field.as_deref())?;

    let Some(deleted) = history::delete_for_user(&state.pool, id, user.user_id).await? else {
        return Err(ApiError::NotFound(HISTORY_NOT_FOUND.into()));
    };

    if let Err(e) = state.store.remove_history(deleted.id).await {
        tracing::warn!(history_id = id, error = %e, "Failed to remove stored files");
    }

    Ok(Json(json!({ "success": true })).into_response())
}
