// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model upload endpoints, single-shot and chunked.

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{CurrentUser, CSRF_FIELD};
use crate::db::history::{self, ConversionStatus};
use crate::db::uploads::{self, FileUpload, UploadStatus};
use crate::error::ApiError;
use crate::services::conversion::convert_stored;
use crate::services::storage::is_ifc_filename;
use crate::AppState;

/// Result of a finished conversion.
#[derive(Debug, Serialize)]
pub struct UploadCompleted {
    pub status: &'static str,
    pub history_id: i64,
    pub element_count: usize,
    pub redirect: String,
}

impl UploadCompleted {
    fn new(history_id: i64, element_count: usize) -> Self {
        Self {
            status: "completed",
            history_id,
            element_count,
            redirect: format!("/preview/{}", history_id),
        }
    }
}

/// Parameters handed to the client for a chunked upload.
#[derive(Debug, Serialize)]
pub struct ChunkedUploadInit {
    pub upload_id: String,
    pub history_id: i64,
    pub chunk_size: i64,
    pub chunks_total: i64,
}

/// Progress after a chunk was accepted.
#[derive(Debug, Serialize)]
pub struct ChunkAccepted {
    pub status: &'static str,
    pub chunks_uploaded: i64,
    pub chunks_total: i64,
}

/// Fields of `POST /upload`.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    filename: Option<String>,
    file_size: Option<String>,
    csrf_token: Option<String>,
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        tracing::debug!(field_name = %field_name, "Processing multipart field");

        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                tracing::debug!(size = bytes.len(), "Extracted file from multipart");
                form.file = Some((name, bytes.to_vec()));
            }
            "filename" => form.filename = Some(field.text().await?),
            "file_size" => form.file_size = Some(field.text().await?),
            f if f == CSRF_FIELD => form.csrf_token = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(form)
}

/// POST /upload
///
/// With a `file` field the model is stored and converted at once. With
/// `filename` and `file_size` a chunked upload is opened instead.
pub async fn upload(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_upload_form(&mut multipart).await?;
    user.verify_csrf(&headers, form.csrf_token.as_deref())?;

    match (form.file, form.filename, form.file_size) {
        (Some((name, data)), filename, _) => {
            let name = if name.is_empty() { filename.unwrap_or_default() } else { name };
            upload_single(&state, &user, name, data).await
        }
        (None, Some(filename), Some(file_size)) => {
            init_chunked(&state, &user, filename, &file_size).await
        }
        _ => Err(ApiError::MissingFile),
    }
}

fn check_filename(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::MissingFile);
    }
    if !is_ifc_filename(name) {
        tracing::debug!(filename = %name, "Rejected non-IFC upload");
        return Err(ApiError::InvalidFileType);
    }
    Ok(())
}

async fn upload_single(
    state: &AppState,
    user: &CurrentUser,
    filename: String,
    data: Vec<u8>,
) -> Result<Response, ApiError> {
    check_filename(&filename)?;
    if data.len() as u64 > state.config.max_file_size_bytes() {
        return Err(ApiError::FileTooLarge {
            max_mb: state.config.max_file_size_mb,
        });
    }

    let history_id =
        history::create(&state.pool, user.user_id, &filename, ConversionStatus::Pending).await?;
    tracing::info!(history_id, user_id = user.user_id, filename = %filename, "Upload received");

    let stored = match state.store.store(history_id, &filename, &data).await {
        Ok(stored) => stored,
        Err(e) => {
            history::mark_failed(&state.pool, history_id, "ファイルの保存に失敗しました").await?;
            return Err(e.into());
        }
    };

    let element_count = convert_stored(&state.pool, history_id, &stored).await?;
    Ok(Json(UploadCompleted::new(history_id, element_count)).into_response())
}

async fn init_chunked(
    state: &AppState,
    user: &CurrentUser,
    filename: String,
    file_size: &str,
) -> Result<Response, ApiError> {
    check_filename(&filename)?;

    let file_size: u64 = file_size
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation("file_size が不正です".into()))?;
    if file_size == 0 {
        return Err(ApiError::Validation("空のファイルはアップロードできません".into()));
    }
    if file_size > state.config.max_file_size_bytes() {
        return Err(ApiError::FileTooLarge {
            max_mb: state.config.max_file_size_mb,
        });
    }

    let chunk_size = state.config.chunk_size_bytes as u64;
    let chunks_total = file_size.div_ceil(chunk_size);

    let history_id =
        history::create(&state.pool, user.user_id, &filename, ConversionStatus::Pending).await?;
    let upload = FileUpload {
        upload_id: uuid::Uuid::new_v4().to_string(),
        history_id,
        user_id: user.user_id,
        filename,
        file_size: file_size as i64,
        chunk_size: chunk_size as i64,
        chunks_total: chunks_total as i64,
        chunks_uploaded: 0,
        upload_status: UploadStatus::Uploading,
    };
    uploads::create(&state.pool, &upload).await?;

    tracing::info!(
        upload_id = %upload.upload_id,
        history_id,
        file_size,
        chunks_total,
        "Chunked upload opened"
    );

    Ok(Json(ChunkedUploadInit {
        upload_id: upload.upload_id,
        history_id,
        chunk_size: upload.chunk_size,
        chunks_total: upload.chunks_total,
    })
    .into_response())
}

/// POST /upload/:upload_id/chunk/:chunk_number
pub async fn upload_chunk(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((upload_id, chunk_number)): Path<(String, i64)>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut chunk = None;
    let mut csrf_token = None;
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "chunk" => chunk = Some(field.bytes().await?),
            f if f == CSRF_FIELD => csrf_token = Some(field.text().await?),
            _ => {}
        }
    }
    user.verify_csrf(&headers, csrf_token.as_deref())?;

    let upload = uploads::find_for_user(&state.pool, &upload_id, user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("アップロードが見つかりません".into()))?;

    if upload.upload_status != UploadStatus::Uploading {
        return Err(ApiError::InvalidChunk("このアップロードは既に終了しています".into()));
    }
    if !(0..upload.chunks_total).contains(&chunk_number) {
        return Err(ApiError::InvalidChunk(format!(
            "チャンク番号 {} は範囲外です",
            chunk_number
        )));
    }
    let data = chunk.ok_or(ApiError::MissingFile)?;
    if data.is_empty() || data.len() as i64 > upload.chunk_size {
        return Err(ApiError::InvalidChunk("チャンクのサイズが不正です".into()));
    }

    state
        .store
        .store_chunk(upload.history_id, &upload.upload_id, chunk_number, &data)
        .await?;
    let progress =
        uploads::record_chunk(&state.pool, &upload.upload_id, chunk_number, data.len() as i64)
            .await?;

    tracing::debug!(
        upload_id = %upload.upload_id,
        chunk_number,
        chunks_uploaded = progress.chunks_uploaded,
        chunks_total = progress.chunks_total,
        duplicate = !progress.newly_recorded,
        "Chunk received"
    );

    if progress.is_complete() && uploads::claim_assembly(&state.pool, &upload.upload_id).await? {
        let element_count = finish_chunked(&state, &upload).await?;
        return Ok(Json(UploadCompleted::new(upload.history_id, element_count)).into_response());
    }

    Ok(Json(ChunkAccepted {
        status: if progress.is_complete() { "assembling" } else { "uploading" },
        chunks_uploaded: progress.chunks_uploaded,
        chunks_total: progress.chunks_total,
    })
    .into_response())
}

/// Assemble, size-check and convert an upload whose chunks have all arrived.
async fn finish_chunked(state: &AppState, upload: &FileUpload) -> Result<usize, ApiError> {
    let assembled = state
        .store
        .assemble(upload.history_id, &upload.upload_id, upload.chunks_total, &upload.filename)
        .await;

    let stored = match assembled {
        Ok(stored) if stored.size == upload.file_size as u64 => stored,
        Ok(stored) => {
            tracing::warn!(
                upload_id = %upload.upload_id,
                expected = upload.file_size,
                actual = stored.size,
                "Assembled size mismatch"
            );
            let message = "ファイルサイズが一致しません";
            fail_upload(state, upload, message).await?;
            return Err(ApiError::InvalidChunk(message.into()));
        }
        Err(e) => {
            tracing::error!(upload_id = %upload.upload_id, error = %e, "Assembly failed");
            fail_upload(state, upload, "ファイルの結合に失敗しました").await?;
            return Err(e.into());
        }
    };

    match convert_stored(&state.pool, upload.history_id, &stored).await {
        Ok(count) => {
            uploads::set_status(&state.pool, &upload.upload_id, UploadStatus::Completed).await?;
            Ok(count)
        }
        Err(e) => {
            uploads::set_status(&state.pool, &upload.upload_id, UploadStatus::Failed).await?;
            Err(e)
        }
    }
}

async fn fail_upload(state: &AppState, upload: &FileUpload, message: &str) -> Result<(), ApiError> {
    uploads::set_status(&state.pool, &upload.upload_id, UploadStatus::Failed).await?;
    history::mark_failed(&state.pool, upload.history_id, message).await?;
    Ok(())
}
