// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Chunked upload bookkeeping.

use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Assembling,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::Assembling => "assembling",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown upload status '{0}'")]
pub struct UnknownUploadStatus(pub String);

impl FromStr for UploadStatus {
    type Err = UnknownUploadStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(UploadStatus::Uploading),
            "assembling" => Ok(UploadStatus::Assembling),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            other => Err(UnknownUploadStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for UploadStatus {
    type Error = UnknownUploadStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileUpload {
    pub upload_id: String,
    pub history_id: i64,
    pub user_id: i64,
    pub filename: String,
    pub file_size: i64,
    pub chunk_size: i64,
    pub chunks_total: i64,
    pub chunks_uploaded: i64,
    #[sqlx(try_from = "String")]
    pub upload_status: UploadStatus,
}

/// Counter state after a chunk was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    pub chunks_uploaded: i64,
    pub chunks_total: i64,
    /// `false` when this chunk number had already been received
    pub newly_recorded: bool,
}

impl ChunkProgress {
    pub fn is_complete(&self) -> bool {
        self.chunks_uploaded >= self.chunks_total
    }
}

pub async fn create(pool: &SqlitePool, upload: &FileUpload) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO file_uploads
            (upload_id, history_id, user_id, filename, file_size, chunk_size,
             chunks_total, chunks_uploaded, upload_status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&upload.upload_id)
    .bind(upload.history_id)
    .bind(upload.user_id)
    .bind(&upload.filename)
    .bind(upload.file_size)
    .bind(upload.chunk_size)
    .bind(upload.chunks_total)
    .bind(upload.chunks_uploaded)
    .bind(upload.upload_status.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_for_user(
    pool: &SqlitePool,
    upload_id: &str,
    user_id: i64,
) -> Result<Option<FileUpload>, sqlx::Error> {
    sqlx::query_as::<_, FileUpload>(
        r#"
        SELECT upload_id, history_id, user_id, filename, file_size, chunk_size,
               chunks_total, chunks_uploaded, upload_status
        FROM file_uploads
        WHERE upload_id = ? AND user_id = ?
        "#,
    )
    .bind(upload_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Record one received chunk.
///
/// A chunk number seen before leaves the counter untouched; otherwise the
/// counter is bumped with a single `UPDATE … RETURNING`.
pub async fn record_chunk(
    pool: &SqlitePool,
    upload_id: &str,
    chunk_number: i64,
    size: i64,
) -> Result<ChunkProgress, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO upload_chunks (upload_id, chunk_number, size) VALUES (?, ?, ?)",
    )
    .bind(upload_id)
    .bind(chunk_number)
    .bind(size)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        == 1;

    let (chunks_uploaded, chunks_total): (i64, i64) = if inserted {
        sqlx::query_as(
            r#"
            UPDATE file_uploads
            SET chunks_uploaded = chunks_uploaded + 1
            WHERE upload_id = ?
            RETURNING chunks_uploaded, chunks_total
            "#,
        )
        .bind(upload_id)
        .fetch_one(&mut *tx)
        .await?
    } else {
        sqlx::query_as(
            "SELECT chunks_uploaded, chunks_total FROM file_uploads WHERE upload_id = ?",
        )
        .bind(upload_id)
        .fetch_one(&mut *tx)
        .await?
    };

    tx.commit().await?;

    Ok(ChunkProgress {
        chunks_uploaded,
        chunks_total,
        newly_recorded: inserted,
    })
}

/// Move an upload from `uploading` to `assembling`.
///
/// Only one caller wins; the others get `false`.
pub async fn claim_assembly(pool: &SqlitePool, upload_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE file_uploads SET upload_status = 'assembling' \
         WHERE upload_id = ? AND upload_status = 'uploading'",
    )
    .bind(upload_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_status(
    pool: &SqlitePool,
    upload_id: &str,
    status: UploadStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE file_uploads SET upload_status = ? WHERE upload_id = ?")
        .bind(status.as_str())
        .bind(upload_id)
        .execute(pool)
        .await?;
    Ok(())
}
