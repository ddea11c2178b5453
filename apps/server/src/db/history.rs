// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion history rows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ConversionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionStatus::Pending => "pending",
            ConversionStatus::Processing => "processing",
            ConversionStatus::Completed => "completed",
            ConversionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ConversionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConversionStatus::Pending),
            "processing" => Ok(ConversionStatus::Processing),
            "completed" => Ok(ConversionStatus::Completed),
            "failed" => Ok(ConversionStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ConversionStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConversionHistory {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    #[serde(skip)]
    pub stored_path: Option<String>,
    pub file_hash: Option<String>,
    pub processed_date: DateTime<Utc>,
    pub element_count: i64,
    #[sqlx(try_from = "String")]
    pub status: ConversionStatus,
    pub error_message: Option<String>,
}

const COLUMNS: &str = "id, user_id, filename, stored_path, file_hash, processed_date, \
                       element_count, status, error_message";

/// Insert a history row and return its id
pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    filename: &str,
    status: ConversionStatus,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO conversion_history (user_id, filename, processed_date, status)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(filename)
    .bind(Utc::now())
    .bind(status.as_str())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn set_stored_file(
    pool: &SqlitePool,
    id: i64,
    stored_path: &str,
    file_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE conversion_history SET stored_path = ?, file_hash = ? WHERE id = ?")
        .bind(stored_path)
        .bind(file_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: ConversionStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE conversion_history SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_completed(
    pool: &SqlitePool,
    id: i64,
    element_count: usize,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE conversion_history
        SET status = 'completed', element_count = ?, processed_date = ?, error_message = NULL
        WHERE id = ?
        "#,
    )
    .bind(element_count as i64)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &SqlitePool, id: i64, message: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE conversion_history SET status = 'failed', error_message = ? WHERE id = ?",
    )
    .bind(message)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// A row, only if it belongs to `user_id`
pub async fn find_for_user(
    pool: &SqlitePool,
    id: i64,
    user_id: i64,
) -> Result<Option<ConversionHistory>, sqlx::Error> {
    sqlx::query_as::<_, ConversionHistory>(&format!(
        "SELECT {} FROM conversion_history WHERE id = ? AND user_id = ?",
        COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// A user's rows, newest first
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<ConversionHistory>, sqlx::Error> {
    sqlx::query_as::<_, ConversionHistory>(&format!(
        "SELECT {} FROM conversion_history WHERE user_id = ? \
         ORDER BY processed_date DESC, id DESC",
        COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Delete a row with its cached elements and uploads in one transaction.
///
/// Returns the deleted row, or `None` when the user owns no such row.
pub async fn delete_for_user(
    pool: &SqlitePool,
    id: i64,
    user_id: i64,
) -> Result<Option<ConversionHistory>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ConversionHistory>(&format!(
        "SELECT {} FROM conversion_history WHERE id = ? AND user_id = ?",
        COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let elements = sqlx::query("DELETE FROM ifc_elements_cache WHERE conversion_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query(
        "DELETE FROM upload_chunks WHERE upload_id IN \
         (SELECT upload_id FROM file_uploads WHERE history_id = ?)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let uploads = sqlx::query("DELETE FROM file_uploads WHERE history_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM conversion_history WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        history_id = id,
        user_id,
        elements,
        uploads,
        "Deleted conversion history"
    );

    Ok(Some(row))
}
