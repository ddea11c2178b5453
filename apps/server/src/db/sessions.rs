// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server-side login sessions.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A live session joined with its user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionUser {
    pub session_id: String,
    pub user_id: i64,
    pub username: String,
    pub csrf_token: String,
}

/// Random, unguessable token
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    lifetime: Duration,
) -> Result<Session, sqlx::Error> {
    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id,
        csrf_token: generate_token(),
        created_at: now,
        expires_at: now + lifetime,
    };

    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, csrf_token, created_at, expires_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(&session.csrf_token)
    .bind(session.created_at)
    .bind(session.expires_at)
    .execute(pool)
    .await?;

    Ok(session)
}

/// Session and user for an unexpired session id
pub async fn find_active(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Option<SessionUser>, sqlx::Error> {
    sqlx::query_as::<_, SessionUser>(
        r#"
        SELECT s.id AS session_id, s.user_id, u.username, s.csrf_token
        FROM sessions s
        JOIN user u ON u.id = s.user_id
        WHERE s.id = ? AND s.expires_at > ?
        "#,
    )
    .bind(session_id)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &SqlitePool, session_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove expired sessions, returning how many were dropped
pub async fn purge_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
