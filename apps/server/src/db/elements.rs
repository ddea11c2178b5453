// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cached extraction results (`ifc_elements_cache`).

use ifc_takeoff_processing::{ElementRecord, MemberKind};
use sqlx::SqlitePool;

#[derive(Debug, sqlx::FromRow)]
struct CachedElement {
    element_type: String,
    name: String,
    description: String,
    size: String,
    weight: String,
    length: String,
}

impl TryFrom<CachedElement> for ElementRecord {
    type Error = sqlx::Error;

    fn try_from(row: CachedElement) -> Result<Self, Self::Error> {
        let kind: MemberKind = row
            .element_type
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        Ok(ElementRecord {
            kind,
            name: row.name,
            description: row.description,
            size: row.size,
            weight: row.weight,
            length: row.length,
        })
    }
}

/// Cached records in extraction order; empty on a miss
pub async fn load(pool: &SqlitePool, conversion_id: i64) -> Result<Vec<ElementRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CachedElement>(
        r#"
        SELECT element_type, name, description, size, weight, length
        FROM ifc_elements_cache
        WHERE conversion_id = ?
        ORDER BY position
        "#,
    )
    .bind(conversion_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ElementRecord::try_from).collect()
}

/// Replace the cached records of a conversion in one transaction.
pub async fn store(
    pool: &SqlitePool,
    conversion_id: i64,
    records: &[ElementRecord],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM ifc_elements_cache WHERE conversion_id = ?")
        .bind(conversion_id)
        .execute(&mut *tx)
        .await?;

    for (position, record) in records.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO ifc_elements_cache
                (conversion_id, position, element_type, name, description, size, weight, length)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(conversion_id)
        .bind(position as i64)
        .bind(record.kind.as_str())
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.size)
        .bind(&record.weight)
        .bind(&record.length)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!(conversion_id, elements = records.len(), "Cached elements");
    Ok(())
}
