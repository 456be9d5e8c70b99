//! Asset catalog persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `assets` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::catalog::{Asset, NewAsset};

const COLUMNS: &str = "id, filename, file_type, file_size, upload_date, last_accessed_date";

/// Fetch an asset by filename.
pub async fn get_by_filename(pool: &PgPool, filename: &str) -> Result<Option<Asset>, sqlx::Error> {
    let row = sqlx::query_as::<_, AssetRow>(&format!(
        "SELECT {COLUMNS} FROM assets WHERE filename = $1"
    ))
    .bind(filename)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(AssetRow::into_asset))
}

/// Insert a new asset, or refresh size and timestamps of an existing one.
///
/// `file_type` keeps the value from the first upload.
pub async fn upsert(
    pool: &PgPool,
    asset: &NewAsset,
    at: DateTime<Utc>,
) -> Result<Asset, sqlx::Error> {
    let row = sqlx::query_as::<_, AssetRow>(&format!(
        "INSERT INTO assets (filename, file_type, file_size, upload_date, last_accessed_date)
         VALUES ($1, $2, $3, $4, $4)
         ON CONFLICT (filename) DO UPDATE
         SET file_size = EXCLUDED.file_size,
             upload_date = EXCLUDED.upload_date,
             last_accessed_date = EXCLUDED.last_accessed_date
         RETURNING {COLUMNS}"
    ))
    .bind(asset.filename.as_str())
    .bind(&asset.file_type)
    .bind(asset.file_size)
    .bind(at)
    .fetch_one(pool)
    .await?;

    Ok(row.into_asset())
}

/// Advance `last_accessed_date`. Returns `false` if no row matched.
pub async fn touch(pool: &PgPool, filename: &str, at: DateTime<Utc>) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE assets SET last_accessed_date = $1 WHERE filename = $2")
        .bind(at)
        .bind(filename)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, filename: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assets WHERE filename = $1")
        .bind(filename)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Assets last accessed strictly before `threshold`, oldest first.
pub async fn list_accessed_before(
    pool: &PgPool,
    threshold: DateTime<Utc>,
) -> Result<Vec<Asset>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AssetRow>(&format!(
        "SELECT {COLUMNS} FROM assets
         WHERE last_accessed_date < $1
         ORDER BY last_accessed_date, id"
    ))
    .bind(threshold)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AssetRow::into_asset).collect())
}

pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AssetRow {
    id: i64,
    filename: String,
    file_type: String,
    file_size: i64,
    upload_date: DateTime<Utc>,
    last_accessed_date: DateTime<Utc>,
}

impl AssetRow {
    fn into_asset(self) -> Asset {
        Asset {
            id: self.id,
            filename: self.filename,
            file_type: self.file_type,
            file_size: self.file_size,
            upload_date: self.upload_date,
            last_accessed_date: self.last_accessed_date,
        }
    }
}
