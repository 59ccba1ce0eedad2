use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

pub mod entity;
pub mod remote;

pub use entity::{Entity, EntityStore};
pub use remote::{HttpRecordBackend, RemoteSettings};

/// A record as the backend sees it: storage-format field names, plus the
/// assigned identifier under [`ID_FIELD`].
pub type Fields = Map<String, Value>;

pub const ID_FIELD: &str = "Id";

/// Generic collection-of-records store. Implementations know nothing about
/// deals or invoices; they move field documents keyed by an integer id.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Fields>>;

    async fn fetch_one(&self, collection: &str, id: i64) -> Result<Option<Fields>>;

    /// Inserts a record and returns it with its newly assigned id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<Option<Fields>>;

    /// Merges `fields` into an existing record. Fields not present in the
    /// patch keep their stored value. Returns `None` if the id is unknown.
    async fn update(&self, collection: &str, id: i64, fields: Fields) -> Result<Option<Fields>>;

    async fn delete(&self, collection: &str, id: i64) -> Result<bool>;
}

/// SQLite-backed record store. Every collection lives in the single
/// `records` table as a JSON document per `(collection, id)`. Ids come from
/// a per-collection counter, so a deleted id is never handed out again.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn count(&self, collection: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("failed to count '{collection}' records"))?;
        Ok(count)
    }
}

#[async_trait]
impl RecordBackend for Storage {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Fields>> {
        let rows = sqlx::query("SELECT id, fields FROM records WHERE collection = ? ORDER BY id")
            .bind(collection)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to list '{collection}' records"))?;
        rows.iter().map(row_to_fields).collect()
    }

    async fn fetch_one(&self, collection: &str, id: i64) -> Result<Option<Fields>> {
        let row = sqlx::query("SELECT id, fields FROM records WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load '{collection}' record {id}"))?;
        row.as_ref().map(row_to_fields).transpose()
    }

    async fn create(&self, collection: &str, mut fields: Fields) -> Result<Option<Fields>> {
        fields.remove(ID_FIELD);
        let document = serde_json::to_string(&fields)?;
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO collection_ids (collection, last_id) VALUES (?, 1)
             ON CONFLICT (collection) DO UPDATE SET last_id = last_id + 1
             RETURNING last_id",
        )
        .bind(collection)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("failed to assign '{collection}' id"))?;
        sqlx::query("INSERT INTO records (collection, id, fields) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(id)
            .bind(document)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert '{collection}' record"))?;
        tx.commit().await?;
        debug!(collection, id, "record created");

        fields.insert(ID_FIELD.to_string(), Value::from(id));
        Ok(Some(fields))
    }

    async fn update(&self, collection: &str, id: i64, fields: Fields) -> Result<Option<Fields>> {
        let mut tx = self.pool.begin().await?;
        let stored: Option<String> =
            sqlx::query_scalar("SELECT fields FROM records WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .with_context(|| format!("failed to load '{collection}' record {id}"))?;
        let Some(stored) = stored else {
            return Ok(None);
        };

        let mut document: Fields = serde_json::from_str(&stored)
            .with_context(|| format!("corrupt '{collection}' record {id}"))?;
        for (key, value) in fields {
            if key != ID_FIELD {
                document.insert(key, value);
            }
        }

        sqlx::query(
            "UPDATE records SET fields = ?, updated_at = CURRENT_TIMESTAMP
             WHERE collection = ? AND id = ?",
        )
        .bind(serde_json::to_string(&document)?)
        .bind(collection)
        .bind(id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to update '{collection}' record {id}"))?;
        tx.commit().await?;
        debug!(collection, id, "record updated");

        document.insert(ID_FIELD.to_string(), Value::from(id));
        Ok(Some(document))
    }

    async fn delete(&self, collection: &str, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete '{collection}' record {id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_fields(row: &SqliteRow) -> Result<Fields> {
    let id: i64 = row.try_get("id")?;
    let raw: String = row.try_get("fields")?;
    let mut fields: Fields =
        serde_json::from_str(&raw).with_context(|| format!("corrupt record {id}"))?;
    fields.insert(ID_FIELD.to_string(), Value::from(id));
    Ok(fields)
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
