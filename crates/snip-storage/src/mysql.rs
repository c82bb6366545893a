use crate::sql::{is_unique_violation, map_sqlx_error, now_unix_millis, parse_created_at};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use snip_core::error::Result;
use snip_core::{Mapping, MappingStore, ShortKey, StoreError};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySqlPool, Row};
use tracing::debug;

/// MySQL implementation of the mapping store.
///
/// `original_url` is stored as `TEXT`, which MySQL cannot index for
/// uniqueness in full. The unique constraint is placed on a SHA-256 of the
/// URL instead, which also makes URL comparison byte-exact regardless of
/// the table collation. Short keys use a binary collation since they are
/// case-sensitive.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `mappings` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(include_str!("../ddl/mysql/mappings.sql"))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn classify_conflict(&self, original_url: &str, key: &ShortKey) -> StoreError {
        match self.lookup_by_original(original_url).await {
            Ok(Some(_)) => StoreError::UrlConflict(original_url.to_string()),
            Ok(None) => StoreError::KeyConflict(key.to_string()),
            Err(err) => err,
        }
    }
}

fn url_hash(original_url: &str) -> Vec<u8> {
    Sha256::digest(original_url.as_bytes()).to_vec()
}

#[async_trait]
impl MappingStore for MySqlStore {
    async fn lookup_by_original(&self, original_url: &str) -> Result<Option<ShortKey>> {
        let row = sqlx::query(
            r#"
            SELECT short_key
            FROM mappings
            WHERE original_url_hash = ?
            LIMIT 1
            "#,
        )
        .bind(url_hash(original_url))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let short_key: String = row.try_get("short_key").map_err(map_sqlx_error)?;
        Ok(Some(ShortKey::new_unchecked(short_key)))
    }

    async fn lookup_by_key(&self, key: &ShortKey) -> Result<Option<Mapping>> {
        let row = sqlx::query(
            r#"
            SELECT original_url, created_at
            FROM mappings
            WHERE short_key = ?
            LIMIT 1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

        Ok(Some(Mapping {
            original_url,
            short_key: key.clone(),
            created_at: parse_created_at(created_at)?,
        }))
    }

    async fn insert(&self, original_url: &str, key: &ShortKey) -> Result<Mapping> {
        let created_at = now_unix_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO mappings (original_url, original_url_hash, short_key, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(original_url)
        .bind(url_hash(original_url))
        .bind(key.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Mapping {
                original_url: original_url.to_string(),
                short_key: key.clone(),
                created_at: parse_created_at(created_at)?,
            }),
            Err(err) if is_unique_violation(&err) => {
                let conflict = self.classify_conflict(original_url, key).await;
                debug!(key = %key, error = %conflict, "mysql insert hit unique constraint");
                Err(conflict)
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
