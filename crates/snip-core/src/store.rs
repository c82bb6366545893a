use crate::error::Result;
use crate::shortkey::ShortKey;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored mapping between an original URL and its short key.
///
/// Mappings are immutable once created: there is no update path, and no
/// delete path either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    /// The original URL that was shortened.
    pub original_url: String,
    /// The key that resolves to `original_url`.
    pub short_key: ShortKey,
    /// When the store accepted the mapping.
    pub created_at: Timestamp,
}

/// Persistence contract consumed by the allocator.
///
/// Both `short_key` and `original_url` are unique across all mappings, and
/// implementations must enforce that atomically: a single insert either
/// fully succeeds or fails with a classified conflict, and no concurrent
/// reader ever observes a partial insert.
#[async_trait]
pub trait MappingStore: Send + Sync + 'static {
    /// Returns the short key already assigned to `original_url`, if any.
    async fn lookup_by_original(&self, original_url: &str) -> Result<Option<ShortKey>>;

    /// Returns the mapping for `key`, or `None` if the key was never issued.
    async fn lookup_by_key(&self, key: &ShortKey) -> Result<Option<Mapping>>;

    /// Inserts a new mapping.
    ///
    /// Fails with `KeyConflict` if `key` is taken, `UrlConflict` if
    /// `original_url` already has a key, or any other `StoreError` for
    /// failures unrelated to uniqueness.
    async fn insert(&self, original_url: &str, key: &ShortKey) -> Result<Mapping>;

    /// Releases backend resources. Called once at shutdown.
    async fn close(&self) -> Result<()>;
}
