use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::Mutex;
use snip_core::error::Result;
use snip_core::{Mapping, MappingStore, ShortKey, StoreError};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Tables {
    by_key: HashMap<ShortKey, Mapping>,
    by_original: HashMap<String, ShortKey>,
    closed: bool,
}

impl Tables {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

/// In-memory implementation of [`MappingStore`].
///
/// Both unique indexes live behind one lock, so an insert checks the key
/// and the original URL and writes both indexes as a single atomic step.
/// The critical section never awaits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tables: Mutex::new(Tables {
                by_key: HashMap::with_capacity(capacity),
                by_original: HashMap::with_capacity(capacity),
                closed: false,
            }),
        }
    }

    /// Number of stored mappings.
    pub fn len(&self) -> usize {
        self.tables.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MappingStore for InMemoryStore {
    async fn lookup_by_original(&self, original_url: &str) -> Result<Option<ShortKey>> {
        let tables = self.tables.lock();
        tables.ensure_open()?;
        Ok(tables.by_original.get(original_url).cloned())
    }

    async fn lookup_by_key(&self, key: &ShortKey) -> Result<Option<Mapping>> {
        let tables = self.tables.lock();
        tables.ensure_open()?;
        Ok(tables.by_key.get(key).cloned())
    }

    async fn insert(&self, original_url: &str, key: &ShortKey) -> Result<Mapping> {
        let mut tables = self.tables.lock();
        tables.ensure_open()?;

        if tables.by_key.contains_key(key) {
            return Err(StoreError::KeyConflict(key.to_string()));
        }
        if tables.by_original.contains_key(original_url) {
            return Err(StoreError::UrlConflict(original_url.to_string()));
        }

        let mapping = Mapping {
            original_url: original_url.to_string(),
            short_key: key.clone(),
            created_at: Timestamp::now(),
        };
        tables
            .by_original
            .insert(original_url.to_string(), key.clone());
        tables.by_key.insert(key.clone(), mapping.clone());

        Ok(mapping)
    }

    async fn close(&self) -> Result<()> {
        self.tables.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(s: &str) -> ShortKey {
        ShortKey::new_unchecked(s)
    }

    #[tokio::test]
    async fn insert_and_lookup_both_ways() {
        let store = InMemoryStore::new();

        let mapping = store
            .insert("https://example.com", &key("abc123"))
            .await
            .unwrap();
        assert_eq!(mapping.original_url, "https://example.com");
        assert_eq!(mapping.short_key, key("abc123"));

        let by_key = store.lookup_by_key(&key("abc123")).await.unwrap().unwrap();
        assert_eq!(by_key, mapping);

        let by_original = store
            .lookup_by_original("https://example.com")
            .await
            .unwrap();
        assert_eq!(by_original, Some(key("abc123")));
    }

    #[tokio::test]
    async fn lookups_of_missing_entries_are_not_errors() {
        let store = InMemoryStore::new();

        assert!(store.lookup_by_key(&key("nope")).await.unwrap().is_none());
        assert!(store
            .lookup_by_original("https://missing.example")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn insert_classifies_key_conflict() {
        let store = InMemoryStore::new();
        store.insert("https://one.example", &key("abc123")).await.unwrap();

        let err = store
            .insert("https://two.example", &key("abc123"))
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::KeyConflict("abc123".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn insert_classifies_url_conflict() {
        let store = InMemoryStore::new();
        store.insert("https://one.example", &key("abc123")).await.unwrap();

        let err = store
            .insert("https://one.example", &key("xyz789"))
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::UrlConflict("https://one.example".to_string()));
        assert!(store.lookup_by_key(&key("xyz789")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closed_store_rejects_operations() {
        let store = InMemoryStore::new();
        store.close().await.unwrap();

        assert_eq!(
            store.lookup_by_key(&key("abc123")).await.unwrap_err(),
            StoreError::Closed
        );
        assert_eq!(
            store
                .insert("https://example.com", &key("abc123"))
                .await
                .unwrap_err(),
            StoreError::Closed
        );
        // idempotent
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_inserts_of_one_url_leave_one_mapping() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = vec![];

        for i in 0..20u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert("https://race.example", &key(&format!("key-{:03}", i)))
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(err) => assert!(matches!(err, StoreError::UrlConflict(_))),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.len(), 1);
    }
}
