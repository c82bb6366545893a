use crate::settings::AllocatorSettings;
use async_trait::async_trait;
use snip_core::{AllocationError, Allocator, Mapping, MappingStore, ShortKey, StoreError};
use snip_generator::KeyGenerator;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

type Result<T> = std::result::Result<T, AllocationError>;

/// A concrete implementation of the [`Allocator`] trait.
///
/// The service is stateless: every correctness guarantee under concurrency
/// comes from the store's atomic insert-or-fail. Any number of instances
/// may run against one store without local locking.
#[derive(Debug)]
pub struct AllocationService<S, G> {
    store: Arc<S>,
    generator: Arc<G>,
    settings: AllocatorSettings,
}

impl<S, G> Clone for AllocationService<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            settings: self.settings,
        }
    }
}

impl<S: MappingStore, G: KeyGenerator> AllocationService<S, G> {
    pub fn new(store: S, generator: G, settings: AllocatorSettings) -> Result<Self> {
        Self::with_shared_store(Arc::new(store), generator, settings)
    }

    /// Creates a service over a store that is also held elsewhere, e.g. by
    /// the process that closes it at shutdown.
    pub fn with_shared_store(
        store: Arc<S>,
        generator: G,
        settings: AllocatorSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            store,
            generator: Arc::new(generator),
            settings,
        })
    }

    pub fn settings(&self) -> &AllocatorSettings {
        &self.settings
    }

    /// Awaits a store call unless `cancel` fires first.
    async fn guarded<T>(
        cancel: &CancellationToken,
        call: impl Future<Output = std::result::Result<T, StoreError>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AllocationError::Cancelled),
            result = call => result.map_err(AllocationError::from),
        }
    }

    async fn existing_key(
        &self,
        original_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ShortKey>> {
        Self::guarded(cancel, self.store.lookup_by_original(original_url)).await
    }
}

#[async_trait]
impl<S: MappingStore, G: KeyGenerator> Allocator for AllocationService<S, G> {
    async fn allocate_with_cancel(
        &self,
        original_url: &str,
        cancel: &CancellationToken,
    ) -> Result<ShortKey> {
        if let Some(key) = self.existing_key(original_url, cancel).await? {
            trace!(key = %key, "original url already mapped");
            return Ok(key);
        }

        let max_attempts = self.settings.max_attempts;
        for attempt in 1..=max_attempts {
            let candidate = self.generator.generate();

            match Self::guarded(cancel, self.store.insert(original_url, &candidate)).await {
                Ok(mapping) => {
                    debug!(key = %mapping.short_key, attempt, "allocated short key");
                    return Ok(mapping.short_key);
                }
                Err(AllocationError::Store(StoreError::KeyConflict(_))) => {
                    debug!(key = %candidate, attempt, "short key collision, retrying");
                }
                Err(AllocationError::Store(StoreError::UrlConflict(_))) => {
                    // A concurrent caller won the race for this URL.
                    if let Some(key) = self.existing_key(original_url, cancel).await? {
                        debug!(key = %key, attempt, "adopting key of concurrent winner");
                        return Ok(key);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        // Last ownership check so a lost race never surfaces as exhaustion.
        if let Some(key) = self.existing_key(original_url, cancel).await? {
            return Ok(key);
        }

        debug!(max_attempts, "short key allocation exhausted");
        Err(AllocationError::Exhausted {
            attempts: max_attempts,
        })
    }

    async fn resolve(&self, key: &ShortKey) -> Result<String> {
        self.mapping(key).await.map(|mapping| mapping.original_url)
    }

    async fn mapping(&self, key: &ShortKey) -> Result<Mapping> {
        match self.store.lookup_by_key(key).await? {
            Some(mapping) => Ok(mapping),
            None => {
                trace!(key = %key, "short key not found");
                Err(AllocationError::NotFound(key.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snip_generator::SeqGenerator;
    use snip_storage::InMemoryStore;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Yields the scripted keys in order, repeating the last one.
    struct ScriptedGenerator {
        keys: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(keys: Vec<&'static str>) -> Self {
            Self {
                keys,
                next: AtomicUsize::new(0),
            }
        }
    }

    impl KeyGenerator for ScriptedGenerator {
        fn generate(&self) -> ShortKey {
            let i = self.next.fetch_add(1, Ordering::Relaxed);
            ShortKey::new_unchecked(self.keys[i.min(self.keys.len() - 1)])
        }
    }

    /// Store whose inserts always fail with the configured error.
    struct RejectingStore {
        error: StoreError,
        inserts: AtomicU32,
        lookups: AtomicU32,
    }

    impl RejectingStore {
        fn new(error: StoreError) -> Self {
            Self {
                error,
                inserts: AtomicU32::new(0),
                lookups: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl MappingStore for RejectingStore {
        async fn lookup_by_original(&self, _: &str) -> snip_core::error::Result<Option<ShortKey>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn lookup_by_key(&self, _: &ShortKey) -> snip_core::error::Result<Option<Mapping>> {
            Ok(None)
        }

        async fn insert(&self, _: &str, _: &ShortKey) -> snip_core::error::Result<Mapping> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }

        async fn close(&self) -> snip_core::error::Result<()> {
            Ok(())
        }
    }

    /// Simulates losing a race: the first insert reports `UrlConflict` after
    /// a "concurrent" writer stored `winner` for the URL.
    struct LostRaceStore {
        inner: InMemoryStore,
        winner: ShortKey,
        inserts: AtomicU32,
    }

    #[async_trait]
    impl MappingStore for LostRaceStore {
        async fn lookup_by_original(&self, url: &str) -> snip_core::error::Result<Option<ShortKey>> {
            self.inner.lookup_by_original(url).await
        }

        async fn lookup_by_key(&self, key: &ShortKey) -> snip_core::error::Result<Option<Mapping>> {
            self.inner.lookup_by_key(key).await
        }

        async fn insert(&self, url: &str, key: &ShortKey) -> snip_core::error::Result<Mapping> {
            if self.inserts.fetch_add(1, Ordering::SeqCst) == 0 {
                self.inner.insert(url, &self.winner).await?;
                return Err(StoreError::UrlConflict(url.to_string()));
            }
            self.inner.insert(url, key).await
        }

        async fn close(&self) -> snip_core::error::Result<()> {
            self.inner.close().await
        }
    }

    /// Store whose inserts never complete.
    struct HangingStore;

    #[async_trait]
    impl MappingStore for HangingStore {
        async fn lookup_by_original(&self, _: &str) -> snip_core::error::Result<Option<ShortKey>> {
            Ok(None)
        }

        async fn lookup_by_key(&self, key: &ShortKey) -> snip_core::error::Result<Option<Mapping>> {
            Ok(Some(Mapping {
                original_url: "https://example.com".to_string(),
                short_key: key.clone(),
                created_at: "2026-01-01T00:00:00Z".parse().unwrap(),
            }))
        }

        async fn insert(&self, _: &str, _: &ShortKey) -> snip_core::error::Result<Mapping> {
            std::future::pending().await
        }

        async fn close(&self) -> snip_core::error::Result<()> {
            Ok(())
        }
    }

    fn seq_service() -> AllocationService<InMemoryStore, SeqGenerator> {
        AllocationService::new(
            InMemoryStore::new(),
            SeqGenerator::with_prefix("sn").unwrap(),
            AllocatorSettings::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn allocate_generates_a_key() {
        let service = seq_service();

        let key = service.allocate("https://example.com").await.unwrap();
        assert_eq!(key.as_str(), "sn000000");
    }

    #[tokio::test]
    async fn allocate_is_idempotent_per_url() {
        let service = seq_service();

        let first = service.allocate("https://example.com").await.unwrap();
        let second = service.allocate("https://example.com").await.unwrap();

        assert_eq!(first, second);
        // no candidate was generated for the second call
        let next = service.allocate("https://other.example").await.unwrap();
        assert_eq!(next.as_str(), "sn000001");
    }

    #[tokio::test]
    async fn key_collision_retries_with_new_candidate() {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert("https://taken.example", &ShortKey::new_unchecked("taken01"))
            .await
            .unwrap();

        let service = AllocationService::with_shared_store(
            Arc::clone(&store),
            ScriptedGenerator::new(vec!["taken01", "taken01", "fresh01"]),
            AllocatorSettings::default(),
        )
        .unwrap();

        let key = service.allocate("https://example.com").await.unwrap();
        assert_eq!(key.as_str(), "fresh01");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn sustained_key_conflicts_exhaust_after_max_attempts() {
        let store = Arc::new(RejectingStore::new(StoreError::KeyConflict("k".into())));
        let service = AllocationService::with_shared_store(
            Arc::clone(&store),
            SeqGenerator::with_prefix("sn").unwrap(),
            AllocatorSettings::builder().max_attempts(3).build(),
        )
        .unwrap();

        let err = service.allocate("https://example.com").await.unwrap_err();

        assert_eq!(err, AllocationError::Exhausted { attempts: 3 });
        assert_eq!(store.inserts.load(Ordering::SeqCst), 3);
        // initial lookup plus the final ownership check
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_collision_errors_are_not_retried() {
        let store = Arc::new(RejectingStore::new(StoreError::Unavailable(
            "connection refused".into(),
        )));
        let service = AllocationService::with_shared_store(
            Arc::clone(&store),
            SeqGenerator::with_prefix("sn").unwrap(),
            AllocatorSettings::default(),
        )
        .unwrap();

        let err = service.allocate("https://example.com").await.unwrap_err();

        assert_eq!(
            err,
            AllocationError::Store(StoreError::Unavailable("connection refused".into()))
        );
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn url_conflict_returns_the_winners_key() {
        let winner = ShortKey::new_unchecked("winner1");
        let store = Arc::new(LostRaceStore {
            inner: InMemoryStore::new(),
            winner: winner.clone(),
            inserts: AtomicU32::new(0),
        });
        let service = AllocationService::with_shared_store(
            Arc::clone(&store),
            SeqGenerator::with_prefix("sn").unwrap(),
            AllocatorSettings::default(),
        )
        .unwrap();

        let key = service.allocate("https://example.com").await.unwrap();

        assert_eq!(key, winner);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(store.inner.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_aborts_a_pending_insert() {
        let service = AllocationService::new(
            HangingStore,
            SeqGenerator::with_prefix("sn").unwrap(),
            AllocatorSettings::default(),
        )
        .unwrap();
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancel.cancel();
            })
        };

        let err = service
            .allocate_with_cancel("https://example.com", &cancel)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err, AllocationError::Cancelled);
    }

    #[tokio::test]
    async fn already_cancelled_token_makes_no_store_calls() {
        let store = Arc::new(RejectingStore::new(StoreError::KeyConflict("k".into())));
        let service = AllocationService::with_shared_store(
            Arc::clone(&store),
            SeqGenerator::with_prefix("sn").unwrap(),
            AllocatorSettings::default(),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .allocate_with_cancel("https://example.com", &cancel)
            .await
            .unwrap_err();

        assert_eq!(err, AllocationError::Cancelled);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resolve_round_trips() {
        let service = seq_service();

        let key = service.allocate("https://example.com/a").await.unwrap();
        let url = service.resolve(&key).await.unwrap();
        assert_eq!(url, "https://example.com/a");

        let mapping = service.mapping(&key).await.unwrap();
        assert_eq!(mapping.short_key, key);
    }

    #[tokio::test]
    async fn resolve_unknown_key_is_not_found() {
        let service = seq_service();

        let err = service
            .resolve(&ShortKey::new("bogus000").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn resolve_surfaces_store_errors() {
        let store = InMemoryStore::new();
        store.close().await.unwrap();
        let service = AllocationService::new(
            store,
            SeqGenerator::with_prefix("sn").unwrap(),
            AllocatorSettings::default(),
        )
        .unwrap();

        let err = service
            .resolve(&ShortKey::new("abc123").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, AllocationError::Store(StoreError::Closed));
    }

    #[test]
    fn zero_max_attempts_is_rejected() {
        let result = AllocationService::new(
            InMemoryStore::new(),
            SeqGenerator::with_prefix("sn").unwrap(),
            AllocatorSettings::builder().max_attempts(0).build(),
        );
        assert!(matches!(result, Err(AllocationError::InvalidSettings(_))));
    }
}
