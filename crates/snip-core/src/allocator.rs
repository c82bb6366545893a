use crate::error::AllocationError;
use crate::shortkey::ShortKey;
use crate::store::Mapping;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

type Result<T> = std::result::Result<T, AllocationError>;

#[async_trait]
pub trait Allocator: Send + Sync + 'static {
    /// Returns the short key for `original_url`, creating the mapping on
    /// first use. Repeated calls for the same URL return the same key.
    async fn allocate(&self, original_url: &str) -> Result<ShortKey> {
        self.allocate_with_cancel(original_url, &CancellationToken::new())
            .await
    }

    /// Same as [`allocate`](Allocator::allocate), but gives up with
    /// `Cancelled` as soon as `cancel` fires, including mid-retry.
    async fn allocate_with_cancel(
        &self,
        original_url: &str,
        cancel: &CancellationToken,
    ) -> Result<ShortKey>;

    /// Resolves a short key to its original URL.
    /// Fails with `NotFound` if the key was never issued.
    async fn resolve(&self, key: &ShortKey) -> Result<String>;

    /// Returns the full mapping stored for `key`.
    async fn mapping(&self, key: &ShortKey) -> Result<Mapping>;
}
