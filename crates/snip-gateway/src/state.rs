use std::sync::Arc;
use std::time::Duration;

use snip_core::Allocator;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, TypedBuilder)]
pub struct AppState {
    allocator: Arc<dyn Allocator>,
    /// Public origin used to build full short URLs, e.g. `https://sn.ip`.
    #[builder(setter(into))]
    base_url: String,
    /// Deadline for a single create request, retries included.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    request_timeout: Duration,
    /// Fired at process shutdown; in-flight allocations abort on it.
    #[builder(default)]
    shutdown: CancellationToken,
}

impl AppState {
    pub fn allocator(&self) -> &dyn Allocator {
        self.allocator.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }
}
