//! Short key allocation.
//!
//! [`AllocationService`] maps an original URL to a short key exactly once:
//! it looks up an existing mapping, otherwise draws candidate keys from a
//! [`KeyGenerator`](snip_generator::KeyGenerator) and inserts them into a
//! [`MappingStore`](snip_core::MappingStore) until one sticks, a concurrent
//! winner is found, or the attempt budget runs out.

pub mod service;
pub mod settings;

pub use service::AllocationService;
pub use settings::{AllocatorSettings, DEFAULT_MAX_ATTEMPTS};
pub use snip_core::{AllocationError, Allocator};
