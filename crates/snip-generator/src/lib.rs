pub mod hashed;
#[cfg(any(test, feature = "testing"))]
pub mod seq;

pub use hashed::HashedUuidGenerator;
#[cfg(any(test, feature = "testing"))]
pub use seq::SeqGenerator;

use snip_core::ShortKey;

/// Trait for generating candidate short keys.
///
/// Implementations are pure generators that don't interact with storage.
/// A generated key is only a candidate: uniqueness is decided by the store,
/// and callers must retry on collision.
pub trait KeyGenerator: Send + Sync + 'static {
    /// Produces the next candidate key.
    fn generate(&self) -> ShortKey;
}
