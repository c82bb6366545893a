use crate::KeyGenerator;
use snip_core::{CoreError, ShortKey};
use std::sync::atomic::{AtomicU64, Ordering};

const COUNTER_WIDTH: usize = 6;

/// Deterministic counter-backed generator for tests.
///
/// Yields `{prefix}000000`, `{prefix}000001`, ... from a per-instance
/// counter that restarts at the given offset, so it is only suitable for
/// stores that live no longer than the generator.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Result<Self, CoreError> {
        Self::with_offset(prefix, 0)
    }

    /// Starts counting at `offset`.
    ///
    /// The prefix must keep every generated key a valid [`ShortKey`].
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Result<Self, CoreError> {
        let prefix = prefix.into();
        ShortKey::new(format!("{}{:0width$}", prefix, offset, width = COUNTER_WIDTH))?;

        Ok(Self {
            counter: AtomicU64::new(offset),
            prefix,
        })
    }
}

impl KeyGenerator for SeqGenerator {
    fn generate(&self) -> ShortKey {
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        ShortKey::new_unchecked(format!(
            "{}{:0width$}",
            self.prefix,
            count,
            width = COUNTER_WIDTH
        ))
    }
}
