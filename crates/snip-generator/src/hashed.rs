use crate::KeyGenerator;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};
use snip_core::ShortKey;
use uuid::Uuid;

/// Number of digest bytes kept. 8 bytes encode to 11 base64 characters.
const TRUNCATED_LEN: usize = 8;

/// Random short key generator.
///
/// Each key is derived from a fresh v4 UUID: the 16 UUID bytes are hashed
/// with SHA-256, the digest is truncated to its first 8 bytes and encoded
/// as unpadded URL-safe base64, giving 11 characters from `[A-Za-z0-9_-]`.
///
/// The 64-bit truncation makes collisions possible at scale, so callers
/// must handle `KeyConflict` from the store by retrying.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashedUuidGenerator;

impl HashedUuidGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Derives the key for a specific UUID.
    pub fn key_for(uuid: Uuid) -> ShortKey {
        let digest = Sha256::digest(uuid.as_bytes());
        ShortKey::new_unchecked(URL_SAFE_NO_PAD.encode(&digest[..TRUNCATED_LEN]))
    }
}

impl KeyGenerator for HashedUuidGenerator {
    fn generate(&self) -> ShortKey {
        Self::key_for(Uuid::new_v4())
    }
}
