use crate::error::CoreError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;
use std::str::FromStr;

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 32;

/// A validated short key identifying a shortened URL.
///
/// Short keys must be 3-32 characters long and contain only
/// URL-path-safe characters: `[A-Za-z0-9_-]`. Keys are case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortKey(String);

impl ShortKey {
    /// Creates a new `ShortKey` after validating the input.
    pub fn new(key: impl Into<String>) -> Result<Self, CoreError> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(key))
    }

    /// Creates a `ShortKey` without validation.
    ///
    /// Use this only for keys produced by trusted internal sources
    /// (key generators, rows read back from the store).
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Builds the full short URL under the given public base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    fn validate(key: &str) -> Result<(), CoreError> {
        if key.len() < MIN_LENGTH || key.len() > MAX_LENGTH {
            return Err(CoreError::InvalidShortKey(format!(
                "length must be between {} and {}, got {}",
                MIN_LENGTH,
                MAX_LENGTH,
                key.len()
            )));
        }

        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidShortKey(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                key
            )));
        }

        Ok(())
    }
}

impl Display for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ShortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ShortKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}
