use snip_core::AllocationError;
use typed_builder::TypedBuilder;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Configures an [`AllocationService`](crate::AllocationService).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct AllocatorSettings {
    /// Upper bound on insert attempts per allocation. Must be at least 1.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl AllocatorSettings {
    pub(crate) fn validate(&self) -> Result<(), AllocationError> {
        if self.max_attempts == 0 {
            return Err(AllocationError::InvalidSettings(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}
