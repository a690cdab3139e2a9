use crate::constants::{DEFAULT_NUM_FRAMES, DEFAULT_PAGE_SIZE};
use crate::error::{MmuError, Result};
use crate::replacement::PolicyKind;

/// Construction parameters for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmuConfig {
    /// Number of physical frames (at least 1).
    pub num_frames: usize,
    /// Page and frame size in bytes, shared by every process of the run.
    pub page_size: usize,
    /// Page replacement policy.
    pub policy: PolicyKind,
}

impl MmuConfig {
    pub fn new(num_frames: usize, page_size: usize, policy: PolicyKind) -> Self {
        MmuConfig { num_frames, page_size, policy }
    }

    pub fn with_frames(mut self, num_frames: usize) -> Self {
        self.num_frames = num_frames;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Check the config before an MMU is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.num_frames == 0 {
            return Err(MmuError::InvalidConfig(
                "physical memory needs at least one frame".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(MmuError::InvalidConfig("page size must be at least 1 byte".to_string()));
        }
        // every physical address must be representable
        if self.memory_size().is_none() {
            return Err(MmuError::InvalidConfig(format!(
                "{} frames of {} bytes exceed the physical address range",
                self.num_frames, self.page_size
            )));
        }
        Ok(())
    }

    /// Total physical memory in bytes, `None` if it overflows.
    pub fn memory_size(&self) -> Option<usize> {
        self.num_frames.checked_mul(self.page_size)
    }
}

impl Default for MmuConfig {
    fn default() -> Self {
        MmuConfig::new(DEFAULT_NUM_FRAMES, DEFAULT_PAGE_SIZE, PolicyKind::Fifo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MmuConfig::default();
        assert_eq!(config.num_frames, 4);
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.policy, PolicyKind::Fifo);
        assert!(config.validate().is_ok());
        assert_eq!(config.memory_size(), Some(16384));
    }

    #[test]
    fn test_builder_methods() {
        let config = MmuConfig::default()
            .with_frames(3)
            .with_page_size(512)
            .with_policy(PolicyKind::Lru);
        assert_eq!(config, MmuConfig::new(3, 512, PolicyKind::Lru));
    }

    #[test]
    fn test_rejects_zero_frames_and_zero_page_size() {
        assert!(matches!(
            MmuConfig::default().with_frames(0).validate(),
            Err(MmuError::InvalidConfig(_))
        ));
        assert!(matches!(
            MmuConfig::default().with_page_size(0).validate(),
            Err(MmuError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_memory_larger_than_address_range() {
        let config = MmuConfig::new(4, usize::MAX / 2, PolicyKind::Fifo);
        assert_eq!(config.memory_size(), None);
        assert!(matches!(config.validate(), Err(MmuError::InvalidConfig(_))));

        // the largest pool that still fits is accepted
        let config = MmuConfig::new(2, usize::MAX / 2, PolicyKind::Fifo);
        assert!(config.validate().is_ok());
    }
}
