//! Miner configuration
//!
//! `MinerConfig` holds the two algorithm parameters (`K`, `T`) and the
//! similarity cache bound, so no threshold is hardcoded in the engine.

use crate::error::{MineError, Result};

/// Default maximum generalized-node size (`K`)
pub const DEFAULT_MAX_GN_SIZE: usize = 10;

/// Default similarity threshold (`T`)
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Default number of memoized distances kept per run
pub const DEFAULT_CACHE_CAPACITY: usize = 65_536;

#[derive(Debug, Clone, PartialEq)]
pub struct MinerConfig {
    /// Maximum number of adjacent siblings in one generalized node
    pub max_gn_size: usize,
    /// Distance at or below which two structures count as similar
    pub threshold: f64,
    /// Bound on the per-run similarity cache
    pub cache_capacity: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            max_gn_size: DEFAULT_MAX_GN_SIZE,
            threshold: DEFAULT_THRESHOLD,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl MinerConfig {
    /// Config with explicit `K` and `T`, default cache bound
    pub fn new(max_gn_size: usize, threshold: f64) -> Self {
        Self {
            max_gn_size,
            threshold,
            ..Self::default()
        }
    }

    pub fn with_max_gn_size(mut self, max_gn_size: usize) -> Self {
        self.max_gn_size = max_gn_size;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    /// Reject out-of-range parameters before any traversal
    pub fn validate(&self) -> Result<()> {
        if self.max_gn_size < 1 {
            return Err(MineError::invalid_parameter(format!(
                "max_gn_size must be >= 1, got {}",
                self.max_gn_size
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(MineError::invalid_parameter(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if self.cache_capacity == 0 {
            return Err(MineError::invalid_parameter("cache_capacity must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MinerConfig::default();
        assert_eq!(config.max_gn_size, 10);
        assert_eq!(config.threshold, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_k() {
        let err = MinerConfig::new(0, 0.3).validate().unwrap_err();
        assert!(matches!(err, MineError::InvalidParameter(_)));
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        assert!(MinerConfig::new(10, -0.1).validate().is_err());
        assert!(MinerConfig::new(10, 1.5).validate().is_err());
        assert!(MinerConfig::new(10, f64::NAN).validate().is_err());
        assert!(MinerConfig::new(10, 0.0).validate().is_ok());
        assert!(MinerConfig::new(10, 1.0).validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_cache() {
        let config = MinerConfig::default().with_cache_capacity(0);
        assert!(config.validate().is_err());
    }
}
