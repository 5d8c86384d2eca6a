use crate::error::{DiscoveryError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a discovery call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Width of the integer brute-force fallback.
    ///
    /// When static inference cannot bound a chunk-mapping function's parameter,
    /// every integer in `0..bruteforce_limit` is tried. Larger values raise
    /// recall and cost linearly; this is a recall/cost trade-off, not a
    /// correctness guarantee, so it has no default.
    pub bruteforce_limit: u32,

    /// Resource limits applied to every sandboxed evaluation
    #[serde(default)]
    pub sandbox: SandboxLimits,
}

impl DiscoveryConfig {
    /// Create config with the given brute-force width and default sandbox limits
    #[must_use]
    pub fn new(bruteforce_limit: u32) -> Self {
        Self {
            bruteforce_limit,
            sandbox: SandboxLimits::default(),
        }
    }

    /// Decode config from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate().map_err(DiscoveryError::invalid_config)?;
        Ok(config)
    }

    /// Load config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.sandbox.validate()
    }
}

/// Limits for one sandboxed evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
    /// Wall-clock budget per evaluation in milliseconds
    pub timeout_ms: u64,

    /// Maximum iterations of any single loop
    pub loop_iteration_limit: u64,

    /// Maximum call depth
    pub recursion_limit: usize,

    /// Maximum interpreter stack size (in values)
    pub stack_size_limit: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            loop_iteration_limit: 1_000_000,
            recursion_limit: 256,
            stack_size_limit: 64 * 1024,
        }
    }
}

impl SandboxLimits {
    /// Timeout as a `Duration`
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate limits
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("sandbox.timeout_ms must be > 0".to_string());
        }

        if self.recursion_limit == 0 {
            return Err("sandbox.recursion_limit must be > 0".to_string());
        }

        if self.stack_size_limit == 0 {
            return Err("sandbox.stack_size_limit must be > 0".to_string());
        }

        Ok(())
    }
}
