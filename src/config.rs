//! Engine tuning knobs.

use serde::{Deserialize, Serialize};

/// Probe Map growth and chaining limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeMapConfig {
    /// Size multiplier used when the root table rehashes.
    pub growth_factor: f64,
    /// Number of chained overflow levels allowed below the root.
    pub max_chain_depth: usize,
}

impl Default for ProbeMapConfig {
    fn default() -> Self {
        Self {
            growth_factor: 1.3,
            max_chain_depth: 3,
        }
    }
}

/// Configuration shared by forking, course selection and leaderboard code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Probe Map settings for placement tables.
    pub probe: ProbeMapConfig,
    /// Above this many course combinations the forking search is sampled.
    pub fork_enumeration_limit: u64,
    /// Multiplicative stride used when sampling combinations.
    pub fork_sample_stride: u64,
    /// Seed for the shuffle that precedes fork spreading.
    pub fork_seed: u64,
    /// Maximum shortening rounds in pool-mode course selection.
    pub shorten_iterations: usize,
    /// Report start-method inconsistencies as errors instead of fixing them.
    pub strict_start_method: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe: ProbeMapConfig::default(),
            fork_enumeration_limit: 10_000_000,
            fork_sample_stride: 7_368_787,
            fork_seed: 0x6f66_6f72_6b73,
            shorten_iterations: 10,
            strict_start_method: false,
        }
    }
}
