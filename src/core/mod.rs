//! Lookup structures shared by the engines.

/// Helper index aliases.
pub mod indices;
/// Open-addressing placement map.
pub mod probe_map;
