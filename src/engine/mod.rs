//! Forking generation, fairness checks and leaderboard computation.

/// Forking fairness report.
pub mod fairness;
/// Balanced course-combination generator.
pub mod forking;
/// Per-leg leader times and pursuit starts.
pub mod leaderboard;
/// Split placements and leader-time estimation.
pub mod splits;
/// Course lookup seam.
pub mod traits;
