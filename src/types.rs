//! Shared primitive IDs and race-structure enums.

use serde::{Deserialize, Serialize};

/// Control identifier, as assigned by the registry.
pub type ControlId = u32;
/// Course identifier.
pub type CourseId = u32;
/// Class (race category) identifier.
pub type ClassId = u32;
/// Runner identifier.
pub type RunnerId = u64;
/// Team identifier.
pub type TeamId = u64;
/// Race time or clock time in whole seconds.
pub type Seconds = u32;

/// Pseudo control standing for the start in leg pairs and course keys.
pub const START_CONTROL: ControlId = 0;
/// Pseudo control standing for the finish in leg pairs and course keys.
pub const FINISH_CONTROL: ControlId = u32::MAX;

/// A directed control-to-control leg, `(from, to)`.
pub type LegPair = (ControlId, ControlId);

/// How runners on a leg are started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StartType {
    /// Common start at a fixed clock time (the leg's start data).
    #[default]
    FixedClock,
    /// Start when the previous leg's runner finishes (relay change-over).
    MassChange,
    /// Individually drawn start times.
    DrawnLot,
    /// Pursuit start from the accumulated time behind the leader.
    Pursuit,
}

/// How a leg relates to the legs around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LegType {
    /// Ordinary leg; opens a new true leg.
    #[default]
    Normal,
    /// Run in parallel with the previous true leg.
    Parallel,
    /// Parallel leg that may be left unrun.
    ParallelOptional,
    /// Extra leg; only the best of the extra group counts.
    Extra,
    /// Opens a new true leg whose time is summed into the total.
    Summed,
    /// Run, but ignored in the team result.
    Ignored,
    /// Opens a new true leg grouping the following parallel legs.
    Grouped,
}

impl LegType {
    /// True when this leg opens a new true leg.
    pub fn opens_true_leg(self) -> bool {
        matches!(self, Self::Normal | Self::Summed | Self::Grouped)
    }

    /// True for the two parallel variants.
    pub fn is_parallel(self) -> bool {
        matches!(self, Self::Parallel | Self::ParallelOptional)
    }
}

/// Result status of one runner on one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RunnerStatus {
    /// Not yet finished or not yet read out.
    #[default]
    Unknown,
    /// Valid result.
    Ok,
    /// Did not start.
    NotStarted,
    /// Did not finish.
    DidNotFinish,
    /// Missing or wrong punch.
    MissingPunch,
    /// Disqualified.
    Disqualified,
    /// Over the maximum time.
    OverTime,
}

impl RunnerStatus {
    /// True while the runner may still produce a result on the leg.
    pub fn is_pending(self) -> bool {
        self == Self::Unknown
    }

    /// True when the runner was on the course, so split times are meaningful.
    pub fn has_run(self) -> bool {
        !matches!(self, Self::NotStarted)
    }
}
