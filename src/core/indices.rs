use hashbrown::HashMap;

use crate::types::{CourseId, LegPair, Seconds};

/// Occurrence count per directed leg.
pub type PairCounts = HashMap<LegPair, usize>;
/// Times recorded per directed leg.
pub type PairTimes = HashMap<LegPair, Vec<Seconds>>;
/// Times recorded per course position, keyed by `(course, control index)`.
pub type PositionTimes = HashMap<(CourseId, usize), Vec<Seconds>>;
