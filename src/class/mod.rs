//! A class (race category) and the stage configuration it owns.

/// Course variants per leg and course selection.
pub mod forks;
/// Leg descriptors and true-leg numbering.
pub mod legs;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    config::EngineConfig,
    engine::{
        fairness::{ForkingReport, check_forking},
        forking::{ForkError, ForkingOutcome, plan_forking},
        leaderboard::Leaderboard,
        traits::CourseSource,
    },
    result::RunnerResult,
    revision::Snapshot,
    types::{ClassId, CourseId, LegType},
};

use self::{
    forks::ForkTable,
    legs::{LegInfo, LegTable},
};

/// Configuration errors raised by class mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassError {
    /// Leg index past the configured leg count.
    #[error("leg {leg} out of range ({legs} legs)")]
    LegOutOfRange { leg: usize, legs: usize },
    /// A parallel leg's start type conflicts with its true leg (strict mode).
    #[error("inconsistent start method on leg {leg}")]
    InconsistentStartMethod { leg: usize },
    /// Duplicate-runner link that does not point to an earlier leg.
    #[error("leg {leg} cannot share a runner with leg {target}")]
    InvalidRunnerLink { leg: usize, target: usize },
    /// The course is not at the given position on the leg.
    #[error("course {course} is not at position {position} on leg {leg}")]
    CourseNotOnLeg {
        leg: usize,
        course: CourseId,
        position: usize,
    },
    /// Imported fork rows do not match the leg count.
    #[error("{rows} fork rows for {legs} legs")]
    RowCountMismatch { rows: usize, legs: usize },
    /// Forking generation failed.
    #[error(transparent)]
    Fork(#[from] ForkError),
}

/// Serializable stage configuration of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSnapshotV1 {
    /// Class id.
    pub id: ClassId,
    /// Class name.
    pub name: String,
    /// Leg descriptors in order.
    pub legs: Vec<LegInfo>,
    /// Course rows per leg.
    pub forks: ForkTable,
    /// Course used when no fork applies.
    pub default_course: Option<CourseId>,
}

/// One class with its legs, fork table and cached leaderboard.
#[derive(Debug, Clone)]
pub struct Class {
    id: ClassId,
    name: String,
    legs: LegTable,
    forks: ForkTable,
    default_course: Option<CourseId>,
    config: EngineConfig,
    leaderboard: Option<Leaderboard>,
}

impl Class {
    /// Single-stage class.
    pub fn new(id: ClassId, name: impl Into<String>, config: EngineConfig) -> Self {
        let mut class = Self {
            id,
            name: name.into(),
            legs: LegTable::new(),
            forks: ForkTable::new(0),
            default_course: None,
            config,
            leaderboard: None,
        };
        class.set_num_stages(1);
        class
    }

    /// Rebuilds a class from its serialized configuration.
    pub fn from_snapshot(snapshot: ClassSnapshotV1, config: EngineConfig) -> Result<Self, ClassError> {
        if snapshot.forks.len() != snapshot.legs.len() {
            return Err(ClassError::RowCountMismatch {
                rows: snapshot.forks.len(),
                legs: snapshot.legs.len(),
            });
        }
        Ok(Self {
            id: snapshot.id,
            name: snapshot.name,
            legs: LegTable::from_legs(snapshot.legs),
            forks: snapshot.forks,
            default_course: snapshot.default_course,
            config,
            leaderboard: None,
        })
    }

    /// Serializable copy of the stage configuration.
    pub fn export_snapshot(&self) -> ClassSnapshotV1 {
        ClassSnapshotV1 {
            id: self.id,
            name: self.name.clone(),
            legs: self.legs.legs().to_vec(),
            forks: self.forks.clone(),
            default_course: self.default_course,
        }
    }

    /// Class id.
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Engine configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of legs.
    pub fn num_stages(&self) -> usize {
        self.legs.len()
    }

    /// Resizes legs and fork rows together; shrinking drops trailing legs.
    pub fn set_num_stages(&mut self, n: usize) {
        self.legs.set_num_legs(n);
        self.forks.set_num_legs(n);
    }

    /// Leg descriptors.
    pub fn legs(&self) -> &LegTable {
        &self.legs
    }

    /// Mutable leg descriptors; changes invalidate the cached leaderboard.
    pub fn legs_mut(&mut self) -> &mut LegTable {
        &mut self.legs
    }

    /// Course rows.
    pub fn forks(&self) -> &ForkTable {
        &self.forks
    }

    /// Mutable course rows; changes invalidate the cached leaderboard.
    pub fn forks_mut(&mut self) -> &mut ForkTable {
        &mut self.forks
    }

    /// Course used when no fork applies.
    pub fn default_course(&self) -> Option<CourseId> {
        self.default_course
    }

    /// Sets the fallback course.
    pub fn set_default_course(&mut self, course: Option<CourseId>) {
        self.default_course = course;
    }

    /// Validates parallel-leg start types, honouring
    /// [`EngineConfig::strict_start_method`].
    pub fn check_start_method(&mut self) -> Result<Vec<usize>, ClassError> {
        self.legs.check_start_method(self.config.strict_start_method)
    }

    /// Course for a runner on `leg`, see [`ForkTable::select_course`].
    pub fn select_course<S: CourseSource>(
        &self,
        leg: usize,
        fork_index: usize,
        pattern: &[u32],
        source: &S,
    ) -> Option<CourseId> {
        self.forks.select_course(
            leg,
            fork_index,
            pattern,
            source,
            self.default_course,
            self.config.shorten_iterations,
        )
    }

    /// Generates a balanced forking from per-leg candidates and writes it
    /// into the fork table. Nothing is changed when generation fails.
    pub fn auto_fork<S: CourseSource>(
        &mut self,
        candidates: &[Vec<CourseId>],
        target_forks: usize,
        source: &S,
    ) -> Result<ForkingOutcome, ClassError> {
        let legs = self.legs.len();
        if candidates.len() > legs {
            return Err(ClassError::LegOutOfRange {
                leg: candidates.len() - 1,
                legs,
            });
        }

        let outcome = plan_forking(candidates, target_forks, source, &self.config)?;

        let mut rows: Vec<Option<Vec<CourseId>>> = vec![None; legs];
        for (leg, row) in outcome.rows.iter().enumerate() {
            rows[leg] = row.clone();
        }
        for leg in 0..legs {
            let no_candidates = candidates.get(leg).is_none_or(Vec::is_empty);
            if !no_candidates || self.legs.leg_type(leg) != Some(LegType::Extra) {
                continue;
            }
            let opener = self.legs.true_leg_members(leg).start;
            if opener < leg {
                let inherited = rows[opener]
                    .clone()
                    .unwrap_or_else(|| self.forks.row(opener).to_vec());
                rows[leg] = Some(inherited);
            }
        }

        for (leg, row) in rows.into_iter().enumerate() {
            if let Some(row) = row {
                self.forks.set_row(leg, row)?;
            }
        }
        debug!(
            class = self.id,
            forks = outcome.forks,
            courses = outcome.courses_used,
            "applied forking"
        );
        Ok(outcome)
    }

    /// Course combinations implied by the fork table, one per fork index.
    /// Legs without courses are left out of the combinations.
    pub fn fork_combinations(&self) -> Vec<Vec<CourseId>> {
        (1..=self.forks.max_forks())
            .map(|fork| {
                (0..self.forks.len())
                    .filter_map(|leg| self.forks.get_course(leg, fork))
                    .collect()
            })
            .collect()
    }

    /// Fairness report over the combinations of the fork table.
    pub fn check_forking<S: CourseSource>(&self, source: &S) -> ForkingReport {
        check_forking(&self.fork_combinations(), source)
    }

    /// Leaderboard for `results`, recomputed when the configuration changed
    /// or the cached one is older than `snapshot`.
    pub fn update_leader_times<S: CourseSource>(
        &mut self,
        results: &[RunnerResult],
        snapshot: Snapshot,
        source: &S,
    ) -> &Leaderboard {
        let config_changed = self.legs.take_changed() | self.forks.take_changed();
        let fresh = self
            .leaderboard
            .as_ref()
            .is_some_and(|lb| lb.is_valid_for(snapshot));
        if config_changed || !fresh {
            self.leaderboard = None;
        }

        let legs = &self.legs;
        let config = &self.config;
        self.leaderboard
            .get_or_insert_with(|| Leaderboard::compute(legs, results, source, snapshot, config))
    }

    /// Last computed leaderboard, whatever its snapshot.
    pub fn cached_leaderboard(&self) -> Option<&Leaderboard> {
        self.leaderboard.as_ref()
    }
}
