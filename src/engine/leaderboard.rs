//! Per-leg leader times.
//!
//! Legs are processed in order because a team's total after a leg builds on
//! its total after the previous true leg. Within a true leg, parallel legs
//! count with the slowest member and the opening leg and its extra legs
//! count with the best of them; ignored legs never enter totals.

use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::{
    class::legs::LegTable,
    config::EngineConfig,
    engine::{splits::SplitTables, traits::CourseSource},
    result::RunnerResult,
    revision::Snapshot,
    types::{ControlId, CourseId, LegType, RunnerId, Seconds, StartType, TeamId},
};

/// A best time with a live value and a value frozen at leg completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestTime {
    live: Option<Seconds>,
    computed: Option<Seconds>,
}

impl BestTime {
    /// Keeps the smaller of the current value and `time`.
    pub fn improve(&mut self, time: Seconds) {
        self.live = Some(self.live.map_or(time, |cur| cur.min(time)));
    }

    /// Freezes the live value.
    pub fn lock(&mut self) {
        self.computed = self.live;
    }

    /// Value updated as results are folded in.
    pub fn live(&self) -> Option<Seconds> {
        self.live
    }

    /// Value frozen when the leg completed.
    pub fn computed(&self) -> Option<Seconds> {
        self.computed
    }
}

/// Leader times of one leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegLeader {
    /// Best running time on the leg alone.
    pub leg_time: BestTime,
    /// Best team total after the leg.
    pub total: BestTime,
    /// Best team total after the leg including input times.
    pub total_with_input: BestTime,
    /// Best input time.
    pub input: BestTime,
    complete: bool,
}

impl LegLeader {
    /// True when no runner on the leg is still pending.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    fn lock(&mut self) {
        self.complete = true;
        self.leg_time.lock();
        self.total.lock();
        self.total_with_input.lock();
        self.input.lock();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Entrant {
    Team(TeamId),
    Solo(RunnerId),
}

impl Entrant {
    fn of(result: &RunnerResult) -> Self {
        match result.team {
            Some(team) => Self::Team(team),
            None => Self::Solo(result.runner),
        }
    }
}

/// Running totals of one entrant while legs are folded in.
///
/// The leg opening a true leg and its extra legs form a best-of group;
/// parallel members count with the slowest time.
#[derive(Debug, Clone, Copy)]
struct Progress {
    /// Total after the last closed true leg; `None` once a required leg
    /// lacks a valid time.
    base: Option<Seconds>,
    best_of: Option<Seconds>,
    best_of_needed: bool,
    slowest_parallel: Option<Seconds>,
    missing: bool,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            base: Some(0),
            best_of: None,
            best_of_needed: false,
            slowest_parallel: None,
            missing: false,
        }
    }
}

impl Progress {
    fn record(&mut self, leg_type: LegType, opener: bool, time: Option<Seconds>) {
        if opener || leg_type == LegType::Extra {
            self.best_of_needed = true;
            if let Some(time) = time {
                self.best_of = Some(self.best_of.map_or(time, |cur| cur.min(time)));
            }
        } else if let Some(time) = time {
            self.slowest_parallel = Some(self.slowest_parallel.map_or(time, |cur| cur.max(time)));
        } else if leg_type != LegType::ParallelOptional {
            self.missing = true;
        }
    }

    /// Time of the current true leg, `None` when it cannot count.
    fn group(&self) -> Option<Seconds> {
        if self.missing || (self.best_of_needed && self.best_of.is_none()) {
            return None;
        }
        Some(self.best_of.unwrap_or(0).max(self.slowest_parallel.unwrap_or(0)))
    }

    fn close_group(&mut self) {
        let group = self.group();
        *self = Self {
            base: self.base.zip(group).map(|(base, group)| base + group),
            ..Self::default()
        };
    }

    fn total(&self) -> Option<Seconds> {
        Some(self.base? + self.group()?)
    }
}

/// Leader times and split tables of one class at one data revision.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    legs: Vec<LegLeader>,
    splits: SplitTables,
    computed_at: Snapshot,
}

impl Leaderboard {
    /// Recomputes every leader time from scratch.
    pub fn compute<S: CourseSource>(
        legs: &LegTable,
        results: &[RunnerResult],
        source: &S,
        snapshot: Snapshot,
        config: &EngineConfig,
    ) -> Self {
        let mut by_leg: Vec<Vec<&RunnerResult>> = vec![Vec::new(); legs.len()];
        let mut entrants: HashMap<Entrant, Progress> = HashMap::new();
        for result in results {
            entrants.entry(Entrant::of(result)).or_default();
            match by_leg.get_mut(result.leg) {
                Some(bucket) => bucket.push(result),
                None => trace!(runner = result.runner, leg = result.leg, "result on unknown leg skipped"),
            }
        }

        let mut leaders = vec![LegLeader::default(); legs.len()];
        for (leg, (info, bucket)) in legs.legs().iter().zip(&by_leg).enumerate() {
            if leg > 0 && info.leg_type.opens_true_leg() {
                entrants.values_mut().for_each(Progress::close_group);
            }

            let opener = leg == 0 || info.leg_type.opens_true_leg();
            let leader = &mut leaders[leg];
            let mut pending = false;
            let mut timed: HashMap<Entrant, Seconds> = HashMap::with_capacity(bucket.len());
            for result in bucket {
                pending |= result.status.is_pending();
                let Some(time) = result.ok_time() else {
                    continue;
                };
                leader.leg_time.improve(time);
                if result.input_time > 0 {
                    leader.input.improve(result.input_time);
                }
                timed.insert(Entrant::of(result), time);
            }

            if info.leg_type != LegType::Ignored {
                for (entrant, progress) in entrants.iter_mut() {
                    progress.record(info.leg_type, opener, timed.get(entrant).copied());
                }
                for result in bucket {
                    if !timed.contains_key(&Entrant::of(result)) {
                        continue;
                    }
                    if let Some(total) = entrants.get(&Entrant::of(result)).and_then(Progress::total) {
                        leader.total.improve(total);
                        leader.total_with_input.improve(total + result.input_time);
                    }
                }
            }

            if !pending {
                leader.lock();
            }
            trace!(
                leg,
                runners = bucket.len(),
                best = ?leader.leg_time.live(),
                complete = leader.complete,
                "leg leader times folded"
            );
        }

        let splits = SplitTables::compute(results, source, config.probe);
        debug!(
            legs = leaders.len(),
            results = results.len(),
            snapshot = snapshot.get(),
            "leaderboard recomputed"
        );

        Self {
            legs: leaders,
            splits,
            computed_at: snapshot,
        }
    }

    /// Snapshot the leaderboard was computed at.
    pub fn computed_at(&self) -> Snapshot {
        self.computed_at
    }

    /// True when the leaderboard was computed at exactly `snapshot`.
    pub fn is_valid_for(&self, snapshot: Snapshot) -> bool {
        self.computed_at == snapshot
    }

    /// Leader entry of `leg`.
    pub fn leg(&self, leg: usize) -> Option<&LegLeader> {
        self.legs.get(leg)
    }

    /// True when no runner on `leg` is pending.
    pub fn leg_complete(&self, leg: usize) -> bool {
        self.legs.get(leg).is_some_and(LegLeader::is_complete)
    }

    /// Best running time on `leg`.
    pub fn best_leg_time(&self, leg: usize) -> Option<Seconds> {
        self.legs.get(leg)?.leg_time.live()
    }

    /// Best team total after `leg`, optionally including input times.
    pub fn total_leader_time(&self, leg: usize, include_input: bool) -> Option<Seconds> {
        let entry = self.legs.get(leg)?;
        if include_input {
            entry.total_with_input.live()
        } else {
            entry.total.live()
        }
    }

    /// Best input time among runners on `leg`.
    pub fn input_leader_time(&self, leg: usize) -> Option<Seconds> {
        self.legs.get(leg)?.input.live()
    }

    /// Place of a leg time between two controls.
    pub fn leg_place(&self, from: ControlId, to: ControlId, time: Seconds) -> Option<u32> {
        self.splits.leg_place(from, to, time)
    }

    /// Place of an accumulated time at a course position.
    pub fn accumulated_place(&self, course: CourseId, control_index: usize, time: Seconds) -> Option<u32> {
        self.splits.accumulated_place(course, control_index, time)
    }

    /// Split tables backing the place queries.
    pub fn splits(&self) -> &SplitTables {
        &self.splits
    }

    /// Pursuit start clock time on `leg` for a team whose total before the
    /// leg is `total_before`.
    ///
    /// The team starts as far behind the leg's start data as it trails the
    /// frozen leader total of the previous leg. Starts after the rope time
    /// move to the restart time. `None` unless the leg is a pursuit leg and
    /// the previous leg is complete.
    pub fn pursuit_start(&self, legs: &LegTable, leg: usize, total_before: Seconds) -> Option<Seconds> {
        if leg == 0 || legs.start_type(leg)? != StartType::Pursuit {
            return None;
        }
        let previous = self.legs.get(leg - 1)?;
        if !previous.is_complete() {
            return None;
        }
        let leader = previous.total.computed()?;
        let start = legs.start_data(leg)? + total_before.saturating_sub(leader);
        match (legs.rope_time(leg), legs.restart_time(leg)) {
            (Some(rope), Some(restart)) if start > rope => Some(restart),
            _ => Some(start),
        }
    }
}
