//! Inbound per-runner result records.

use serde::{Deserialize, Serialize};

use crate::types::{CourseId, RunnerId, RunnerStatus, Seconds, TeamId};

/// One runner's result on one leg of a class, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerResult {
    pub runner: RunnerId,
    pub team: Option<TeamId>,
    pub leg: usize,
    pub course: Option<CourseId>,
    pub start_time: Option<Seconds>,
    pub finish_time: Option<Seconds>,
    /// One clock time per course control, in course order.
    pub punches: Vec<Option<Seconds>>,
    pub status: RunnerStatus,
    /// Time carried in from an earlier stage; 0 means none.
    pub input_time: Seconds,
}

impl RunnerResult {
    /// A finished runner without punches, handy for leg-only computations.
    pub fn finished(runner: RunnerId, leg: usize, start: Seconds, finish: Seconds) -> Self {
        Self {
            runner,
            team: None,
            leg,
            course: None,
            start_time: Some(start),
            finish_time: Some(finish),
            punches: Vec::new(),
            status: RunnerStatus::Ok,
            input_time: 0,
        }
    }

    /// Running time on this leg, when both start and finish are known.
    pub fn running_time(&self) -> Option<Seconds> {
        match (self.start_time, self.finish_time) {
            (Some(start), Some(finish)) if finish >= start => Some(finish - start),
            _ => None,
        }
    }

    /// Running time only for a valid result.
    pub fn ok_time(&self) -> Option<Seconds> {
        if self.status == RunnerStatus::Ok {
            self.running_time()
        } else {
            None
        }
    }

    /// Clock time at course position `idx` on a course with `controls`
    /// controls: 0 is the start, `1..=controls` the punches and
    /// `controls + 1` the finish.
    pub fn clock_at(&self, idx: usize, controls: usize) -> Option<Seconds> {
        if idx == 0 {
            self.start_time
        } else if idx <= controls {
            self.punches.get(idx - 1).copied().flatten()
        } else if idx == controls + 1 {
            self.finish_time
        } else {
            None
        }
    }
}
