//! Split-time placements and leader-time estimation.
//!
//! Leg times are bucketed by `(from, to)` control pair across every course
//! of the class; accumulated times are bucketed by course position. Places
//! are stored in [`ProbeMap`]s so a report can ask for the place of any
//! recorded time in O(1).

use hashbrown::HashMap;

use crate::{
    config::ProbeMapConfig,
    core::{
        indices::{PairTimes, PositionTimes},
        probe_map::ProbeMap,
    },
    engine::traits::CourseSource,
    result::RunnerResult,
    types::{ControlId, CourseId, LegPair, Seconds},
};

const LEG_KEY_SPREAD: u64 = 8013;
const ACCUMULATED_KEY_SPREAD: u64 = 16013;

/// Probe key of a leg time between two controls.
pub fn leg_place_key(from: ControlId, to: ControlId, time: Seconds) -> u64 {
    u64::from(time) + (u64::from(to) + u64::from(from) * 256) * LEG_KEY_SPREAD
}

/// Probe key of an accumulated time at a course position.
pub fn accumulated_place_key(course: CourseId, control_index: usize, time: Seconds) -> u64 {
    u64::from(time) + (control_index as u64 + u64::from(course) * 128) * ACCUMULATED_KEY_SPREAD
}

/// Representative best time of a set of finisher times.
///
/// Fewer than 5 times: the fastest. 5 to 11: mean of the two fastest.
/// 12 or more: mean of places 2 through `n / 6`, leaving out the winner.
pub fn leader_time(times: &[Seconds]) -> Option<Seconds> {
    let mut sorted = times.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    match n {
        0 => None,
        1..=4 => Some(sorted[0]),
        5..=11 => Some(((u64::from(sorted[0]) + u64::from(sorted[1])) / 2) as Seconds),
        _ => {
            let upto = n / 6;
            let window = &sorted[1..upto];
            let sum: u64 = window.iter().map(|&t| u64::from(t)).sum();
            Some((sum / window.len() as u64) as Seconds)
        }
    }
}

/// Places for ascending `sorted` times. Equal times share a place and the
/// next distinct time is placed at its own 1-based position.
pub fn places(sorted: &[Seconds]) -> Vec<u32> {
    let mut out = Vec::with_capacity(sorted.len());
    for (idx, &time) in sorted.iter().enumerate() {
        let place = match out.last() {
            Some(&prev) if sorted[idx - 1] == time => prev,
            _ => idx as u32 + 1,
        };
        out.push(place);
    }
    out
}

/// Place tables and leader times computed from one result set.
#[derive(Debug, Clone, Default)]
pub struct SplitTables {
    leg_places: ProbeMap<u32>,
    accumulated_places: ProbeMap<u32>,
    pair_leaders: HashMap<LegPair, Seconds>,
    course_leaders: HashMap<CourseId, Seconds>,
}

impl SplitTables {
    /// Builds the tables from every result that has a resolved course.
    pub fn compute<S: CourseSource>(results: &[RunnerResult], source: &S, probe: ProbeMapConfig) -> Self {
        let mut pair_times = PairTimes::new();
        let mut position_times = PositionTimes::new();
        let mut finish_index: HashMap<CourseId, usize> = HashMap::new();

        for result in results.iter().filter(|r| r.status.has_run()) {
            let Some(course) = result.course.and_then(|id| source.course(id)) else {
                continue;
            };
            let n = course.controls.len();
            finish_index.insert(course.id, n);
            let start = result.start_time;

            for (idx, pair) in course.leg_pairs().into_iter().enumerate() {
                let from = result.clock_at(idx, n);
                let to = result.clock_at(idx + 1, n);
                if let (Some(a), Some(b)) = (from, to) {
                    if b >= a {
                        pair_times.entry(pair).or_default().push(b - a);
                    }
                }
                if let (Some(s), Some(b)) = (start, to) {
                    if b >= s {
                        position_times.entry((course.id, idx)).or_default().push(b - s);
                    }
                }
            }
        }

        let leg_count: usize = pair_times.values().map(Vec::len).sum();
        let acc_count: usize = position_times.values().map(Vec::len).sum();
        let mut tables = Self {
            leg_places: ProbeMap::with_config(leg_count, probe),
            accumulated_places: ProbeMap::with_config(acc_count, probe),
            pair_leaders: HashMap::with_capacity(pair_times.len()),
            course_leaders: HashMap::with_capacity(finish_index.len()),
        };

        for (&(from, to), times) in &mut pair_times {
            times.sort_unstable();
            let ranked = places(times);
            for (&time, place) in times.iter().zip(ranked) {
                tables.leg_places.insert(leg_place_key(from, to, time), place);
            }
            if let Some(best) = leader_time(times) {
                tables.pair_leaders.insert((from, to), best);
            }
        }

        for (&(course, idx), times) in &mut position_times {
            times.sort_unstable();
            let ranked = places(times);
            for (&time, place) in times.iter().zip(ranked) {
                tables
                    .accumulated_places
                    .insert(accumulated_place_key(course, idx, time), place);
            }
            if finish_index.get(&course) == Some(&idx) {
                if let Some(best) = leader_time(times) {
                    tables.course_leaders.insert(course, best);
                }
            }
        }

        tables
    }

    /// Place of `time` on the leg from `from` to `to`.
    pub fn leg_place(&self, from: ControlId, to: ControlId, time: Seconds) -> Option<u32> {
        self.leg_places.lookup(leg_place_key(from, to, time))
    }

    /// Place of accumulated `time` at `control_index` of `course`; the
    /// index equal to the control count is the finish.
    pub fn accumulated_place(&self, course: CourseId, control_index: usize, time: Seconds) -> Option<u32> {
        self.accumulated_places
            .lookup(accumulated_place_key(course, control_index, time))
    }

    /// Estimated leader time on the leg from `from` to `to`.
    pub fn pair_leader_time(&self, from: ControlId, to: ControlId) -> Option<Seconds> {
        self.pair_leaders.get(&(from, to)).copied()
    }

    /// Estimated leader time over the whole course.
    pub fn course_leader_time(&self, course: CourseId) -> Option<Seconds> {
        self.course_leaders.get(&course).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_time_uses_load_buckets() {
        assert_eq!(leader_time(&[]), None);
        assert_eq!(leader_time(&[300, 100, 110, 105]), Some(100));
        assert_eq!(leader_time(&[100, 105, 110, 300, 310]), Some(102));
        // 12 times: n / 6 = 2, so only the runner-up counts.
        let twelve: Vec<Seconds> = (0..12).map(|i| 100 + i * 10).collect();
        assert_eq!(leader_time(&twelve), Some(110));
        // 18 times: places 2 and 3.
        let eighteen: Vec<Seconds> = (0..18).map(|i| 100 + i * 10).collect();
        assert_eq!(leader_time(&eighteen), Some(115));
    }

    #[test]
    fn places_share_ties_without_dense_ranking() {
        assert_eq!(places(&[50, 50, 60, 60, 70]), vec![1, 1, 3, 3, 5]);
        assert_eq!(places(&[10]), vec![1]);
        assert!(places(&[]).is_empty());
    }

    #[test]
    fn key_spaces_match_fixed_spreads() {
        assert_eq!(leg_place_key(1, 2, 30), 30 + (2 + 256) * 8013);
        assert_eq!(accumulated_place_key(3, 4, 30), 30 + (4 + 3 * 128) * 16013);
    }
}
