//! Course variants offered on each leg and course selection.

use serde::{Deserialize, Serialize};

use crate::{
    course::Course,
    engine::traits::CourseSource,
    types::CourseId,
};

use super::ClassError;

/// Per-leg ordered course lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForkTable {
    rows: Vec<Vec<CourseId>>,
    pool_mode: bool,
    #[serde(skip)]
    pool_changed: bool,
    #[serde(skip)]
    changed: bool,
}

impl PartialEq for ForkTable {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.pool_mode == other.pool_mode
    }
}

impl Eq for ForkTable {}

impl ForkTable {
    /// Table with `legs` empty rows.
    pub fn new(legs: usize) -> Self {
        Self {
            rows: vec![Vec::new(); legs],
            ..Self::default()
        }
    }

    /// Number of rows, equal to the class leg count.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in leg order.
    pub fn rows(&self) -> &[Vec<CourseId>] {
        &self.rows
    }

    /// Courses offered on `leg`; empty when none or out of range.
    pub fn row(&self, leg: usize) -> &[CourseId] {
        self.rows.get(leg).map_or(&[], Vec::as_slice)
    }

    /// Longest row length, i.e. the number of distinct fork indices.
    pub fn max_forks(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Grows with empty rows or truncates to `legs` rows.
    pub fn set_num_legs(&mut self, legs: usize) {
        if legs != self.rows.len() {
            self.rows.resize_with(legs, Vec::new);
            self.mark_changed();
        }
    }

    /// Inserts `course` on `leg` at `position`, or appends when `None` or
    /// past the end.
    pub fn add_course(&mut self, leg: usize, course: CourseId, position: Option<usize>) -> Result<(), ClassError> {
        let row = self.row_mut(leg)?;
        let at = position.map_or(row.len(), |p| p.min(row.len()));
        row.insert(at, course);
        self.mark_changed();
        Ok(())
    }

    /// Removes `course` from `leg` at `position`; the slot must hold it.
    pub fn remove_course(&mut self, leg: usize, course: CourseId, position: usize) -> Result<(), ClassError> {
        let row = self.row_mut(leg)?;
        if row.get(position) != Some(&course) {
            return Err(ClassError::CourseNotOnLeg { leg, course, position });
        }
        row.remove(position);
        self.mark_changed();
        Ok(())
    }

    /// Replaces the whole row of `leg`.
    pub fn set_row(&mut self, leg: usize, courses: Vec<CourseId>) -> Result<(), ClassError> {
        let row = self.row_mut(leg)?;
        if *row != courses {
            *row = courses;
            self.mark_changed();
        }
        Ok(())
    }

    /// Fixed-mode selection for a 1-based fork index (0 is read as 1).
    pub fn get_course(&self, leg: usize, fork_index: usize) -> Option<CourseId> {
        let row = self.row(leg);
        if row.is_empty() {
            return None;
        }
        Some(row[(fork_index.max(1) - 1) % row.len()])
    }

    /// Switches between pool and fixed selection.
    pub fn set_pool_mode(&mut self, pool: bool) {
        if self.pool_mode != pool {
            self.pool_mode = pool;
            self.mark_changed();
        }
    }

    /// True in pool mode.
    pub fn is_pool_mode(&self) -> bool {
        self.pool_mode
    }

    /// Returns and clears the flag telling that assigned runners should be
    /// revalidated against the pool.
    pub fn take_pool_changed(&mut self) -> bool {
        std::mem::take(&mut self.pool_changed)
    }

    /// True when any row changed since the last [`ForkTable::take_changed`].
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Returns and clears the changed flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Picks the course on `leg` that best explains the punched `pattern`.
    ///
    /// The course with the smallest non-negative distance wins, the first
    /// one on ties. When no candidate covers the pattern, every candidate is
    /// replaced by its shortened variant and the search repeats, at most
    /// `shorten_iterations` times.
    pub fn select_from_pool<S: CourseSource>(
        &self,
        leg: usize,
        pattern: &[u32],
        source: &S,
        shorten_iterations: usize,
    ) -> Option<CourseId> {
        let mut candidates: Vec<&Course> = self
            .row(leg)
            .iter()
            .filter_map(|&id| source.course(id))
            .collect();

        for _ in 0..=shorten_iterations {
            let best = candidates
                .iter()
                .map(|course| (course.id, course_distance(course, pattern, source)))
                .filter(|&(_, dist)| dist >= 0)
                .fold(None, |best: Option<(CourseId, i32)>, (id, dist)| match best {
                    Some((_, best_dist)) if best_dist <= dist => best,
                    _ => Some((id, dist)),
                });
            if let Some((id, _)) = best {
                return Some(id);
            }

            let mut shortened_any = false;
            for course in &mut candidates {
                if let Some(short) = course.shortened.and_then(|id| source.course(id)) {
                    *course = short;
                    shortened_any = true;
                }
            }
            if !shortened_any {
                break;
            }
        }
        None
    }

    /// Course for a runner on `leg`: pool selection by punch pattern in pool
    /// mode, fixed selection by fork index otherwise. Falls back to
    /// `default` when nothing matches.
    pub fn select_course<S: CourseSource>(
        &self,
        leg: usize,
        fork_index: usize,
        pattern: &[u32],
        source: &S,
        default: Option<CourseId>,
        shorten_iterations: usize,
    ) -> Option<CourseId> {
        let picked = if self.pool_mode {
            self.select_from_pool(leg, pattern, source, shorten_iterations)
        } else {
            self.get_course(leg, fork_index)
        };
        picked.or(default)
    }

    fn mark_changed(&mut self) {
        self.changed = true;
        self.pool_changed = true;
    }

    fn row_mut(&mut self, leg: usize) -> Result<&mut Vec<CourseId>, ClassError> {
        let legs = self.rows.len();
        self.rows
            .get_mut(leg)
            .ok_or(ClassError::LegOutOfRange { leg, legs })
    }
}

/// Signed distance between a course and a punched code sequence.
///
/// Course controls are matched in order. When some are missing the result
/// is minus the number missing; otherwise it is the number of surplus
/// punches, so an exact match is 0.
pub fn course_distance<S: CourseSource>(course: &Course, pattern: &[u32], source: &S) -> i32 {
    let mut pos = 0;
    let mut matched = 0usize;
    for &ctrl in &course.controls {
        let Some(control) = source.control(ctrl) else {
            continue;
        };
        if let Some(offset) = pattern[pos..].iter().position(|&code| control.accepts(code)) {
            pos += offset + 1;
            matched += 1;
        }
    }
    let missing = course.controls.len() - matched;
    if missing > 0 {
        -(missing as i32)
    } else {
        (pattern.len() - matched) as i32
    }
}
