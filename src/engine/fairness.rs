//! Forking fairness report.
//!
//! A forking is fair when every course combination runs the same legs the
//! same number of times. Each distinct combination is compared against the
//! first one.

use std::collections::BTreeSet;

use hashbrown::HashMap;

use crate::{
    core::indices::PairCounts,
    engine::traits::CourseSource,
    result::RunnerResult,
    types::{CourseId, LegPair, TeamId},
};

/// Comparison of one combination against the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationReport {
    /// Courses of the combination.
    pub courses: Vec<CourseId>,
    /// Legs whose occurrence count differs from the first combination.
    pub unfair_pairs: BTreeSet<LegPair>,
}

/// Result of [`check_forking`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForkingReport {
    /// One entry per distinct combination, first-seen order.
    pub combinations: Vec<CombinationReport>,
}

impl ForkingReport {
    /// True when no combination deviates from the first.
    pub fn is_fair(&self) -> bool {
        self.combinations.iter().all(|c| c.unfair_pairs.is_empty())
    }

    /// Every leg that is unfair in at least one combination.
    pub fn unfair_pairs(&self) -> BTreeSet<LegPair> {
        self.combinations
            .iter()
            .flat_map(|c| c.unfair_pairs.iter().copied())
            .collect()
    }
}

fn pair_counts<S: CourseSource>(courses: &[CourseId], source: &S) -> PairCounts {
    let mut counts = PairCounts::new();
    for course in courses.iter().filter_map(|&id| source.course(id)) {
        for pair in course.leg_pairs() {
            *counts.entry(pair).or_insert(0) += 1;
        }
    }
    counts
}

/// Reports, per distinct combination, the legs run a different number of
/// times than in the first combination. Unknown courses are skipped.
pub fn check_forking<S: CourseSource>(combinations: &[Vec<CourseId>], source: &S) -> ForkingReport {
    let mut distinct: Vec<&Vec<CourseId>> = Vec::new();
    for combo in combinations {
        if !distinct.contains(&combo) {
            distinct.push(combo);
        }
    }

    let Some(first) = distinct.first() else {
        return ForkingReport::default();
    };
    let reference = pair_counts(first, source);

    let combinations = distinct
        .iter()
        .map(|combo| {
            let counts = pair_counts(combo, source);
            let unfair_pairs = reference
                .keys()
                .chain(counts.keys())
                .filter(|pair| reference.get(*pair) != counts.get(*pair))
                .copied()
                .collect();
            CombinationReport {
                courses: combo.to_vec(),
                unfair_pairs,
            }
        })
        .collect();

    ForkingReport { combinations }
}

/// Course combinations actually run, one per team in first-seen order,
/// courses listed by leg. Results without a team or course are ignored.
pub fn combinations_run(results: &[RunnerResult]) -> Vec<Vec<CourseId>> {
    let mut order: Vec<TeamId> = Vec::new();
    let mut by_team: HashMap<TeamId, Vec<(usize, CourseId)>> = HashMap::new();
    for result in results {
        let (Some(team), Some(course)) = (result.team, result.course) else {
            continue;
        };
        let legs = by_team.entry(team).or_insert_with(|| {
            order.push(team);
            Vec::new()
        });
        legs.push((result.leg, course));
    }

    order
        .into_iter()
        .filter_map(|team| by_team.remove(&team))
        .map(|mut legs| {
            legs.sort_by_key(|&(leg, _)| leg);
            legs.into_iter().map(|(_, course)| course).collect()
        })
        .collect()
}
