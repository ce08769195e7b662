//! Balanced forking generation.
//!
//! Each candidate course is reduced to its course key, the sorted list of
//! control-to-control legs it runs. A combination (one course per forked
//! leg) is identified by the hash of its merged leg multiset. The forking
//! key shared by most combinations is the fairest achievable one; every
//! combination with that key is collected and then ordered so that equal
//! courses end up far apart in the start list.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    config::EngineConfig,
    engine::traits::CourseSource,
    types::{CourseId, LegPair},
};

/// Forking generation failures. No table is touched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForkError {
    /// Degenerate input the generator cannot work with.
    #[error("invalid forking method: {0}")]
    InvalidMethod(&'static str),
    /// A candidate course is not registered.
    #[error("unknown course {0}")]
    UnknownCourse(CourseId),
}

/// Result of [`plan_forking`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkingOutcome {
    /// Number of forks (row length of every forked leg).
    pub forks: usize,
    /// Distinct courses appearing in the generated rows.
    pub courses_used: usize,
    /// New row per leg; `None` leaves the leg untouched.
    pub rows: Vec<Option<Vec<CourseId>>>,
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Order-independent signature of a leg multiset. `pairs` must be sorted.
pub fn forking_key(pairs: &[LegPair]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &(from, to) in pairs {
        for byte in from.to_le_bytes().into_iter().chain(to.to_le_bytes()) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Walks combination indices: all of them when the space is small enough,
/// otherwise a bounded sample taken with a multiplicative stride.
#[derive(Debug, Clone)]
struct CombinationWalk {
    total: u64,
    steps: u64,
    stride: u64,
    next: u64,
}

impl CombinationWalk {
    fn new(total: u64, config: &EngineConfig) -> Self {
        if total <= config.fork_enumeration_limit {
            return Self {
                total,
                steps: total,
                stride: 1,
                next: 0,
            };
        }
        let mut stride = config.fork_sample_stride.max(1);
        while gcd(stride, total) != 1 {
            stride += 1;
        }
        Self {
            total,
            steps: config.fork_enumeration_limit,
            stride,
            next: 0,
        }
    }

    fn is_sampled(&self) -> bool {
        self.steps < self.total
    }
}

impl Iterator for CombinationWalk {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.next >= self.steps {
            return None;
        }
        let idx = (u128::from(self.next) * u128::from(self.stride) % u128::from(self.total)) as u64;
        self.next += 1;
        Some(idx)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn decode(mut index: u64, radices: &[usize], out: &mut [usize]) {
    for (slot, &radix) in out.iter_mut().zip(radices) {
        *slot = (index % radix as u64) as usize;
        index /= radix as u64;
    }
}

/// Key tables for the forked legs of one planning run.
struct KeyTable {
    /// Per forked leg, per candidate, the course key.
    keys: Vec<Vec<Vec<LegPair>>>,
    radices: Vec<usize>,
    merged: Vec<LegPair>,
    choice: Vec<usize>,
}

impl KeyTable {
    fn key_of(&mut self, index: u64) -> u64 {
        decode(index, &self.radices, &mut self.choice);
        self.merged.clear();
        for (leg_keys, &pick) in self.keys.iter().zip(&self.choice) {
            self.merged.extend_from_slice(&leg_keys[pick]);
        }
        self.merged.sort_unstable();
        forking_key(&self.merged)
    }
}

/// Plans a forking for `target` runners (or teams) from per-leg candidate
/// courses. Legs with two or more candidates are forked; legs with exactly
/// one get that course; legs without candidates are left alone.
pub fn plan_forking<S: CourseSource>(
    candidates: &[Vec<CourseId>],
    target: usize,
    source: &S,
    config: &EngineConfig,
) -> Result<ForkingOutcome, ForkError> {
    if target == 0 {
        return Err(ForkError::InvalidMethod("target fork count must be positive"));
    }

    let forked: Vec<usize> = (0..candidates.len())
        .filter(|&leg| candidates[leg].len() >= 2)
        .collect();
    if forked.is_empty() {
        return Err(ForkError::InvalidMethod("no leg offers more than one course"));
    }

    let mut keys = Vec::with_capacity(forked.len());
    for row in candidates {
        for &id in row {
            source.course(id).ok_or(ForkError::UnknownCourse(id))?;
        }
    }
    for &leg in &forked {
        let leg_keys = candidates[leg]
            .iter()
            .filter_map(|&id| source.course(id))
            .map(|course| course.course_key())
            .collect::<Vec<_>>();
        keys.push(leg_keys);
    }

    let radices: Vec<usize> = forked.iter().map(|&leg| candidates[leg].len()).collect();
    let total = radices
        .iter()
        .fold(1u64, |acc, &r| acc.saturating_mul(r as u64));
    let walk = CombinationWalk::new(total, config);
    let mut table = KeyTable {
        keys,
        radices,
        merged: Vec::new(),
        choice: vec![0; forked.len()],
    };

    // Occurrence count and first-seen position per forking key.
    let mut counts: HashMap<u64, (usize, usize)> = HashMap::new();
    for (seen, index) in walk.clone().enumerate() {
        let key = table.key_of(index);
        counts.entry(key).or_insert((0, seen)).0 += 1;
    }
    let Some((&best_key, &(best_count, _))) = counts
        .iter()
        .max_by(|a, b| a.1.0.cmp(&b.1.0).then(b.1.1.cmp(&a.1.1)))
    else {
        return Err(ForkError::InvalidMethod("empty combination space"));
    };
    trace!(
        combinations = total,
        sampled = walk.is_sampled(),
        distinct_keys = counts.len(),
        best_count,
        "forking keys counted"
    );

    let limit = target.saturating_mul(2).saturating_add(100);
    let mut combos = Vec::new();
    for index in walk {
        if table.key_of(index) == best_key {
            combos.push(table.choice.clone());
            if combos.len() >= limit {
                break;
            }
        }
    }

    let mut rng = fastrand::Rng::with_seed(config.fork_seed);
    rng.shuffle(&mut combos);
    let labels: Vec<Vec<u64>> = table
        .keys
        .iter()
        .map(|leg| leg.iter().map(|key| forking_key(key)).collect())
        .collect();
    let spread = spread_combinations(combos, &labels);
    let forks = target.min(spread.len());

    let mut rows: Vec<Option<Vec<CourseId>>> = vec![None; candidates.len()];
    for (pos, &leg) in forked.iter().enumerate() {
        rows[leg] = Some(
            spread[..forks]
                .iter()
                .map(|combo| candidates[leg][combo[pos]])
                .collect(),
        );
    }
    for (leg, row) in candidates.iter().enumerate() {
        if row.len() == 1 {
            rows[leg] = Some(vec![row[0]]);
        }
    }

    let courses_used = rows
        .iter()
        .flatten()
        .flatten()
        .collect::<HashSet<_>>()
        .len();
    debug!(forks, courses_used, total, "forking planned");

    Ok(ForkingOutcome {
        forks,
        courses_used,
        rows,
    })
}

#[derive(Debug, Default)]
struct TrieNode {
    label: u64,
    children: Vec<usize>,
    usage: usize,
    remaining: usize,
    combos: VecDeque<usize>,
}

/// Orders combinations so that consecutive entries differ as much as
/// possible.
///
/// `labels[pos][choice]` identifies what candidate `choice` runs on forked
/// leg `pos`, so candidates with equal control sequences share a branch.
/// Combinations go into a trie whose first level is the forked leg with the
/// most distinct labels. Extraction always descends into the least used
/// branch that still has combinations left; ties go to the branch created
/// first.
pub fn spread_combinations(combos: Vec<Vec<usize>>, labels: &[Vec<u64>]) -> Vec<Vec<usize>> {
    let Some(width) = combos.first().map(Vec::len) else {
        return combos;
    };

    let mut order: Vec<usize> = (0..width).collect();
    let variety: Vec<usize> = order
        .iter()
        .map(|&pos| {
            combos
                .iter()
                .map(|c| labels[pos][c[pos]])
                .collect::<HashSet<_>>()
                .len()
        })
        .collect();
    order.sort_by(|&a, &b| variety[b].cmp(&variety[a]));

    let mut nodes = vec![TrieNode::default()];
    for (idx, combo) in combos.iter().enumerate() {
        let mut node = 0;
        nodes[node].remaining += 1;
        for &pos in &order {
            let label = labels[pos][combo[pos]];
            let existing = nodes[node]
                .children
                .iter()
                .copied()
                .find(|&c| nodes[c].label == label);
            let child = match existing {
                Some(c) => c,
                None => {
                    nodes.push(TrieNode {
                        label,
                        ..TrieNode::default()
                    });
                    let c = nodes.len() - 1;
                    nodes[node].children.push(c);
                    c
                }
            };
            node = child;
            nodes[node].remaining += 1;
        }
        nodes[node].combos.push_back(idx);
    }

    let mut picked = Vec::with_capacity(combos.len());
    for _ in 0..combos.len() {
        let mut node = 0;
        nodes[node].remaining -= 1;
        while !nodes[node].children.is_empty() {
            let mut best: Option<usize> = None;
            for &c in &nodes[node].children {
                if nodes[c].remaining == 0 {
                    continue;
                }
                if best.is_none_or(|b| nodes[c].usage < nodes[b].usage) {
                    best = Some(c);
                }
            }
            let Some(next) = best else {
                break;
            };
            nodes[next].usage += 1;
            nodes[next].remaining -= 1;
            node = next;
        }
        if let Some(idx) = nodes[node].combos.pop_front() {
            picked.push(idx);
        }
    }

    let mut slots: Vec<Option<Vec<usize>>> = combos.into_iter().map(Some).collect();
    picked
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_walk_visits_every_index_once() {
        let config = EngineConfig::default();
        let seen: Vec<u64> = CombinationWalk::new(6, &config).collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn sampled_walk_is_bounded_and_distinct() {
        let config = EngineConfig {
            fork_enumeration_limit: 50,
            ..EngineConfig::default()
        };
        let walk = CombinationWalk::new(1_000, &config);
        assert!(walk.is_sampled());
        let seen: HashSet<u64> = walk.collect();
        assert_eq!(seen.len(), 50);
        assert!(seen.iter().all(|&i| i < 1_000));
    }

    #[test]
    fn decode_is_mixed_radix() {
        let mut out = [0; 3];
        decode(7, &[2, 3, 2], &mut out);
        assert_eq!(out, [1, 0, 1]);
    }

    #[test]
    fn spread_separates_equal_first_choices() {
        let combos = vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]];
        let labels = vec![vec![10, 20], vec![30, 40]];
        let spread = spread_combinations(combos, &labels);
        assert_eq!(spread.len(), 4);
        for pair in spread.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_ne!(spread[0][0], spread[1][0]);
    }

    #[test]
    fn spread_treats_equal_course_keys_as_one_branch() {
        // Candidates 0 and 1 run the same controls, so do 2 and 3.
        let combos = vec![vec![0], vec![1], vec![2], vec![3]];
        let labels = vec![vec![10, 10, 20, 20]];
        let spread = spread_combinations(combos, &labels);

        let runs: Vec<u64> = spread.iter().map(|c| labels[0][c[0]]).collect();
        assert_eq!(runs, vec![10, 20, 10, 20]);
    }

    #[test]
    fn forking_key_is_stable_and_tells_legs_apart() {
        let a = forking_key(&[(0, 31), (31, u32::MAX)]);
        let b = forking_key(&[(0, 32), (32, u32::MAX)]);
        assert_ne!(a, b);
        assert_eq!(a, forking_key(&[(0, 31), (31, u32::MAX)]));
    }
}
