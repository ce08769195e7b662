//! Fixed-capacity open-addressing map with chained overflow levels.
//!
//! Every key is tried in three slots of a level: `key mod cap`,
//! `(key + h1) mod cap` and `(key + h2) mod cap`. When all three hold other
//! keys the entry moves down to the next level, a table roughly half the
//! size of its parent. Levels live in one owned vector, index 0 being the
//! root. Once the configured chain depth is exhausted the root rebuilds
//! itself into a single larger level that absorbs every chained entry.

use tracing::debug;

use crate::config::ProbeMapConfig;

/// Key value marking an empty slot; it cannot be stored.
pub const NO_KEY: u64 = u64::MAX;

const SIZE_DIVISORS: [usize; 5] = [3, 5, 7, 11, 13];

/// Smallest odd size `>= max(n, 5)` not divisible by 3, 5, 7, 11 or 13.
pub fn optimal_size(n: usize) -> usize {
    let mut size = n.max(5) | 1;
    while SIZE_DIVISORS.iter().any(|d| size % d == 0) {
        size += 2;
    }
    size
}

#[derive(Debug, Clone)]
struct Level<V> {
    slots: Vec<(u64, V)>,
    h1: u64,
    h2: u64,
}

impl<V: Copy + Default> Level<V> {
    fn with_capacity(capacity: usize) -> Self {
        let cap = optimal_size(capacity);
        Self {
            slots: vec![(NO_KEY, V::default()); cap],
            h1: (cap / 2 + 3) as u64,
            h2: (cap / 3 + 2) as u64,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn probes(&self, key: u64) -> [usize; 3] {
        let cap = self.slots.len() as u64;
        let base = key % cap;
        [
            base as usize,
            ((base + self.h1) % cap) as usize,
            ((base + self.h2) % cap) as usize,
        ]
    }

    fn find(&self, key: u64) -> Option<usize> {
        self.probes(key)
            .into_iter()
            .find(|&idx| self.slots[idx].0 == key)
    }

    fn free_slot(&self, key: u64) -> Option<usize> {
        self.probes(key)
            .into_iter()
            .find(|&idx| self.slots[idx].0 == NO_KEY)
    }
}

/// Integer-keyed map with expected O(1) insert and lookup.
#[derive(Debug, Clone)]
pub struct ProbeMap<V> {
    levels: Vec<Level<V>>,
    len: usize,
    config: ProbeMapConfig,
}

impl<V: Copy + Default> Default for ProbeMap<V> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<V: Copy + Default> ProbeMap<V> {
    /// Map sized for about `capacity` entries with default growth settings.
    pub fn new(capacity: usize) -> Self {
        Self::with_config(capacity, ProbeMapConfig::default())
    }

    /// Map sized for about `capacity` entries.
    pub fn with_config(capacity: usize, config: ProbeMapConfig) -> Self {
        Self {
            levels: vec![Level::with_capacity(capacity)],
            len: 0,
            config,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slot count of the root level.
    pub fn capacity(&self) -> usize {
        self.levels[0].capacity()
    }

    /// Number of chained levels currently below the root.
    pub fn chain_depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Inserts or replaces `key`, returning the previous value.
    ///
    /// `key` must not be [`NO_KEY`].
    pub fn insert(&mut self, key: u64, value: V) -> Option<V> {
        debug_assert_ne!(key, NO_KEY, "NO_KEY cannot be stored");

        for level in &mut self.levels {
            if let Some(idx) = level.find(key) {
                return Some(std::mem::replace(&mut level.slots[idx].1, value));
            }
        }

        while !self.place(key, value) {
            let grown = (self.len as f64 * self.config.growth_factor).ceil() as usize;
            self.rehash(grown.max(self.capacity() + 1));
        }
        self.len += 1;
        None
    }

    /// Value stored for `key`.
    pub fn lookup(&self, key: u64) -> Option<V> {
        self.levels
            .iter()
            .find_map(|level| level.find(key).map(|idx| level.slots[idx].1))
    }

    /// True when `key` is present.
    pub fn contains_key(&self, key: u64) -> bool {
        self.lookup(key).is_some()
    }

    /// Removes `key`, leaving its slot empty. Chains are not compacted.
    pub fn remove(&mut self, key: u64) -> Option<V> {
        for level in &mut self.levels {
            if let Some(idx) = level.find(key) {
                let (_, value) = std::mem::replace(&mut level.slots[idx], (NO_KEY, V::default()));
                self.len -= 1;
                return Some(value);
            }
        }
        None
    }

    /// Drops every entry and chained level, keeping the root capacity.
    pub fn clear(&mut self) {
        let cap = self.capacity();
        self.levels = vec![Level::with_capacity(cap)];
        self.len = 0;
    }

    /// Rebuilds the map into a single level sized for its current contents.
    pub fn shrink_to_fit(&mut self) {
        self.rehash(self.len);
    }

    /// Live entries, root level first.
    pub fn iter(&self) -> impl Iterator<Item = (u64, V)> + '_ {
        self.levels
            .iter()
            .flat_map(|level| level.slots.iter().copied())
            .filter(|(key, _)| *key != NO_KEY)
    }

    fn place(&mut self, key: u64, value: V) -> bool {
        for depth in 0..=self.config.max_chain_depth {
            if depth == self.levels.len() {
                let child = self.levels[depth - 1].capacity() / 2;
                self.levels.push(Level::with_capacity(child));
            }
            let level = &mut self.levels[depth];
            if let Some(idx) = level.free_slot(key) {
                level.slots[idx] = (key, value);
                return true;
            }
        }
        false
    }

    fn rehash(&mut self, target: usize) {
        let root = self.capacity();
        let mut fresh = Self::with_config(target, self.config);
        for (key, value) in self.iter() {
            fresh.insert(key, value);
        }
        debug!(
            entries = self.len,
            old_root = root,
            new_root = fresh.capacity(),
            old_depth = self.chain_depth(),
            "probe map root rehash"
        );
        self.levels = fresh.levels;
    }
}
