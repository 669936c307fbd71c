use std::collections::hash_map::Entry;

use ahash::AHashMap;

use crate::result::key::Key;
use crate::result::matches::Match;

/// Collects matches, merging the ones that share a key.
#[derive(Debug, Default)]
pub struct Deduper {
    seen: AHashMap<Key, Match>,
}

impl Deduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `m`, or merge it into the match already stored under its key.
    pub fn add(&mut self, m: Match) {
        match self.seen.entry(m.key()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().append_matches(&m)
            }
            Entry::Vacant(entry) => {
                entry.insert(m);
            }
        }
    }

    pub fn seen(&self, m: &Match) -> bool {
        self.seen.contains_key(&m.key())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// All collected matches, sorted by key.
    pub fn results(self) -> Vec<Match> {
        let mut entries: Vec<(Key, Match)> = self.seen.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, m)| m).collect()
    }
}
