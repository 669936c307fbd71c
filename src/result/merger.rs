//! Exactly-once merging of match streams from several sources.
//!
//! Every source (a shard, a replica, a sub-query) reports matches through
//! [`Merger::add_matches`]. A match is handed back to the caller the moment
//! the last source confirms it, and never again. Matches that were not
//! confirmed by every source can be collected with
//! [`Merger::unsent_tracked`] once all sources are done, best-confirmed first.

use ahash::AHashMap;
use bit_vec::BitVec;
use parking_lot::Mutex;

use crate::result::key::Key;
use crate::result::matches::Match;

#[derive(Debug)]
struct Entry {
    m: Option<Match>,
    seen: BitVec,
    sent: bool,
}

impl Entry {
    fn seen_count(&self) -> usize {
        self.seen.iter().filter(|&b| b).count()
    }
}

/// Thread-safe merger for matches reported by a fixed number of sources.
#[derive(Debug)]
pub struct Merger {
    num_sources: usize,
    entries: Mutex<AHashMap<Key, Entry>>,
}

impl Merger {
    pub fn new(num_sources: usize) -> Self {
        Merger {
            num_sources,
            entries: Mutex::new(AHashMap::new()),
        }
    }

    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    /// Record `matches` as seen by `source` and return those that have now
    /// been seen by every source. Matches already returned are ignored.
    pub fn add_matches(&self, matches: Vec<Match>, source: usize) -> Vec<Match> {
        if source >= self.num_sources {
            log::warn!(
                "ignoring matches from source {source}, merger tracks {} sources",
                self.num_sources
            );
            return Vec::new();
        }

        let mut complete = Vec::new();
        let mut entries = self.entries.lock();
        for m in matches {
            let entry = entries.entry(m.key()).or_insert_with(|| Entry {
                m: None,
                seen: BitVec::from_elem(self.num_sources, false),
                sent: false,
            });
            if entry.sent {
                continue;
            }

            match entry.m.as_mut() {
                Some(stored) => stored.append_matches(&m),
                None => entry.m = Some(m),
            }
            entry.seen.set(source, true);

            if entry.seen.all() {
                entry.sent = true;
                complete.extend(entry.m.take());
            }
        }

        if !complete.is_empty() {
            log::debug!(
                "source {source} completed {} matches across {} sources",
                complete.len(),
                self.num_sources
            );
        }
        complete
    }

    /// Drain every match that was not seen by all sources, ordered by the
    /// number of sources that saw it (most first), then by key.
    pub fn unsent_tracked(&self) -> Vec<Match> {
        let mut entries = self.entries.lock();
        let mut unsent: Vec<(usize, Key, Match)> = entries
            .iter_mut()
            .filter(|(_, entry)| !entry.sent)
            .filter_map(|(key, entry)| {
                entry.sent = true;
                let m = entry.m.take()?;
                Some((entry.seen_count(), key.clone(), m))
            })
            .collect();
        unsent.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        log::debug!("collected {} partially confirmed matches", unsent.len());
        unsent.into_iter().map(|(_, _, m)| m).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::repo::RepoMatch;

    fn repo(name: &str) -> Match {
        Match::Repo(RepoMatch {
            name: name.into(),
            ..Default::default()
        })
    }

    fn names(matches: &[Match]) -> Vec<String> {
        matches.iter().map(|m| m.key().repo).collect()
    }

    #[test]
    fn test_single_source_passes_through() {
        let merger = Merger::new(1);
        let out = merger.add_matches(vec![repo("a"), repo("b")], 0);
        assert_eq!(names(&out), vec!["a", "b"]);
        assert!(merger.add_matches(vec![repo("a")], 0).is_empty());
        assert!(merger.unsent_tracked().is_empty());
    }

    #[test]
    fn test_emits_once_all_sources_agree() {
        let merger = Merger::new(2);
        assert!(merger.add_matches(vec![repo("a")], 0).is_empty());
        assert!(merger.add_matches(vec![repo("a")], 0).is_empty());
        assert_eq!(names(&merger.add_matches(vec![repo("a")], 1)), vec!["a"]);
        assert!(merger.add_matches(vec![repo("a")], 1).is_empty());
    }

    #[test]
    fn test_unsent_ordering() {
        let merger = Merger::new(3);
        merger.add_matches(vec![repo("c"), repo("b")], 0);
        merger.add_matches(vec![repo("b"), repo("a")], 1);
        merger.add_matches(vec![repo("d")], 2);

        let unsent = merger.unsent_tracked();
        assert_eq!(names(&unsent), vec!["b", "a", "c", "d"]);
        assert!(merger.unsent_tracked().is_empty());

        // Entries drained as unsent are never emitted later.
        assert!(merger.add_matches(vec![repo("b")], 2).is_empty());
    }

    #[test]
    fn test_out_of_range_source_ignored() {
        let merger = Merger::new(2);
        assert!(merger.add_matches(vec![repo("a")], 7).is_empty());
        assert!(merger.unsent_tracked().is_empty());
    }
}
