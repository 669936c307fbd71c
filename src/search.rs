//! Running a match tree over the commits of a repository.
//!
//! [`CommitSearcher`] evaluates one query against a list of commits and turns
//! every satisfied evaluation into a [`CommitMatch`]. With
//! [`SearchConfig::include_diff`] the match carries a bounded diff preview
//! built from the highlights that survived evaluation, otherwise a message
//! preview.
//!
//! A commit that fails to evaluate is neither a match nor silently skipped:
//! it is reported in [`SearchResults::errors`].

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::commit::{CachedCommit, CommitData, DiffSource, LazyCommit};
use crate::config::SearchConfig;
use crate::diff::{format_diff, split_diff};
use crate::error::{Result, SiftError};
use crate::matchtree::{MatchTree, MatchedCommit, Scratch, to_match_tree};
use crate::query::Node;
use crate::result::{CommitMatch, MatchedString, Signature};

/// A commit whose evaluation failed.
#[derive(Debug)]
pub struct CommitError {
    pub oid: String,
    pub error: SiftError,
}

/// The outcome of a commit search.
#[derive(Debug, Default)]
pub struct SearchResults {
    /// Matching commits, in input order.
    pub matches: Vec<CommitMatch>,
    pub errors: Vec<CommitError>,
    /// Set when the result limit stopped the search.
    pub limit_hit: bool,
}

/// Evaluates a query against commits of one repository.
#[derive(Debug)]
pub struct CommitSearcher {
    repo: String,
    tree: MatchTree,
    config: SearchConfig,
}

impl CommitSearcher {
    pub fn new(repo: impl Into<String>, tree: MatchTree, config: SearchConfig) -> Self {
        CommitSearcher {
            repo: repo.into(),
            tree,
            config,
        }
    }

    /// Reduce `node` and build its match tree.
    pub fn from_node(repo: impl Into<String>, node: Node, config: SearchConfig) -> Result<Self> {
        let tree = to_match_tree(&node.reduce())?;
        Ok(Self::new(repo, tree, config))
    }

    pub fn tree(&self) -> &MatchTree {
        &self.tree
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search `commits` in order, stopping once the limit is reached.
    pub fn search<D: DiffSource>(&self, commits: &[CachedCommit<D>]) -> SearchResults {
        let mut results = SearchResults::default();
        let mut scratch = Scratch::new();
        for commit in commits {
            if self.limit_reached(&results) {
                results.limit_hit = true;
                break;
            }
            let outcome = self.search_commit(commit, &mut scratch);
            self.collect(&mut results, commit, outcome);
        }
        log::debug!(
            "searched {} commits in {}: {} matches, {} errors",
            commits.len(),
            self.repo,
            results.matches.len(),
            results.errors.len()
        );
        results
    }

    /// Search `commits` on the rayon thread pool, one scratch buffer per
    /// worker. Every commit is evaluated; the limit applies to the ordered
    /// results.
    pub fn search_parallel<D>(&self, commits: &[CachedCommit<D>]) -> SearchResults
    where
        D: DiffSource + Send + Sync,
    {
        let outcomes: Vec<Result<Option<CommitMatch>>> = commits
            .par_iter()
            .map_init(Scratch::new, |scratch, commit| self.search_commit(commit, scratch))
            .collect();

        let mut results = SearchResults::default();
        for (commit, outcome) in commits.iter().zip(outcomes) {
            if self.limit_reached(&results) {
                results.limit_hit = true;
                break;
            }
            self.collect(&mut results, commit, outcome);
        }
        log::debug!(
            "searched {} commits in {} in parallel: {} matches, {} errors",
            commits.len(),
            self.repo,
            results.matches.len(),
            results.errors.len()
        );
        results
    }

    fn limit_reached(&self, results: &SearchResults) -> bool {
        self.config
            .limit
            .is_some_and(|limit| results.matches.len() >= limit)
    }

    fn collect<D: DiffSource>(
        &self,
        results: &mut SearchResults,
        commit: &CachedCommit<D>,
        outcome: Result<Option<CommitMatch>>,
    ) {
        match outcome {
            Ok(Some(m)) => results.matches.push(m),
            Ok(None) => {}
            Err(error) => {
                log::warn!("failed to search commit {} in {}: {error}", commit.hash(), self.repo);
                results.errors.push(CommitError {
                    oid: commit.hash().to_string(),
                    error,
                });
            }
        }
    }

    /// Evaluate one commit and build its match if it satisfies the query.
    pub fn search_commit<D: DiffSource>(
        &self,
        commit: &CachedCommit<D>,
        scratch: &mut Scratch,
    ) -> Result<Option<CommitMatch>> {
        let (result, highlights) = self.tree.evaluate(commit, scratch)?;
        if !result.satisfies() {
            return Ok(None);
        }
        log::trace!("commit {} matched", commit.hash());
        self.commit_match(commit, highlights).map(Some)
    }

    fn commit_match<D: DiffSource>(
        &self,
        commit: &CachedCommit<D>,
        highlights: MatchedCommit,
    ) -> Result<CommitMatch> {
        let data = commit.data();
        let message = String::from_utf8_lossy(&data.message).into_owned();

        let diff_preview = if self.config.include_diff {
            Some(self.diff_preview(commit, &highlights)?)
        } else {
            None
        };
        let message_preview = if diff_preview.is_none() || !highlights.message.is_empty() {
            Some(MatchedString::new(message.clone(), highlights.message))
        } else {
            None
        };

        Ok(CommitMatch {
            repo: self.repo.clone(),
            oid: data.hash.clone(),
            author: author(data)?,
            committer: committer(data),
            message,
            parents: data.parent_hashes.clone(),
            refs: data.refs.clone(),
            source_refs: data.source_refs.clone(),
            modified_files: data.modified_files.clone(),
            message_preview,
            diff_preview,
        })
    }

    fn diff_preview<C: LazyCommit>(
        &self,
        commit: &C,
        highlights: &MatchedCommit,
    ) -> Result<MatchedString> {
        let diff = commit.diff()?;
        // Commits matched on metadata alone show their whole (bounded) diff.
        let file_highlights: Option<&BTreeMap<_, _>> =
            (!highlights.diff.is_empty()).then_some(&highlights.diff);
        let (files, file_highlights) = split_diff(diff, file_highlights, &self.config.preview);
        let (content, ranges) = format_diff(&files, &file_highlights);
        Ok(MatchedString::new(content, ranges))
    }
}

fn signature(name: &[u8], email: &[u8]) -> (String, String) {
    (
        String::from_utf8_lossy(name).into_owned(),
        String::from_utf8_lossy(email).into_owned(),
    )
}

fn author(data: &CommitData) -> Result<Signature> {
    let (name, email) = signature(&data.author_name, &data.author_email);
    Ok(Signature {
        name,
        email,
        date: data.author_date()?,
    })
}

fn committer(data: &CommitData) -> Option<Signature> {
    let date = data.committer_date().ok()?;
    let (name, email) = signature(&data.committer_name, &data.committer_email);
    Some(Signature { name, email, date })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct StaticDiff(&'static [u8]);

    impl DiffSource for StaticDiff {
        fn raw_diff(&self, _hash: &str) -> Result<Vec<u8>> {
            Ok(self.0.to_vec())
        }
    }

    const DIFF: &[u8] = b"diff --git lib.rs lib.rs
--- lib.rs
+++ lib.rs
@@ -1,2 +1,2 @@
 mod a;
-mod b;
+mod c;
";

    fn commit(hash: &str, author: &str, message: &str) -> CachedCommit<StaticDiff> {
        let data = CommitData {
            hash: hash.into(),
            author_name: author.as_bytes().to_vec(),
            author_email: b"dev@example.com".to_vec(),
            author_date: b"1600000000".to_vec(),
            committer_date: b"1600000100".to_vec(),
            message: message.as_bytes().to_vec(),
            modified_files: vec!["lib.rs".into()],
            ..Default::default()
        };
        CachedCommit::new(data, Arc::new(StaticDiff(DIFF)))
    }

    fn searcher(json: &str, config: SearchConfig) -> CommitSearcher {
        CommitSearcher::from_node("repo", Node::from_json(json).unwrap(), config).unwrap()
    }

    #[test]
    fn test_message_preview() {
        let commits = vec![commit("a", "Ann", "fix bug"), commit("b", "Ben", "add feature")];
        let s = searcher(
            r#"{"type": "messageMatches", "expr": "bug"}"#,
            SearchConfig::default(),
        );
        let results = s.search(&commits);

        assert_eq!(results.matches.len(), 1);
        let m = &results.matches[0];
        assert_eq!(m.oid, "a");
        assert_eq!(m.author.name, "Ann");
        assert!(m.diff_preview.is_none());
        let preview = m.message_preview.as_ref().unwrap();
        assert_eq!(preview.matched_ranges[0].byte_range(), 4..7);
        // Nothing needed the diff.
        assert!(!commits[0].diff_loaded());
    }

    #[test]
    fn test_diff_preview() {
        let commits = vec![commit("a", "Ann", "rename module")];
        let config = SearchConfig::builder().include_diff(true).build();
        let s = searcher(r#"{"type": "diffMatches", "expr": "mod c"}"#, config);

        let results = s.search(&commits);
        let preview = results.matches[0].diff_preview.as_ref().unwrap();
        assert_eq!(
            preview.content,
            "lib.rs lib.rs\n@@ -2,1 +2,1 @@\n-mod b;\n+mod c;\n"
        );
        let range = preview.matched_ranges[0];
        assert_eq!(&preview.content[range.byte_range()], "mod c");
        assert_eq!(range.start.line, 3);
        assert!(results.matches[0].message_preview.is_none());
    }

    #[test]
    fn test_limit() {
        let commits: Vec<_> = (0..5).map(|i| commit(&i.to_string(), "Ann", "msg")).collect();
        let config = SearchConfig::builder().limit(2).build();
        let s = searcher(r#"{"type": "authorMatches", "expr": "ann", "ignoreCase": true}"#, config);

        let results = s.search(&commits);
        assert_eq!(results.matches.len(), 2);
        assert!(results.limit_hit);

        let parallel = s.search_parallel(&commits);
        let oids: Vec<_> = parallel.matches.iter().map(|m| m.oid.as_str()).collect();
        assert_eq!(oids, vec!["0", "1"]);
        assert!(parallel.limit_hit);
    }

    #[test]
    fn test_errors_are_reported() {
        let data = CommitData {
            committer_date: b"soon".to_vec(),
            ..commit("bad", "Ann", "msg").data().clone()
        };
        let bad = CachedCommit::new(data, Arc::new(StaticDiff(DIFF)));
        let commits = vec![bad, commit("good", "Ann", "msg")];
        let s = searcher(
            r#"{"type": "commitAfter", "time": "2000-01-01T00:00:00Z"}"#,
            SearchConfig::default(),
        );

        let results = s.search(&commits);
        assert_eq!(results.errors.len(), 1);
        assert_eq!(results.errors[0].oid, "bad");
        assert_eq!(results.matches.len(), 1);
        assert_eq!(results.matches[0].oid, "good");
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let commits: Vec<_> = (0..20)
            .map(|i| commit(&i.to_string(), if i % 3 == 0 { "Ann" } else { "Ben" }, "msg"))
            .collect();
        let s = searcher(
            r#"{"type": "operator", "kind": "and", "operands": [
                {"type": "authorMatches", "expr": "BEN", "ignoreCase": true},
                {"type": "diffMatches", "expr": "mod"}
            ]}"#,
            SearchConfig::builder().include_diff(true).build(),
        );
        assert_eq!(s.search(&commits).matches, s.search_parallel(&commits).matches);
    }
}
