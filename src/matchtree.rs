//! Evaluation of commit queries.
//!
//! A [`MatchTree`] is built once per query with [`to_match_tree`] and can be
//! evaluated against any number of commits, from any number of threads. Each
//! evaluation yields a [`CommitFilterResult`], deciding whether the commit
//! matched, and a [`MatchedCommit`] highlight tree for display.
//!
//! Content predicates select *file diffs* rather than whole commits, and
//! `AND` intersects those selections by file index. Path predicates decide
//! the commit as a whole and only record which file names matched. A query
//! such as `file:a content:b` therefore reports a commit where one file diff
//! touches a path matching `a` and a different file diff contains `b`, even
//! though no single file diff satisfies both. Only the content highlights of
//! such a commit survive.
//!
//! # Module Structure
//!
//! - `build`: query node → match tree
//! - `casefold`: case-insensitive regexes over a lowered scratch buffer
//! - `filter`: the tri-state result algebra
//! - `highlight`: highlight trees

pub mod build;
pub mod casefold;
pub mod filter;
pub mod highlight;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::commit::LazyCommit;
use crate::diff::{DEV_NULL, LineKind, line_content};
use crate::error::Result;
use crate::result::range::{Range, matches_to_ranges};

pub use build::to_match_tree;
pub use casefold::{CaseFoldRegex, Scratch};
pub use filter::{CommitFilterResult, MatchedFileDiffs};
pub use highlight::{MatchedCommit, MatchedFileDiff, MatchedHunk};

/// An executable commit predicate.
#[derive(Debug, Clone)]
pub enum MatchTree {
    /// Author name or email matches.
    AuthorMatches(CaseFoldRegex),
    /// Committer name or email matches.
    CommitterMatches(CaseFoldRegex),
    /// Committer date strictly before.
    CommitBefore(DateTime<Utc>),
    /// Committer date strictly after.
    CommitAfter(DateTime<Utc>),
    MessageMatches(CaseFoldRegex),
    /// An added or removed line matches.
    DiffMatches(CaseFoldRegex),
    /// The old or new path of a file diff matches.
    DiffModifiesFile(CaseFoldRegex),
    Constant(bool),
    Operator(Operator),
}

#[derive(Debug, Clone)]
pub enum Operator {
    And(Vec<MatchTree>),
    Or(Vec<MatchTree>),
    Not(Box<MatchTree>),
}

type Evaluation = (CommitFilterResult, MatchedCommit);

impl MatchTree {
    /// Evaluate against `commit`, using `scratch` for case-folded matching.
    ///
    /// Errors (diff fetch or parse failures, unreadable dates) are never
    /// reported as "no match".
    pub fn evaluate<C: LazyCommit + ?Sized>(
        &self,
        commit: &C,
        scratch: &mut Scratch,
    ) -> Result<Evaluation> {
        match self {
            MatchTree::AuthorMatches(regex) => Ok(commit_level(
                regex.is_match(commit.author_name(), scratch)
                    || regex.is_match(commit.author_email(), scratch),
            )),
            MatchTree::CommitterMatches(regex) => Ok(commit_level(
                regex.is_match(commit.committer_name(), scratch)
                    || regex.is_match(commit.committer_email(), scratch),
            )),
            MatchTree::CommitBefore(time) => Ok(commit_level(commit.committer_date()? < *time)),
            MatchTree::CommitAfter(time) => Ok(commit_level(commit.committer_date()? > *time)),
            MatchTree::MessageMatches(regex) => {
                let message = commit.message();
                let spans = regex.find_spans(message, scratch);
                if spans.is_empty() {
                    return Ok(commit_level(false));
                }
                let highlights = MatchedCommit {
                    message: matches_to_ranges(message, spans),
                    ..Default::default()
                };
                Ok((CommitFilterResult::from_bool(true), highlights))
            }
            MatchTree::DiffMatches(regex) => diff_matches(regex, commit, scratch),
            MatchTree::DiffModifiesFile(regex) => diff_modifies_file(regex, commit, scratch),
            MatchTree::Constant(value) => Ok(commit_level(*value)),
            MatchTree::Operator(op) => op.evaluate(commit, scratch),
        }
    }

    /// [`MatchTree::evaluate`] with a fresh scratch buffer.
    pub fn matches<C: LazyCommit + ?Sized>(&self, commit: &C) -> Result<Evaluation> {
        self.evaluate(commit, &mut Scratch::new())
    }
}

impl Operator {
    fn evaluate<C: LazyCommit + ?Sized>(
        &self,
        commit: &C,
        scratch: &mut Scratch,
    ) -> Result<Evaluation> {
        match self {
            Operator::Not(operand) => {
                let file_count = commit.diff()?.len();
                let (result, _) = operand.evaluate(commit, scratch)?;
                Ok((result.invert(file_count), MatchedCommit::default()))
            }
            Operator::And(operands) => {
                let mut result = CommitFilterResult::from_bool(true);
                let mut highlights = MatchedCommit::default();
                for operand in operands {
                    let (r, h) = operand.evaluate(commit, scratch)?;
                    result = result.intersect(r);
                    if !result.satisfies() {
                        return Ok((result, MatchedCommit::default()));
                    }
                    highlights = highlights.merge(h);
                }
                highlights.constrain_to_matched(&result.matched_file_diffs);
                Ok((result, highlights))
            }
            Operator::Or(operands) => {
                let mut result = CommitFilterResult::from_bool(false);
                let mut highlights = MatchedCommit::default();
                for operand in operands {
                    let (r, h) = operand.evaluate(commit, scratch)?;
                    result = result.union(r);
                    highlights = highlights.merge(h);
                }
                highlights.constrain_to_matched(&result.matched_file_diffs);
                Ok((result, highlights))
            }
        }
    }
}

fn commit_level(matched: bool) -> Evaluation {
    (CommitFilterResult::from_bool(matched), MatchedCommit::default())
}

fn diff_matches<C: LazyCommit + ?Sized>(
    regex: &CaseFoldRegex,
    commit: &C,
    scratch: &mut Scratch,
) -> Result<Evaluation> {
    let mut files = BTreeMap::new();
    for (file_idx, file) in commit.diff()?.iter().enumerate() {
        let mut hunks = BTreeMap::new();
        for (hunk_idx, hunk) in file.hunks.iter().enumerate() {
            let mut lines = BTreeMap::new();
            for (line_idx, line) in hunk.lines().enumerate() {
                if !LineKind::of(line).is_change() {
                    continue;
                }
                let content = line_content(line);
                let spans = regex.find_spans(content, scratch);
                if !spans.is_empty() {
                    lines.insert(line_idx, matches_to_ranges(content, spans));
                }
            }
            if !lines.is_empty() {
                hunks.insert(hunk_idx, MatchedHunk { matched_lines: lines });
            }
        }
        if !hunks.is_empty() {
            files.insert(
                file_idx,
                MatchedFileDiff {
                    matched_hunks: hunks,
                    ..Default::default()
                },
            );
        }
    }

    let matched: BTreeSet<usize> = files.keys().copied().collect();
    let highlights = MatchedCommit {
        diff: files,
        ..Default::default()
    };
    Ok((CommitFilterResult::from_file_diffs(matched), highlights))
}

fn diff_modifies_file<C: LazyCommit + ?Sized>(
    regex: &CaseFoldRegex,
    commit: &C,
    scratch: &mut Scratch,
) -> Result<Evaluation> {
    // Most commits touch no matching path; answer those without the diff.
    let any_modified = commit
        .modified_files()
        .iter()
        .any(|path| regex.is_match(path.as_bytes(), scratch));
    if !any_modified {
        return Ok(commit_level(false));
    }

    let mut files = BTreeMap::new();
    for (file_idx, file) in commit.diff()?.iter().enumerate() {
        let old_file = name_ranges(regex, &file.orig_name, scratch);
        let new_file = name_ranges(regex, &file.new_name, scratch);
        if !old_file.is_empty() || !new_file.is_empty() {
            files.insert(
                file_idx,
                MatchedFileDiff {
                    old_file,
                    new_file,
                    ..Default::default()
                },
            );
        }
    }

    let matched = !files.is_empty();
    let highlights = MatchedCommit {
        diff: files,
        ..Default::default()
    };
    Ok((CommitFilterResult::from_bool(matched), highlights))
}

fn name_ranges(regex: &CaseFoldRegex, name: &str, scratch: &mut Scratch) -> Vec<Range> {
    if name == DEV_NULL {
        return Vec::new();
    }
    let spans = regex.find_spans(name.as_bytes(), scratch);
    matches_to_ranges(name.as_bytes(), spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{FileDiff, parse_diff};
    use crate::error::SiftError;
    use crate::query::Node;
    use crate::result::range::Location;
    use std::cell::Cell;

    struct TestCommit {
        author: &'static str,
        message: &'static str,
        date: Option<i64>,
        modified: Vec<String>,
        diff: Vec<FileDiff>,
        diff_calls: Cell<usize>,
    }

    impl TestCommit {
        fn new(raw_diff: &[u8]) -> Self {
            let diff = parse_diff(raw_diff).unwrap();
            TestCommit {
                author: "Alice Example",
                message: "Fix the parser\n\nCloses #12",
                date: Some(1_600_000_000),
                modified: diff.iter().map(|d| d.path().to_string()).collect(),
                diff,
                diff_calls: Cell::new(0),
            }
        }
    }

    impl LazyCommit for TestCommit {
        fn author_name(&self) -> &[u8] {
            self.author.as_bytes()
        }
        fn author_email(&self) -> &[u8] {
            b"alice@example.com"
        }
        fn committer_name(&self) -> &[u8] {
            b"Bob"
        }
        fn committer_email(&self) -> &[u8] {
            b"bob@example.com"
        }
        fn message(&self) -> &[u8] {
            self.message.as_bytes()
        }
        fn committer_date(&self) -> Result<DateTime<Utc>> {
            self.date
                .and_then(|s| DateTime::from_timestamp(s, 0))
                .ok_or_else(|| SiftError::commit("no date"))
        }
        fn modified_files(&self) -> &[String] {
            &self.modified
        }
        fn diff(&self) -> Result<&[FileDiff]> {
            self.diff_calls.set(self.diff_calls.get() + 1);
            Ok(&self.diff)
        }
    }

    const DIFF: &[u8] = b"diff --git src/parser.rs src/parser.rs
--- src/parser.rs
+++ src/parser.rs
@@ -1,3 +1,3 @@
 fn parse() {
-    old_call();
+    new_call();
 }
diff --git README.md README.md
--- README.md
+++ README.md
@@ -1 +1,2 @@
 # Title
+Call new_call() to parse.
";

    fn tree(json: &str) -> MatchTree {
        to_match_tree(&Node::from_json(json).unwrap()).unwrap()
    }

    fn eval(tree: &MatchTree, commit: &TestCommit) -> Evaluation {
        tree.matches(commit).unwrap()
    }

    #[test]
    fn test_author_matches_name_or_email() {
        let commit = TestCommit::new(DIFF);
        let by_name = tree(r#"{"type": "authorMatches", "expr": "alice", "ignoreCase": true}"#);
        let by_email = tree(r#"{"type": "authorMatches", "expr": "@example\\.com"}"#);
        let lowercase = tree(r#"{"type": "authorMatches", "expr": "alice"}"#);

        assert!(eval(&by_name, &commit).0.commit_matched);
        assert!(eval(&by_email, &commit).0.commit_matched);
        // Case-sensitive "alice" still matches the lowercase email.
        assert!(eval(&lowercase, &commit).0.commit_matched);
        assert_eq!(commit.diff_calls.get(), 0);
    }

    #[test]
    fn test_message_ranges() {
        let commit = TestCommit::new(DIFF);
        let (result, highlights) = eval(
            &tree(r#"{"type": "messageMatches", "expr": "closes #\\d+", "ignoreCase": true}"#),
            &commit,
        );
        assert!(result.satisfies());
        assert_eq!(
            highlights.message,
            vec![Range::new(Location::new(16, 2, 0), Location::new(26, 2, 10))]
        );
    }

    #[test]
    fn test_dates_are_strict() {
        let commit = TestCommit::new(DIFF);
        let at = "2020-09-13T12:26:40Z"; // 1_600_000_000
        let before = tree(&format!(r#"{{"type": "commitBefore", "time": "{at}"}}"#));
        let after = tree(&format!(r#"{{"type": "commitAfter", "time": "{at}"}}"#));
        assert!(!eval(&before, &commit).0.satisfies());
        assert!(!eval(&after, &commit).0.satisfies());

        let mut undated = TestCommit::new(DIFF);
        undated.date = None;
        assert!(before.matches(&undated).is_err());
    }

    #[test]
    fn test_diff_matches_changed_lines_only() {
        let commit = TestCommit::new(DIFF);
        let (result, highlights) = eval(&tree(r#"{"type": "diffMatches", "expr": "call"}"#), &commit);

        assert_eq!(
            result.matched_file_diffs,
            MatchedFileDiffs::Matched(BTreeSet::from([0, 1]))
        );
        let parser = &highlights.diff[&0].matched_hunks[&0];
        assert_eq!(parser.matched_lines.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        // "-    old_call();" without its prefix: "call" starts at column 8.
        assert_eq!(parser.matched_lines[&1][0].start, Location::new(8, 0, 8));

        // The context line "fn parse() {" is never searched.
        let (result, _) = eval(&tree(r#"{"type": "diffMatches", "expr": "fn parse"}"#), &commit);
        assert_eq!(result.matched_file_diffs, MatchedFileDiffs::Empty);
        assert!(!result.satisfies());
    }

    #[test]
    fn test_diff_modifies_file_prefilter() {
        let commit = TestCommit::new(DIFF);
        let (result, _) = eval(&tree(r#"{"type": "diffModifiesFile", "expr": "\\.go$"}"#), &commit);
        assert_eq!(result, CommitFilterResult::from_bool(false));
        assert_eq!(commit.diff_calls.get(), 0);

        let readme = tree(r#"{"type": "diffModifiesFile", "expr": "readme", "ignoreCase": true}"#);
        let (result, highlights) = eval(&readme, &commit);
        assert_eq!(result, CommitFilterResult::from_bool(true));
        assert_eq!(highlights.diff.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert!(highlights.diff[&1].names_only());
        assert_eq!(highlights.diff[&1].new_file[0].byte_range(), 0..6);
        assert_eq!(commit.diff_calls.get(), 1);
    }

    #[test]
    fn test_and_constrains_highlights() {
        let commit = TestCommit::new(DIFF);
        let and = tree(
            r#"{"type": "operator", "kind": "and", "operands": [
                {"type": "diffModifiesFile", "expr": "parser"},
                {"type": "diffMatches", "expr": "call"}
            ]}"#,
        );
        let (result, highlights) = eval(&and, &commit);
        assert_eq!(
            result.matched_file_diffs,
            MatchedFileDiffs::Matched(BTreeSet::from([0, 1]))
        );
        let file = &highlights.diff[&0];
        assert!(!file.new_file.is_empty());
        assert!(!file.matched_hunks.is_empty());
        assert!(highlights.diff[&1].new_file.is_empty());
    }

    #[test]
    fn test_file_and_content_do_not_correlate() {
        let commit = TestCommit::new(DIFF);
        // README.md matches the path, only parser.rs contains "old_call".
        let and = tree(
            r#"{"type": "operator", "kind": "and", "operands": [
                {"type": "diffModifiesFile", "expr": "README"},
                {"type": "diffMatches", "expr": "old_call"}
            ]}"#,
        );
        let (result, highlights) = eval(&and, &commit);
        assert!(result.satisfies());
        assert_eq!(
            result.matched_file_diffs,
            MatchedFileDiffs::Matched(BTreeSet::from([0]))
        );
        // The README name highlight is dropped with its file diff.
        assert_eq!(highlights.diff.keys().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_and_with_non_matching_path() {
        let commit = TestCommit::new(DIFF);
        let and = tree(
            r#"{"type": "operator", "kind": "and", "operands": [
                {"type": "diffModifiesFile", "expr": "\\.go$"},
                {"type": "diffMatches", "expr": "old_call"}
            ]}"#,
        );
        assert!(!eval(&and, &commit).0.satisfies());
    }

    #[test]
    fn test_and_short_circuits() {
        let commit = TestCommit::new(DIFF);
        let and = tree(
            r#"{"type": "operator", "kind": "and", "operands": [
                {"type": "authorMatches", "expr": "nobody"},
                {"type": "diffMatches", "expr": "call"}
            ]}"#,
        );
        assert!(!eval(&and, &commit).0.satisfies());
        assert_eq!(commit.diff_calls.get(), 0);
    }

    #[test]
    fn test_or_keeps_all_highlights() {
        let commit = TestCommit::new(DIFF);
        let or = tree(
            r#"{"type": "operator", "kind": "or", "operands": [
                {"type": "messageMatches", "expr": "parser"},
                {"type": "diffMatches", "expr": "old_call"}
            ]}"#,
        );
        let (result, highlights) = eval(&or, &commit);
        assert!(result.commit_matched);
        assert_eq!(highlights.message.len(), 1);
        assert_eq!(highlights.diff.len(), 1);
    }

    #[test]
    fn test_not_inverts_file_sets() {
        let commit = TestCommit::new(DIFF);
        let not = tree(
            r#"{"type": "operator", "kind": "not", "operands": [
                {"type": "diffMatches", "expr": "old_call"}
            ]}"#,
        );
        let (result, highlights) = eval(&not, &commit);
        assert_eq!(
            result.matched_file_diffs,
            MatchedFileDiffs::Matched(BTreeSet::from([1]))
        );
        assert!(highlights.is_empty());
    }

    #[test]
    fn test_not_fetches_diff_for_commit_predicates() {
        let commit = TestCommit::new(DIFF);
        let not = tree(
            r#"{"type": "operator", "kind": "not", "operands": [
                {"type": "authorMatches", "expr": "nobody"}
            ]}"#,
        );
        let (result, _) = eval(&not, &commit);
        assert_eq!(result, CommitFilterResult::from_bool(true));
        assert_eq!(commit.diff_calls.get(), 1);
    }

    #[test]
    fn test_double_negation() {
        let commit = TestCommit::new(DIFF);
        for leaf in [
            r#"{"type": "diffMatches", "expr": "old_call"}"#,
            r#"{"type": "diffMatches", "expr": "nothing"}"#,
            r#"{"type": "authorMatches", "expr": "alice"}"#,
            r#"{"type": "authorMatches", "expr": "nobody"}"#,
            r#"{"type": "diffModifiesFile", "expr": "parser"}"#,
        ] {
            let plain = tree(leaf);
            let double = tree(&format!(
                r#"{{"type": "operator", "kind": "not", "operands": [
                    {{"type": "operator", "kind": "not", "operands": [{leaf}]}}
                ]}}"#
            ));
            assert_eq!(
                eval(&plain, &commit).0.satisfies(),
                eval(&double, &commit).0.satisfies(),
                "{leaf}"
            );
        }

        // "nothing" matched no file diff: its negation is the wildcard, and
        // negating that again rejects the commit.
        let empty = TestCommit::new(b"");
        let content = r#"{"type": "diffMatches", "expr": "x"}"#;
        let not = tree(&format!(
            r#"{{"type": "operator", "kind": "not", "operands": [{content}]}}"#
        ));
        let double = tree(&format!(
            r#"{{"type": "operator", "kind": "not", "operands": [
                {{"type": "operator", "kind": "not", "operands": [{content}]}}
            ]}}"#
        ));
        assert!(!eval(&tree(content), &empty).0.satisfies());
        assert_eq!(eval(&not, &empty).0, CommitFilterResult::from_bool(true));
        assert!(!eval(&double, &empty).0.satisfies());
    }

    #[test]
    fn test_not_on_commit_without_file_diffs() {
        let commit = TestCommit::new(b"");
        let not = tree(
            r#"{"type": "operator", "kind": "not", "operands": [
                {"type": "diffMatches", "expr": "x"}
            ]}"#,
        );
        let (result, highlights) = eval(&not, &commit);
        assert!(result.satisfies());
        assert!(highlights.is_empty());
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let commit = TestCommit::new(DIFF);
        let query = tree(
            r#"{"type": "operator", "kind": "or", "operands": [
                {"type": "diffMatches", "expr": "CALL", "ignoreCase": true},
                {"type": "diffModifiesFile", "expr": "md$"}
            ]}"#,
        );
        let mut scratch = Scratch::new();
        let first = query.evaluate(&commit, &mut scratch).unwrap();
        let second = query.evaluate(&commit, &mut scratch).unwrap();
        assert_eq!(first, second);
    }
}
