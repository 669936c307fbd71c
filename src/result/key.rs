//! Identity and ordering of results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rank of a result kind, used as the last tiebreak between keys.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TypeRank {
    #[default]
    File,
    Commit,
    Diff,
    Repo,
    Symbol,
    Owner,
}

/// Identity of a result.
///
/// Two matches with equal keys are the same logical result and get merged by
/// the [`Deduper`](crate::result::deduper::Deduper) and the
/// [`Merger`](crate::result::merger::Merger). The derived ordering compares
/// fields in declaration order, which gives the canonical result order:
/// repo, rev, author date, commit, path, owner, and finally type rank.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Key {
    pub repo: String,
    pub rev: String,
    /// `None` sorts before every date.
    pub author_date: Option<DateTime<Utc>>,
    pub commit: String,
    pub path: String,
    pub owner_metadata: String,
    pub type_rank: TypeRank,
}

impl Key {
    /// Strict "less than" under the canonical result order.
    pub fn less(&self, other: &Key) -> bool {
        self < other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(repo: &str, rank: TypeRank) -> Key {
        Key {
            repo: repo.to_string(),
            type_rank: rank,
            ..Default::default()
        }
    }

    #[test]
    fn test_repo_dominates_type_rank() {
        assert!(key("a", TypeRank::Owner).less(&key("b", TypeRank::File)));
        assert!(!key("b", TypeRank::File).less(&key("a", TypeRank::Owner)));
    }

    #[test]
    fn test_type_rank_breaks_ties() {
        let file = key("a", TypeRank::File);
        let commit = key("a", TypeRank::Commit);
        assert!(file.less(&commit));
        assert!(!commit.less(&file));
        assert!(!file.less(&file.clone()));
    }

    #[test]
    fn test_field_precedence() {
        let early = Utc.timestamp_opt(1_000, 0).unwrap();
        let late = Utc.timestamp_opt(2_000, 0).unwrap();

        let a = Key {
            repo: "r".into(),
            rev: "main".into(),
            author_date: Some(late),
            commit: "aaa".into(),
            ..Default::default()
        };
        let b = Key {
            repo: "r".into(),
            rev: "main".into(),
            author_date: Some(early),
            commit: "zzz".into(),
            ..Default::default()
        };
        // The author date is compared before the commit id.
        assert!(b.less(&a));

        let c = Key {
            rev: "dev".into(),
            ..a.clone()
        };
        // The rev is compared before the author date.
        assert!(c.less(&b));

        let mut path_a = a.clone();
        path_a.path = "a.go".into();
        let mut path_b = a.clone();
        path_b.path = "b.go".into();
        path_b.owner_metadata = "alice".into();
        assert!(path_a.less(&path_b));
    }

    #[test]
    fn test_missing_date_sorts_first() {
        let dated = Key {
            author_date: Some(Utc.timestamp_opt(0, 0).unwrap()),
            ..Default::default()
        };
        assert!(Key::default().less(&dated));
    }
}
