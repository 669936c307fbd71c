//! Repository-level and owner-level matches.

use serde::{Deserialize, Serialize};

use crate::result::key::{Key, TypeRank};
use crate::result::range::Range;
use crate::result::select::{self, SelectPath};

/// A repository that matched, either by name or by description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMatch {
    pub name: String,
    pub rev: Option<String>,
    pub description: String,
    pub name_ranges: Vec<Range>,
    pub description_ranges: Vec<Range>,
}

impl RepoMatch {
    pub fn key(&self) -> Key {
        Key {
            repo: self.name.clone(),
            rev: self.rev.clone().unwrap_or_default(),
            type_rank: TypeRank::Repo,
            ..Default::default()
        }
    }

    pub fn select(&self, path: &SelectPath) -> Option<RepoMatch> {
        (path.root() == select::REPOSITORY).then(|| self.clone())
    }

    pub fn append_matches(&mut self, other: &RepoMatch) {
        merge_ranges(&mut self.name_ranges, &other.name_ranges);
        merge_ranges(&mut self.description_ranges, &other.description_ranges);
    }
}

/// The owner of some code, resolved to a person or a team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Owner {
    Person { handle: String, email: String },
    Team { handle: String },
}

impl Owner {
    /// A stable identifier for the owner, used as its key.
    pub fn identifier(&self) -> String {
        match self {
            Owner::Person { handle, email } if handle.is_empty() => format!("Person:{email}"),
            Owner::Person { handle, .. } => format!("Person:{handle}"),
            Owner::Team { handle } => format!("Team:{handle}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerMatch {
    pub owner: Owner,
    pub limit_hit: bool,
}

impl OwnerMatch {
    pub fn key(&self) -> Key {
        Key {
            owner_metadata: self.owner.identifier(),
            type_rank: TypeRank::Owner,
            ..Default::default()
        }
    }

    pub fn select(&self, path: &SelectPath) -> Option<OwnerMatch> {
        (path.root() == select::OWNER).then(|| self.clone())
    }

    pub fn append_matches(&mut self, other: &OwnerMatch) {
        self.limit_hit |= other.limit_hit;
    }
}

pub(crate) fn merge_ranges(into: &mut Vec<Range>, from: &[Range]) {
    into.extend_from_slice(from);
    into.sort();
    into.dedup();
}
