//! Core types for alignment

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four kinds of server objects that can be aligned.
///
/// Declaration order is commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Cookbook,
    DataBag,
    Role,
    Environment,
}

impl ResourceKind {
    /// Every kind, in commit order
    pub const ALL: [Self; 4] = [Self::Cookbook, Self::DataBag, Self::Role, Self::Environment];

    /// Singular noun used in item lines ("* web role is local only")
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Cookbook => "cookbook",
            Self::DataBag => "data bag item",
            Self::Role => "role",
            Self::Environment => "environment",
        }
    }

    /// Plural noun used in summaries
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Cookbook => "cookbooks",
            Self::DataBag => "data bags",
            Self::Role => "roles",
            Self::Environment => "environments",
        }
    }

    /// Section heading printed before a kind is checked
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Cookbook => "== Cookbooks ==",
            Self::DataBag => "== Data bags ==",
            Self::Role => "== Roles ==",
            Self::Environment => "== Environments ==",
        }
    }

    /// Noun used in "Aborting ... alignment." and path warnings
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cookbook => "cookbook",
            Self::DataBag => "data bag",
            Self::Role => "role",
            Self::Environment => "environment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// Identity of an item within its kind.
///
/// Data bag items carry their bag as `parent`; every other kind is single-level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub parent: Option<String>,
    pub name: String,
}

impl ItemKey {
    /// Key for a single-level item (cookbook, role, environment)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parent: None,
            name: name.into(),
        }
    }

    /// Key for a data bag item
    pub fn nested(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{}/{}", parent, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Ordering of a local cookbook version relative to the remote pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionVerdict {
    /// Local is strictly newer
    Ahead,
    /// Local is strictly older
    Behind,
    Equal,
}

/// What differs between a local item and its remote counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeInfo {
    /// Display labels of the fields whose values differ
    Fields(Vec<&'static str>),
    /// Version ordering for cookbooks
    Version {
        verdict: VersionVerdict,
        local: String,
        remote: String,
    },
    /// Payloads differ somewhere, no breakdown
    Content,
}

/// Why a candidate was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateStatus {
    LocalOnly,
    Changed(ChangeInfo),
}

/// A local item proposed for pushing to the server
#[derive(Debug, Clone)]
pub struct UpdateCandidate<T> {
    pub key: ItemKey,
    /// The object that will be saved if approved
    pub item: T,
    pub status: CandidateStatus,
    /// Value the server will end up with, shown to the operator (cookbook version)
    pub target: Option<String>,
}

impl<T> UpdateCandidate<T> {
    pub fn new(key: ItemKey, item: T, status: CandidateStatus) -> Self {
        Self {
            key,
            item,
            status,
            target: None,
        }
    }

    /// Attach the value shown in prompts
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Human-readable reasons this candidate exists
    pub fn reasons(&self) -> Vec<String> {
        match &self.status {
            CandidateStatus::LocalOnly => vec!["local only".to_string()],
            CandidateStatus::Changed(ChangeInfo::Fields(labels)) => {
                labels.iter().map(|l| (*l).to_string()).collect()
            }
            CandidateStatus::Changed(ChangeInfo::Version { verdict, .. }) => match verdict {
                VersionVerdict::Behind => vec!["to be downgraded".to_string()],
                _ => vec!["not up-to-date".to_string()],
            },
            CandidateStatus::Changed(ChangeInfo::Content) => vec!["not up-to-date".to_string()],
        }
    }

    /// The progress line printed for this candidate, without the leading marker
    pub fn describe(&self, kind: ResourceKind) -> String {
        let noun = kind.noun();
        match &self.status {
            CandidateStatus::LocalOnly => match &self.target {
                Some(version) => format!("{} is local only (version {})", self.key, version),
                None => format!("{} {} is local only", self.key, noun),
            },
            CandidateStatus::Changed(ChangeInfo::Version {
                verdict,
                local,
                remote,
            }) => {
                let state = match verdict {
                    VersionVerdict::Behind => "is to be downgraded",
                    _ => "is not up-to-date",
                };
                format!("{} {} (local: {}/remote: {})", self.key, state, local, remote)
            }
            CandidateStatus::Changed(ChangeInfo::Fields(labels)) => {
                format!("{} {} is not up-to-date ({})", self.key, noun, labels.join(", "))
            }
            CandidateStatus::Changed(ChangeInfo::Content) => {
                format!("{} {} is not up-to-date", self.key, noun)
            }
        }
    }

    /// Question asked before approving this candidate
    pub fn question(&self, kind: ResourceKind) -> String {
        let target = self
            .target
            .as_ref()
            .map(|t| format!(" to {t}"))
            .unwrap_or_default();
        format!(
            "> Update {} {}{} on server ? Y/N/(A)ll/(Q)uit ",
            self.key,
            kind.noun(),
            target
        )
    }
}

/// Candidates the operator confirmed, in diff order
#[derive(Debug, Clone)]
pub struct ApprovedSet<T> {
    pub kind: ResourceKind,
    pub items: Vec<UpdateCandidate<T>>,
}

impl<T> ApprovedSet<T> {
    pub fn new(kind: ResourceKind, items: Vec<UpdateCandidate<T>>) -> Self {
        Self { kind, items }
    }

    pub fn empty(kind: ResourceKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.items.iter().map(|c| &c.key)
    }
}

/// Result of committing a single item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
    /// Item was saved over an existing remote object
    Updated,
    /// Item did not exist remotely and was created
    Created,
    /// Save failed
    Failed { key: String, error: String },
}

/// Summary of a commit phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitReport {
    pub updated: usize,
    pub created: usize,
    pub failed: usize,
    /// `(key, error)` for every failed item
    pub failures: Vec<(String, String)>,
}

impl CommitReport {
    /// Number of items that reached the server
    pub fn total_changes(&self) -> usize {
        self.updated + self.created
    }

    /// Check if the commit was fully successful
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: &CommitReport) {
        self.updated += other.updated;
        self.created += other.created;
        self.failed += other.failed;
        self.failures.extend(other.failures.iter().cloned());
    }

    /// Add an outcome to the report
    pub fn add_outcome(&mut self, outcome: CommitOutcome) {
        match outcome {
            CommitOutcome::Updated => self.updated += 1,
            CommitOutcome::Created => self.created += 1,
            CommitOutcome::Failed { key, error } => {
                self.failed += 1;
                self.failures.push((key, error));
            }
        }
    }
}
