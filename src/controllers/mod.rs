//! The four concrete alignment controllers.
//!
//! Each one lists the working copy and the server for its kind, hands the
//! candidates to [`alignment::review`] and saves what was approved.

pub mod cookbook;
pub mod data_bag;
pub mod environment;
pub mod role;

pub use cookbook::CookbookController;
pub use data_bag::DataBagController;
pub use environment::EnvironmentController;
pub use role::RoleController;

use alignment::{
    AlignContext, ApprovedSet, CandidateStatus, CommitOutcome, CommitReport, Diff, DiffOutcome,
    IgnoreList, ItemKey, Reporter, ResourceKind, UpdateCandidate,
};
use anyhow::Result;
use chefkit::Client;
use chefkit::local::{Listing, LocalRepo, RepoDir};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where a controller reads from and writes to
pub struct Sources<'a> {
    pub client: &'a Client,
    pub repo: &'a dyn LocalRepo,
    /// Names the active server context never wants pushed
    pub ignored: IgnoreList,
}

fn repo_dir(kind: ResourceKind) -> RepoDir {
    match kind {
        ResourceKind::Cookbook => RepoDir::Cookbooks,
        ResourceKind::DataBag => RepoDir::DataBags,
        ResourceKind::Role => RepoDir::Roles,
        ResourceKind::Environment => RepoDir::Environments,
    }
}

/// Unwrap a working-copy listing.
///
/// A missing directory is a warning and `None`: the kind is skipped.
/// Files that failed to parse are reported and left out.
pub(crate) fn local_items<K: Ord, T>(
    listing: chefkit::Result<Listing<K, T>>,
    kind: ResourceKind,
    reporter: &mut dyn Reporter,
) -> Result<Option<BTreeMap<K, T>>> {
    let listing = match listing {
        Ok(listing) => listing,
        Err(chefkit::Error::PathNotFound(path)) => {
            log::debug!("{} does not exist", path.display());
            let label = kind.label();
            reporter.warn(&format!("Bad {label} path, skipping {label} sync."));
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    for (file, message) in &listing.unreadable {
        reporter.error(&format!("Unable to load {} ({message})", file.display()));
    }
    Ok(Some(listing.items))
}

/// The computed diff, or `None` after warning that nothing was found locally
pub(crate) fn computed(
    outcome: DiffOutcome,
    kind: ResourceKind,
    repo: &dyn LocalRepo,
    reporter: &mut dyn Reporter,
) -> Option<Diff> {
    match outcome {
        DiffOutcome::Computed(diff) => Some(diff),
        DiffOutcome::NoLocalItems => {
            reporter.warn(&format!(
                "No local {} found, is the {} path correct ? ({})",
                kind.plural(),
                kind.label(),
                repo.describe_path(repo_dir(kind))
            ));
            None
        }
    }
}

/// Remote items keyed like the local ones.
///
/// Only keys the working copy also has are loaded; remote-only keys map to
/// `None`. A shared key that vanished between list and load is left out,
/// which makes it local-only.
pub(crate) fn remote_items<L, T, F>(
    remote_keys: Vec<ItemKey>,
    local: &BTreeMap<ItemKey, L>,
    mut load: F,
) -> chefkit::Result<BTreeMap<ItemKey, Option<T>>>
where
    F: FnMut(&ItemKey) -> chefkit::Result<Option<T>>,
{
    let mut remote = BTreeMap::new();
    for key in remote_keys {
        if !local.contains_key(&key) {
            remote.insert(key, None);
        } else if let Some(item) = load(&key)? {
            remote.insert(key, Some(item));
        }
    }
    Ok(remote)
}

/// List remote-only keys, writing each one locally when `dump` is set
pub(crate) fn remote_only<F>(
    kind: ResourceKind,
    keys: &[ItemKey],
    dump: bool,
    reporter: &mut dyn Reporter,
    mut write: F,
) where
    F: FnMut(&ItemKey) -> Result<PathBuf>,
{
    for key in keys {
        reporter.item(&format!("* {key} {} is remote only", kind.noun()));
        if dump {
            match write(key) {
                Ok(path) => reporter.item(&format!("* Dumping to {}", path.display())),
                Err(e) => reporter.error(&format!("Unable to dump {key} {} ({e:#})", kind.noun())),
            }
        }
    }
}

/// Save approved items one at a time.
///
/// A failed save is reported and the next item still runs.
pub(crate) fn commit_each<T, F>(
    approved: ApprovedSet<T>,
    ctx: &mut AlignContext<'_>,
    mut save: F,
) -> CommitReport
where
    F: FnMut(&UpdateCandidate<T>, &mut AlignContext<'_>) -> Result<()>,
{
    let noun = approved.kind.noun();
    let mut report = CommitReport::default();

    for candidate in &approved.items {
        let key = &candidate.key;
        let outcome = match save(candidate, ctx) {
            Ok(()) => {
                ctx.reporter.item(&format!("* Updating {key} {noun}"));
                ctx.journal.record(&format!("updating {key} {noun}"));
                match candidate.status {
                    CandidateStatus::LocalOnly => CommitOutcome::Created,
                    CandidateStatus::Changed(_) => CommitOutcome::Updated,
                }
            }
            Err(e) => {
                ctx.reporter
                    .error(&format!("Unable to update {key} {noun} ({e:#})"));
                CommitOutcome::Failed {
                    key: key.to_string(),
                    error: format!("{e:#}"),
                }
            }
        };
        report.add_outcome(outcome);
    }

    report
}
