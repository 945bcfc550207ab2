//! Set differences and field-level deltas between local and remote collections

use crate::error::{Error, Result};
use crate::types::{CandidateStatus, ChangeInfo, ItemKey, UpdateCandidate, VersionVerdict};
use semver::Version;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Differences between a local and a remote collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Keys present only locally
    pub local_only: Vec<ItemKey>,
    /// Keys present only on the server
    pub remote_only: Vec<ItemKey>,
    /// Keys present on both sides whose values differ
    pub changed: BTreeMap<ItemKey, ChangeInfo>,
}

impl Diff {
    /// Check if local and remote agree on every shared key and nothing is local-only
    pub fn is_in_sync(&self) -> bool {
        self.local_only.is_empty() && self.changed.is_empty()
    }

    /// Turn local-only and changed keys into candidates.
    ///
    /// `items` holds the object to save for each key. Keys missing from
    /// `items` are dropped. Local-only candidates come first, then changed
    /// ones, each group in key order.
    pub fn into_candidates<T>(self, mut items: BTreeMap<ItemKey, T>) -> Vec<UpdateCandidate<T>> {
        let mut candidates = Vec::with_capacity(self.local_only.len() + self.changed.len());

        for key in self.local_only {
            if let Some(item) = items.remove(&key) {
                candidates.push(UpdateCandidate::new(key, item, CandidateStatus::LocalOnly));
            }
        }

        for (key, change) in self.changed {
            if let Some(item) = items.remove(&key) {
                candidates.push(UpdateCandidate::new(
                    key,
                    item,
                    CandidateStatus::Changed(change),
                ));
            }
        }

        candidates
    }
}

/// Result of comparing two collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// The local enumeration was empty; nothing was compared
    NoLocalItems,
    Computed(Diff),
}

/// Compare a local collection with a remote one.
///
/// `compare` is called once per shared key and returns `Some` when the pair
/// should be flagged. Set subtraction happens first, so the three result
/// sets are disjoint.
pub fn compute<L, R, F>(
    local: &BTreeMap<ItemKey, L>,
    remote: &BTreeMap<ItemKey, R>,
    mut compare: F,
) -> Result<DiffOutcome>
where
    F: FnMut(&ItemKey, &L, &R) -> Result<Option<ChangeInfo>>,
{
    if local.is_empty() {
        return Ok(DiffOutcome::NoLocalItems);
    }

    let mut diff = Diff::default();

    for (key, local_item) in local {
        match remote.get(key) {
            None => diff.local_only.push(key.clone()),
            Some(remote_item) => {
                if let Some(change) = compare(key, local_item, remote_item)? {
                    diff.changed.insert(key.clone(), change);
                }
            }
        }
    }

    diff.remote_only = remote
        .keys()
        .filter(|key| !local.contains_key(*key))
        .cloned()
        .collect();

    Ok(DiffOutcome::Computed(diff))
}

// ============================================================================
// Comparators
// ============================================================================

/// A tracked field: display label plus an inequality test
pub struct Field<T> {
    pub label: &'static str,
    pub differs: fn(&T, &T) -> bool,
}

impl<T> Field<T> {
    pub const fn new(label: &'static str, differs: fn(&T, &T) -> bool) -> Self {
        Self { label, differs }
    }
}

/// Compare two items over a fixed list of fields.
///
/// Returns the labels of every differing field, or `None` if all match.
pub fn changed_fields<T>(local: &T, remote: &T, fields: &[Field<T>]) -> Option<ChangeInfo> {
    let labels: Vec<&'static str> = fields
        .iter()
        .filter(|field| (field.differs)(local, remote))
        .map(|field| field.label)
        .collect();

    if labels.is_empty() {
        None
    } else {
        Some(ChangeInfo::Fields(labels))
    }
}

/// Deep structural comparison with no field breakdown
pub fn changed_content<T: PartialEq>(local: &T, remote: &T) -> Option<ChangeInfo> {
    (local != remote).then_some(ChangeInfo::Content)
}

/// Parse a cookbook version, accepting the short `x` and `x.y` forms.
///
/// A leading `=` (exact pin) is tolerated.
pub fn parse_version(name: &str, raw: &str) -> Result<Version> {
    let trimmed = raw.trim().trim_start_matches('=').trim();
    let normalized = match trimmed.split('.').count() {
        1 => format!("{trimmed}.0.0"),
        2 => format!("{trimmed}.0"),
        _ => trimmed.to_string(),
    };

    Version::parse(&normalized).map_err(|_| Error::InvalidVersion {
        name: name.to_string(),
        version: raw.to_string(),
    })
}

/// Order a local version against a remote one
pub fn order_versions(name: &str, local: &str, remote: &str) -> Result<VersionVerdict> {
    let local_version = parse_version(name, local)?;
    let remote_version = parse_version(name, remote)?;

    Ok(match local_version.cmp(&remote_version) {
        Ordering::Greater => VersionVerdict::Ahead,
        Ordering::Less => VersionVerdict::Behind,
        Ordering::Equal => VersionVerdict::Equal,
    })
}

/// Cookbook comparison: flag upgrades, and downgrades only when forced.
///
/// Equal versions are never flagged.
pub fn compare_versions(
    name: &str,
    local: &str,
    remote: &str,
    force: bool,
) -> Result<Option<ChangeInfo>> {
    let verdict = order_versions(name, local, remote)?;
    let flagged = match verdict {
        VersionVerdict::Ahead => true,
        VersionVerdict::Behind => force,
        VersionVerdict::Equal => false,
    };

    Ok(flagged.then(|| ChangeInfo::Version {
        verdict,
        local: local.to_string(),
        remote: remote.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed<V: Clone>(pairs: &[(&str, V)]) -> BTreeMap<ItemKey, V> {
        pairs
            .iter()
            .map(|(k, v)| (ItemKey::new(*k), v.clone()))
            .collect()
    }

    fn computed(outcome: DiffOutcome) -> Diff {
        match outcome {
            DiffOutcome::Computed(diff) => diff,
            DiffOutcome::NoLocalItems => panic!("expected a computed diff"),
        }
    }

    #[test]
    fn test_set_differences() {
        let local = keyed(&[("a", 1), ("b", 2), ("c", 3)]);
        let remote = keyed(&[("b", 2), ("c", 4), ("d", 5)]);

        let diff = computed(
            compute(&local, &remote, |_, l, r| Ok(changed_content(l, r))).unwrap(),
        );

        assert_eq!(diff.local_only, vec![ItemKey::new("a")]);
        assert_eq!(diff.remote_only, vec![ItemKey::new("d")]);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed.get(&ItemKey::new("c")), Some(&ChangeInfo::Content));
    }

    #[test]
    fn test_disjoint_sets_never_compared() {
        let local = keyed(&[("a", 1)]);
        let remote = keyed(&[("b", 1)]);

        let diff = computed(
            compute(&local, &remote, |_, _, _| -> Result<Option<ChangeInfo>> {
                panic!("no shared keys")
            })
            .unwrap(),
        );

        assert_eq!(diff.local_only, vec![ItemKey::new("a")]);
        assert_eq!(diff.remote_only, vec![ItemKey::new("b")]);
        assert!(diff.changed.is_empty());
    }

    #[test]
    fn test_empty_local_is_distinct_outcome() {
        let local: BTreeMap<ItemKey, i32> = BTreeMap::new();
        let remote = keyed(&[("a", 1)]);

        let outcome = compute(&local, &remote, |_, l, r| Ok(changed_content(l, r))).unwrap();
        assert_eq!(outcome, DiffOutcome::NoLocalItems);
    }

    #[test]
    fn test_in_sync() {
        let local = keyed(&[("a", 1)]);
        let diff = computed(compute(&local, &local, |_, l, r| Ok(changed_content(l, r))).unwrap());
        assert!(diff.is_in_sync());
    }

    #[derive(Clone)]
    struct RoleLike {
        run_list: Vec<&'static str>,
        defaults: u32,
        overrides: u32,
    }

    const ROLE_FIELDS: &[Field<RoleLike>] = &[
        Field::new("run list", |a, b| a.run_list != b.run_list),
        Field::new("default attributes", |a, b| a.defaults != b.defaults),
        Field::new("override attributes", |a, b| a.overrides != b.overrides),
    ];

    #[test]
    fn test_changed_fields_reports_labels() {
        let local = RoleLike {
            run_list: vec!["r1"],
            defaults: 1,
            overrides: 1,
        };
        let remote = RoleLike {
            run_list: vec!["r2"],
            ..local.clone()
        };

        assert_eq!(
            changed_fields(&local, &remote, ROLE_FIELDS),
            Some(ChangeInfo::Fields(vec!["run list"]))
        );
        assert_eq!(changed_fields(&local, &local, ROLE_FIELDS), None);
    }

    #[test]
    fn test_version_upgrade_flagged() {
        let change = compare_versions("A", "2.0.0", "1.0.0", false).unwrap();
        assert!(matches!(
            change,
            Some(ChangeInfo::Version {
                verdict: VersionVerdict::Ahead,
                ..
            })
        ));
    }

    #[test]
    fn test_version_downgrade_needs_force() {
        assert_eq!(compare_versions("A", "1.0.0", "2.0.0", false).unwrap(), None);

        let forced = compare_versions("A", "1.0.0", "2.0.0", true).unwrap();
        assert!(matches!(
            forced,
            Some(ChangeInfo::Version {
                verdict: VersionVerdict::Behind,
                ..
            })
        ));
    }

    #[test]
    fn test_equal_versions_never_flagged() {
        assert_eq!(compare_versions("A", "1.0.0", "1.0.0", false).unwrap(), None);
        assert_eq!(compare_versions("A", "1.0.0", "1.0", true).unwrap(), None);
    }

    #[test]
    fn test_semver_not_lexicographic() {
        assert_eq!(
            order_versions("A", "1.10.0", "1.9.0").unwrap(),
            VersionVerdict::Ahead
        );
    }

    #[test]
    fn test_exact_pin_prefix_accepted() {
        assert_eq!(
            order_versions("A", "1.2.0", "= 1.1.0").unwrap(),
            VersionVerdict::Ahead
        );
    }

    #[test]
    fn test_malformed_version_is_an_error() {
        let err = compare_versions("A", "banana", "1.0.0", false).unwrap_err();
        assert!(matches!(err, Error::InvalidVersion { ref name, .. } if name == "A"));
    }

    #[test]
    fn test_into_candidates_order() {
        let diff = Diff {
            local_only: vec![ItemKey::new("z")],
            remote_only: vec![ItemKey::new("r")],
            changed: [(ItemKey::new("a"), ChangeInfo::Content)].into_iter().collect(),
        };
        let items = keyed(&[("a", 1), ("z", 2)]);

        let candidates = diff.into_candidates(items);
        let keys: Vec<String> = candidates.iter().map(|c| c.key.to_string()).collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(candidates[0].status, CandidateStatus::LocalOnly);
    }
}
