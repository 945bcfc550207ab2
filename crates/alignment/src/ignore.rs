//! Per-server ignore lists

use crate::types::{ItemKey, UpdateCandidate};
use std::collections::BTreeSet;

/// Names that must never be pushed for one server context.
///
/// Matching is exact against the key's display form, so data bag items
/// are listed as `bag/item`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    names: BTreeSet<String>,
}

impl IgnoreList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.names.contains(&key.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Split candidates into kept and ignored, preserving order
pub fn filter<T>(
    candidates: Vec<UpdateCandidate<T>>,
    ignored: &IgnoreList,
) -> (Vec<UpdateCandidate<T>>, Vec<UpdateCandidate<T>>) {
    candidates
        .into_iter()
        .partition(|candidate| !ignored.contains(&candidate.key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandidateStatus;

    fn candidate(key: ItemKey) -> UpdateCandidate<()> {
        UpdateCandidate::new(key, (), CandidateStatus::LocalOnly)
    }

    #[test]
    fn test_filter_exact_match() {
        let ignored = IgnoreList::new(["web"]);
        let (kept, skipped) = filter(
            vec![
                candidate(ItemKey::new("web")),
                candidate(ItemKey::new("web-frontend")),
            ],
            &ignored,
        );

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].key.name, "web-frontend");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].key.name, "web");
    }

    #[test]
    fn test_data_bag_items_match_joined_form() {
        let ignored: IgnoreList = ["users/alice"].into_iter().collect();

        assert!(ignored.contains(&ItemKey::nested("users", "alice")));
        assert!(!ignored.contains(&ItemKey::new("alice")));
        assert!(!ignored.contains(&ItemKey::nested("admins", "alice")));
    }

    #[test]
    fn test_empty_list_keeps_everything() {
        let (kept, skipped) = filter(vec![candidate(ItemKey::new("a"))], &IgnoreList::default());
        assert_eq!(kept.len(), 1);
        assert!(skipped.is_empty());
    }
}
