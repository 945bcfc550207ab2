//! Data bag alignment: items compared by their whole payload.

use super::{Sources, commit_each, computed, local_items, remote_items, remote_only};
use alignment::{
    AlignContext, AlignmentController, ApprovedSet, CommitReport, ItemKey, ResourceKind,
    changed_content, compute, review,
};
use anyhow::{Result, anyhow};
use chefkit::DataBagItem;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::collections::{BTreeMap, BTreeSet};

pub struct DataBagController<'a> {
    sources: Sources<'a>,
    dump: bool,
}

impl<'a> DataBagController<'a> {
    pub fn new(sources: Sources<'a>) -> Self {
        Self {
            sources,
            dump: false,
        }
    }

    /// Write remote-only items into the working copy
    pub fn dump_remote_only(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }

    fn remote_keys(&self) -> Result<Vec<ItemKey>> {
        let client = self.sources.client;
        let mut keys = Vec::new();
        for bag in client.data_bags()? {
            for id in client.backend().list_data_bag_items(&bag)? {
                keys.push(ItemKey::nested(bag.clone(), id));
            }
        }
        Ok(keys)
    }

    fn load(&self, key: &ItemKey) -> chefkit::Result<Option<DataBagItem>> {
        let bag = key.parent.as_deref().unwrap_or_default();
        self.sources.client.find_data_bag_item(bag, &key.name)
    }
}

/// Unified diff of two payloads, remote first
pub fn payload_diff(remote: &Value, local: &Value) -> String {
    let remote = serde_json::to_string_pretty(remote).unwrap_or_default();
    let local = serde_json::to_string_pretty(local).unwrap_or_default();

    let mut out = String::new();
    for change in TextDiff::from_lines(&remote, &local).iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => ' ',
        };
        out.push(sign);
        out.push_str(change.value().trim_end_matches('\n'));
        out.push('\n');
    }
    out
}

impl AlignmentController for DataBagController<'_> {
    type Item = DataBagItem;

    fn kind(&self) -> ResourceKind {
        ResourceKind::DataBag
    }

    fn check(&mut self, ctx: &mut AlignContext<'_>) -> Result<ApprovedSet<DataBagItem>> {
        let kind = self.kind();
        ctx.reporter.heading(kind.heading());

        let Some(local) = local_items(self.sources.repo.data_bag_items(), kind, ctx.reporter)?
        else {
            return Ok(ApprovedSet::empty(kind));
        };
        let local: BTreeMap<ItemKey, DataBagItem> = local
            .into_iter()
            .map(|((bag, id), item)| (ItemKey::nested(bag, id), item))
            .collect();

        let remote = remote_items(self.remote_keys()?, &local, |key| self.load(key))?;
        let outcome = compute(&local, &remote, |_, local, remote| {
            Ok(remote
                .as_ref()
                .and_then(|remote| changed_content(&local.raw_data, &remote.raw_data)))
        })?;
        let Some(diff) = computed(outcome, kind, self.sources.repo, ctx.reporter) else {
            return Ok(ApprovedSet::empty(kind));
        };

        let repo = self.sources.repo;
        remote_only(kind, &diff.remote_only, self.dump, ctx.reporter, |key| {
            let item = self
                .load(key)?
                .ok_or_else(|| anyhow!("{key} is no longer on the server"))?;
            Ok(repo.write_data_bag_item(&item)?)
        });

        // ignored items never show their payload
        for key in diff.changed.keys() {
            if self.sources.ignored.contains(key) {
                continue;
            }
            if let (Some(local), Some(Some(remote))) = (local.get(key), remote.get(key)) {
                ctx.reporter.detail(&format!(
                    "{key}:\n{}",
                    payload_diff(&remote.raw_data, &local.raw_data)
                ));
            }
        }

        review(
            kind,
            diff.into_candidates(local),
            &self.sources.ignored,
            "Data bags are up-to-date.",
            ctx,
        )
    }

    fn commit(
        &mut self,
        approved: ApprovedSet<DataBagItem>,
        ctx: &mut AlignContext<'_>,
    ) -> Result<CommitReport> {
        let client = self.sources.client;
        let mut known: BTreeSet<String> = client.data_bags()?.into_iter().collect();

        Ok(commit_each(approved, ctx, |candidate, ctx| {
            let item = &candidate.item;
            if !known.contains(&item.bag) {
                client.ensure_data_bag(&item.bag)?;
                known.insert(item.bag.clone());
                ctx.reporter.item(&format!("* Creating data bag {}", item.bag));
                ctx.journal.record(&format!("creating data bag {}", item.bag));
            }
            client.save_data_bag_item(item)?;
            Ok(())
        }))
    }
}
