//! Environment alignment: attributes only.
//!
//! Cookbook pins are owned by the cookbook controller, so a changed
//! environment is saved as the server's copy with the local attributes.

use super::{Sources, commit_each, computed, local_items, remote_items, remote_only};
use alignment::{
    AlignContext, AlignmentController, ApprovedSet, CandidateStatus, CommitReport, Field, ItemKey,
    ResourceKind, changed_fields, compute, review,
};
use anyhow::{Context, Result, anyhow};
use chefkit::{Client, Environment};
use std::collections::BTreeMap;

const FIELDS: &[Field<Environment>] = &[
    Field::new("default attributes", |a, b| {
        a.default_attributes != b.default_attributes
    }),
    Field::new("override attributes", |a, b| {
        a.override_attributes != b.override_attributes
    }),
];

pub struct EnvironmentController<'a> {
    sources: Sources<'a>,
}

impl<'a> EnvironmentController<'a> {
    pub fn new(sources: Sources<'a>) -> Self {
        Self { sources }
    }
}

/// The object to save for an approved environment
fn merged(client: &Client, local: &Environment, status: &CandidateStatus) -> Result<Environment> {
    if matches!(status, CandidateStatus::LocalOnly) {
        return Ok(local.clone());
    }
    let Some(mut remote) = client.find_environment(&local.name)? else {
        return Ok(local.clone());
    };
    remote.default_attributes = local.default_attributes.clone();
    remote.override_attributes = local.override_attributes.clone();
    Ok(remote)
}

impl AlignmentController for EnvironmentController<'_> {
    type Item = Environment;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Environment
    }

    fn check(&mut self, ctx: &mut AlignContext<'_>) -> Result<ApprovedSet<Environment>> {
        let kind = self.kind();
        ctx.reporter.heading(kind.heading());

        let Some(local) = local_items(self.sources.repo.environments(), kind, ctx.reporter)?
        else {
            return Ok(ApprovedSet::empty(kind));
        };
        let local: BTreeMap<ItemKey, Environment> = local
            .into_iter()
            .map(|(name, env)| (ItemKey::new(name), env))
            .collect();

        let client = self.sources.client;
        let names = client.backend().list_environments()?;
        let remote = remote_items(names.into_iter().map(ItemKey::new).collect(), &local, |key| {
            client.find_environment(&key.name)
        })?;
        let outcome = compute(&local, &remote, |_, local, remote| {
            Ok(remote
                .as_ref()
                .and_then(|remote| changed_fields(local, remote, FIELDS)))
        })?;
        let Some(diff) = computed(outcome, kind, self.sources.repo, ctx.reporter) else {
            return Ok(ApprovedSet::empty(kind));
        };

        // environments are listed but never dumped
        remote_only(kind, &diff.remote_only, false, ctx.reporter, |key| {
            Err(anyhow!("{key} cannot be dumped"))
        });

        review(
            kind,
            diff.into_candidates(local),
            &self.sources.ignored,
            "Environments are up-to-date.",
            ctx,
        )
    }

    fn commit(
        &mut self,
        approved: ApprovedSet<Environment>,
        ctx: &mut AlignContext<'_>,
    ) -> Result<CommitReport> {
        let client = self.sources.client;
        Ok(commit_each(approved, ctx, |candidate, _| {
            let environment = merged(client, &candidate.item, &candidate.status)?;
            client
                .save_environment(&environment)
                .with_context(|| format!("saving {}", environment.name))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignment::{IgnoreList, RecordingJournal, RecordingReporter, ScriptedPrompt};
    use chefkit::backend::memory::MemoryBackend;
    use chefkit::local::MemoryRepo;
    use serde_json::json;
    use std::sync::Arc;

    fn env(name: &str, defaults: serde_json::Value) -> Environment {
        let mut env = Environment::new(name);
        env.default_attributes = defaults;
        env
    }

    #[test]
    fn test_changed_environment_keeps_remote_pins() {
        let mut remote = env("prod", json!({"tier": "old"}));
        remote.pin("nginx", "1.2.0");
        let backend = Arc::new(MemoryBackend::new().with_environment(remote));
        let client = Client::with_backend(Box::new(Arc::clone(&backend)));
        let repo = MemoryRepo::new()
            .with_environment(env("prod", json!({"tier": "new"})))
            .with_environment(env("qa", json!({})));

        let mut controller = EnvironmentController::new(Sources {
            client: &client,
            repo: &repo,
            ignored: IgnoreList::default(),
        });
        let mut prompt = ScriptedPrompt::new(["A"]);
        let mut reporter = RecordingReporter::default();
        let mut journal = RecordingJournal::default();
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        let approved = controller.check(&mut ctx).unwrap();
        assert_eq!(approved.len(), 2);

        let report = controller.commit(approved, &mut ctx).unwrap();
        assert_eq!((report.created, report.updated), (1, 1));
        assert!(reporter.contains("* qa environment is local only"));
        assert!(reporter.contains("* prod environment is not up-to-date (default attributes)"));

        let prod = backend.environment("prod").unwrap();
        assert_eq!(prod.default_attributes, json!({"tier": "new"}));
        assert_eq!(prod.cookbook_versions["nginx"], "= 1.2.0");
        assert!(backend.environment("qa").is_some());
        assert!(reporter.contains("* Updating prod environment"));
    }

    #[test]
    fn test_in_sync_and_remote_only() {
        let client = Client::with_backend(Box::new(
            MemoryBackend::new()
                .with_environment(env("prod", json!({})))
                .with_environment(env("staging", json!({}))),
        ));
        let repo = MemoryRepo::new().with_environment(env("prod", json!({})));

        let mut controller = EnvironmentController::new(Sources {
            client: &client,
            repo: &repo,
            ignored: IgnoreList::default(),
        });
        let mut prompt = ScriptedPrompt::default();
        let mut reporter = RecordingReporter::default();
        let mut journal = RecordingJournal::default();
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        assert!(controller.check(&mut ctx).unwrap().is_empty());
        assert!(reporter.contains("* staging environment is remote only"));
        assert!(reporter.contains("* Environments are up-to-date."));
    }

    #[test]
    fn test_failed_save_is_isolated() {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_environment(env("prod", json!({"a": 1})))
                .with_environment(env("qa", json!({"a": 1})))
                .failing("environments/prod"),
        );
        let client = Client::with_backend(Box::new(Arc::clone(&backend)));
        let repo = MemoryRepo::new()
            .with_environment(env("prod", json!({"a": 2})))
            .with_environment(env("qa", json!({"a": 2})));

        let mut controller = EnvironmentController::new(Sources {
            client: &client,
            repo: &repo,
            ignored: IgnoreList::default(),
        });
        let mut prompt = ScriptedPrompt::new(["Y", "Y"]);
        let mut reporter = RecordingReporter::default();
        let mut journal = RecordingJournal::default();
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        let approved = controller.check(&mut ctx).unwrap();
        let report = controller.commit(approved, &mut ctx).unwrap();
        assert_eq!((report.updated, report.failed), (1, 1));
        assert!(reporter.contains("Unable to update prod environment"));
        assert_eq!(backend.environment("qa").unwrap().default_attributes, json!({"a": 2}));
    }
}
