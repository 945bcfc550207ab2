//! Role alignment.

use super::{Sources, commit_each, computed, local_items, remote_items, remote_only};
use alignment::{
    AlignContext, AlignmentController, ApprovedSet, CommitReport, Field, ItemKey, ResourceKind,
    changed_fields, compute, review,
};
use anyhow::{Result, anyhow};
use chefkit::Role;
use std::collections::BTreeMap;

/// Fields that make two roles different
const FIELDS: &[Field<Role>] = &[
    Field::new("run list", |a, b| a.all_run_lists() != b.all_run_lists()),
    Field::new("default attributes", |a, b| {
        a.default_attributes != b.default_attributes
    }),
    Field::new("override attributes", |a, b| {
        a.override_attributes != b.override_attributes
    }),
];

pub struct RoleController<'a> {
    sources: Sources<'a>,
    dump: bool,
}

impl<'a> RoleController<'a> {
    pub fn new(sources: Sources<'a>) -> Self {
        Self {
            sources,
            dump: false,
        }
    }

    /// Write remote-only roles into the working copy
    pub fn dump_remote_only(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }
}

impl AlignmentController for RoleController<'_> {
    type Item = Role;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Role
    }

    fn check(&mut self, ctx: &mut AlignContext<'_>) -> Result<ApprovedSet<Role>> {
        let kind = self.kind();
        ctx.reporter.heading(kind.heading());

        let Some(local) = local_items(self.sources.repo.roles(), kind, ctx.reporter)? else {
            return Ok(ApprovedSet::empty(kind));
        };
        let local: BTreeMap<ItemKey, Role> = local
            .into_iter()
            .map(|(name, role)| (ItemKey::new(name), role))
            .collect();

        let client = self.sources.client;
        let names = client.backend().list_roles()?;
        let remote = remote_items(names.into_iter().map(ItemKey::new).collect(), &local, |key| {
            client.find_role(&key.name)
        })?;
        let outcome = compute(&local, &remote, |_, local, remote| {
            Ok(remote
                .as_ref()
                .and_then(|remote| changed_fields(local, remote, FIELDS)))
        })?;
        let Some(diff) = computed(outcome, kind, self.sources.repo, ctx.reporter) else {
            return Ok(ApprovedSet::empty(kind));
        };

        let repo = self.sources.repo;
        remote_only(kind, &diff.remote_only, self.dump, ctx.reporter, |key| {
            let role = client
                .find_role(&key.name)?
                .ok_or_else(|| anyhow!("{key} is no longer on the server"))?;
            Ok(repo.write_role(&role)?)
        });

        review(
            kind,
            diff.into_candidates(local),
            &self.sources.ignored,
            "Roles are up-to-date.",
            ctx,
        )
    }

    fn commit(
        &mut self,
        approved: ApprovedSet<Role>,
        ctx: &mut AlignContext<'_>,
    ) -> Result<CommitReport> {
        let client = self.sources.client;
        Ok(commit_each(approved, ctx, |candidate, _| {
            client.save_role(&candidate.item)?;
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignment::{IgnoreList, RecordingJournal, RecordingReporter, ScriptedPrompt};
    use chefkit::Client;
    use chefkit::backend::memory::MemoryBackend;
    use chefkit::local::MemoryRepo;
    use serde_json::json;
    use std::sync::Arc;

    fn role(name: &str, run_list: &[&str]) -> Role {
        let mut role = Role::new(name);
        role.run_list = run_list.iter().map(ToString::to_string).collect();
        role
    }

    #[test]
    fn test_run_list_change_is_the_only_reason() {
        let backend = Arc::new(MemoryBackend::new().with_role(role("web", &["r2"])));
        let client = Client::with_backend(Box::new(Arc::clone(&backend)));
        let mut local = role("web", &["r1"]);
        local.description = "not compared".into();
        let repo = MemoryRepo::new().with_role(local);

        let mut controller = RoleController::new(Sources {
            client: &client,
            repo: &repo,
            ignored: IgnoreList::default(),
        });
        let mut prompt = ScriptedPrompt::new(["Y"]);
        let mut reporter = RecordingReporter::default();
        let mut journal = RecordingJournal::default();
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        let approved = controller.check(&mut ctx).unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved.items[0].reasons(), vec!["run list"]);

        controller.commit(approved, &mut ctx).unwrap();
        assert!(reporter.contains("* web role is not up-to-date (run list)"));
        assert_eq!(backend.role("web").unwrap().run_list, vec!["r1"]);
        assert!(reporter.contains("* Updating web role"));
        assert_eq!(journal.entries, vec!["updating web role"]);
    }

    #[test]
    fn test_attribute_labels_and_ignore() {
        let mut remote_db = role("db", &[]);
        remote_db.override_attributes = json!({"replicas": 2});
        let mut remote_web = role("web", &[]);
        remote_web.default_attributes = json!({"port": 80});
        let client = Client::with_backend(Box::new(
            MemoryBackend::new().with_role(remote_db).with_role(remote_web),
        ));
        let repo = MemoryRepo::new().with_role(role("db", &[])).with_role(role("web", &[]));

        let mut controller = RoleController::new(Sources {
            client: &client,
            repo: &repo,
            ignored: IgnoreList::new(["web"]),
        });
        let mut prompt = ScriptedPrompt::new(["N"]);
        let mut reporter = RecordingReporter::default();
        let mut journal = RecordingJournal::default();
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        assert!(controller.check(&mut ctx).unwrap().is_empty());
        assert!(reporter.contains("* db role is not up-to-date (override attributes)"));
        assert!(reporter.contains("* web role is not up-to-date (default attributes) (ignored)"));
        assert!(reporter.contains("* Skipping db role"));
        assert_eq!(prompt.asked.len(), 1);
    }

    #[test]
    fn test_remote_only_role_is_dumped() {
        let client = Client::with_backend(Box::new(MemoryBackend::new().with_role(role("ops", &[]))));
        let repo = MemoryRepo::new().with_role(role("web", &[]));

        let mut controller = RoleController::new(Sources {
            client: &client,
            repo: &repo,
            ignored: IgnoreList::default(),
        })
        .dump_remote_only(true);
        let mut prompt = ScriptedPrompt::new(["Q"]);
        let mut reporter = RecordingReporter::default();
        let mut journal = RecordingJournal::default();
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        controller.check(&mut ctx).unwrap();
        assert!(reporter.contains("* ops role is remote only"));
        assert_eq!(repo.written(), vec!["roles/ops"]);
        assert!(reporter.contains("* Aborting role alignment."));
    }

    #[test]
    fn test_missing_role_directory() {
        let client = Client::with_backend(Box::new(MemoryBackend::new()));
        let mut repo = MemoryRepo::new();
        repo.roles = None;

        let mut controller = RoleController::new(Sources {
            client: &client,
            repo: &repo,
            ignored: IgnoreList::default(),
        });
        let mut prompt = ScriptedPrompt::default();
        let mut reporter = RecordingReporter::default();
        let mut journal = RecordingJournal::default();
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        assert!(controller.check(&mut ctx).unwrap().is_empty());
        assert!(reporter.contains("Bad role path, skipping role sync."));
    }
}
