//! Cookbook alignment: pin local cookbook versions in one environment.

use super::{Sources, computed, local_items};
use crate::error::PreconditionError;
use crate::progress;
use crate::rollback::{RollbackSnapshot, RollbackStore};
use alignment::{
    AlignContext, AlignmentController, ApprovedSet, Bump, CandidateStatus, CommitOutcome,
    CommitReport, ItemKey, ResourceKind, compare_versions, compute, review,
};
use anyhow::{Context, Result};
use chefkit::{Cookbook, VersionConstraint};
use std::collections::BTreeMap;

/// Compares local cookbook versions with an environment's pins.
///
/// Every approved cookbook is uploaded in one batch and the environment is
/// saved once, so the kind succeeds or fails as a whole.
pub struct CookbookController<'a> {
    sources: Sources<'a>,
    environment: String,
    force: bool,
    rollback: Option<RollbackStore>,
}

impl<'a> CookbookController<'a> {
    pub fn new(sources: Sources<'a>, environment: impl Into<String>) -> Self {
        Self {
            sources,
            environment: environment.into(),
            force: false,
            rollback: None,
        }
    }

    /// Also propose local versions older than the pin
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Record the previous pins of every bump in `store`
    pub fn rollback(mut self, store: Option<RollbackStore>) -> Self {
        self.rollback = store;
        self
    }

    fn upload(&self, cookbooks: &[Cookbook], names: &str) -> Result<()> {
        let pb = progress::spinner(&format!("Uploading {names}"));
        match self.sources.client.upload_cookbooks(cookbooks) {
            Ok(()) => {
                progress::finish_success(&pb, &format!("Uploaded {names}"));
                Ok(())
            }
            Err(e) => {
                progress::finish_error(&pb, &format!("Upload of {names} failed"));
                Err(alignment::Error::Commit {
                    key: names.to_string(),
                    message: e.to_string(),
                }
                .into())
            }
        }
    }
}

impl AlignmentController for CookbookController<'_> {
    type Item = Cookbook;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Cookbook
    }

    fn check(&mut self, ctx: &mut AlignContext<'_>) -> Result<ApprovedSet<Cookbook>> {
        let kind = self.kind();
        ctx.reporter.heading(kind.heading());

        let Some(local) = local_items(self.sources.repo.cookbooks(), kind, ctx.reporter)? else {
            return Ok(ApprovedSet::empty(kind));
        };
        let local: BTreeMap<ItemKey, Cookbook> = local
            .into_iter()
            .map(|(name, cookbook)| (ItemKey::new(name), cookbook))
            .collect();

        let environment = self
            .sources
            .client
            .find_environment(&self.environment)?
            .ok_or_else(|| PreconditionError::UnknownEnvironment(self.environment.clone()))?;
        let pinned: BTreeMap<ItemKey, String> = environment
            .cookbook_versions
            .iter()
            .map(|(name, raw)| (ItemKey::new(name), VersionConstraint::parse(raw).version))
            .collect();

        let force = self.force;
        let outcome = compute(&local, &pinned, |key, cookbook, remote| {
            compare_versions(&key.name, &cookbook.version, remote, force)
        })?;
        let Some(diff) = computed(outcome, kind, self.sources.repo, ctx.reporter) else {
            return Ok(ApprovedSet::empty(kind));
        };

        let candidates = diff
            .into_candidates(local)
            .into_iter()
            .map(|candidate| {
                let version = candidate.item.version.clone();
                candidate.with_target(version)
            })
            .collect();

        review(
            kind,
            candidates,
            &self.sources.ignored,
            &format!("Environment {} is up-to-date.", self.environment),
            ctx,
        )
    }

    fn commit(
        &mut self,
        approved: ApprovedSet<Cookbook>,
        ctx: &mut AlignContext<'_>,
    ) -> Result<CommitReport> {
        let client = self.sources.client;
        let mut environment = client
            .environment(&self.environment)
            .with_context(|| format!("Could not load environment {}", self.environment))?;

        // pins as they were before this run; cookbooks new to the environment have none
        let mut previous = BTreeMap::new();
        for candidate in &approved.items {
            let name = &candidate.key.name;
            if let Some(raw) = environment.cookbook_versions.get(name) {
                previous.insert(name.clone(), raw.clone());
            }
            environment.pin(name, &candidate.item.version);
        }

        let cookbooks: Vec<Cookbook> = approved.items.iter().map(|c| c.item.clone()).collect();
        let names = cookbooks
            .iter()
            .map(|cb| cb.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        ctx.reporter.item(&format!("* Uploading cookbook(s) {names}"));
        self.upload(&cookbooks, &names)?;

        client
            .save_environment(&environment)
            .map_err(|e| alignment::Error::Commit {
                key: format!("environment {}", environment.name),
                message: e.to_string(),
            })?;

        let mut report = CommitReport::default();
        for candidate in &approved.items {
            let bump = Bump {
                cookbook: candidate.key.name.clone(),
                version: candidate.item.version.clone(),
                environment: environment.name.clone(),
            };
            let action = format!(
                "bumping {} to {} for environment {}",
                bump.cookbook, bump.version, bump.environment
            );
            ctx.reporter.item(&format!(
                "* Bumping {} to {} for environment {}",
                bump.cookbook, bump.version, bump.environment
            ));
            ctx.journal.record(&action);
            ctx.journal.bumped(&bump);

            report.add_outcome(match candidate.status {
                CandidateStatus::LocalOnly => CommitOutcome::Created,
                CandidateStatus::Changed(_) => CommitOutcome::Updated,
            });
        }

        if let Some(store) = &self.rollback {
            let snapshot = RollbackSnapshot::now(environment.name.clone(), previous);
            match store.save(&snapshot) {
                Ok(identifier) => log::info!("saved rollback point {identifier}"),
                Err(e) => ctx
                    .reporter
                    .error(&format!("Unable to save rollback point ({e:#})")),
            }
        }

        Ok(report)
    }
}
