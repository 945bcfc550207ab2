//! `sharp align <branch> <environment>`

use crate::Context;
use crate::cli::AlignArgs;
use crate::config::SharpConfig;
use crate::controllers::{
    CookbookController, DataBagController, EnvironmentController, RoleController, Sources,
};
use crate::error::PreconditionError;
use crate::journal::{AuditLog, SharpJournal};
use crate::notify::Notifiers;
use crate::prompt::TerminalPrompt;
use crate::rollback::RollbackStore;
use crate::runner;
use crate::server_context::KnifeDir;
use crate::ui::{self, TerminalReporter};
use alignment::{AlignContext, Orchestrator, ResourceKind, RunOutcome};
use anyhow::Result;
use chefkit::Client;
use chefkit::local::{FsRepo, LocalRepo};
use std::path::Path;

/// What one align run covers
#[derive(Debug, Clone)]
pub struct AlignOptions {
    pub environment: String,
    pub kinds: Vec<ResourceKind>,
    pub force: bool,
    pub dump_remote_only: bool,
    pub rollback: Option<RollbackStore>,
}

impl AlignOptions {
    pub fn new(environment: impl Into<String>, kinds: Vec<ResourceKind>) -> Self {
        Self {
            environment: environment.into(),
            kinds,
            force: false,
            dump_remote_only: false,
            rollback: None,
        }
    }
}

/// Kinds chosen by the `-C/-D/-R/-N` flags; all of them when none is given
pub fn selected_kinds(args: &AlignArgs) -> Vec<ResourceKind> {
    let flags = [
        (args.cookbooks, ResourceKind::Cookbook),
        (args.databags, ResourceKind::DataBag),
        (args.roles, ResourceKind::Role),
        (args.environments, ResourceKind::Environment),
    ];
    let chosen: Vec<ResourceKind> = flags
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, kind)| *kind)
        .collect();
    if chosen.is_empty() {
        ResourceKind::ALL.to_vec()
    } else {
        chosen
    }
}

/// Fail unless the checkout at `repo` is on `expected`
pub fn ensure_branch(repo: &Path, expected: &str) -> Result<()> {
    let actual = runner::current_branch(repo)?;
    if actual != expected {
        return Err(PreconditionError::WrongBranch {
            expected: expected.to_string(),
            actual,
        }
        .into());
    }
    Ok(())
}

pub fn run(ctx: &Context, args: AlignArgs) -> Result<()> {
    let config = SharpConfig::load()?;
    let connection = KnifeDir::open()?.connection()?;

    ensure_branch(&config.git_cookbook_path()?, &args.branch)?;

    let node_name = connection.node_name.as_deref();
    let client = Client::http(&connection.server_url, node_name.unwrap_or_default());
    let repo = FsRepo::new(config.repo_paths()?);

    let audit = AuditLog::new(config.log_destination(), AuditLog::user_for(node_name));
    match audit.path() {
        Some(path) => log::info!("audit log: {}", path.display()),
        None => log::info!("audit log disabled"),
    }
    let notifiers = Notifiers::from_config(&config.notification, ctx.quiet);
    if notifiers.is_empty() {
        log::debug!("no notification carrier enabled");
    }
    let mut journal = SharpJournal::new(audit, notifiers);
    let mut prompt = TerminalPrompt;
    let mut reporter = TerminalReporter::new(ctx.verbose > 0);
    let mut align_ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

    let server = connection
        .server
        .clone()
        .unwrap_or_else(|| connection.server_url.clone());
    ui::heading(&format!("On server {server}"));

    let options = AlignOptions {
        force: args.force,
        dump_remote_only: args.dump_remote_only,
        rollback: config.rollback_destination().map(RollbackStore::new),
        ..AlignOptions::new(&args.environment, selected_kinds(&args))
    };

    let outcome = align(
        &client,
        &repo,
        &config,
        connection.server.as_deref(),
        &options,
        &mut align_ctx,
    )?;

    if let RunOutcome::Completed(report) = outcome {
        if report.is_success() {
            ui::success(&format!("{} change(s) pushed", report.total_changes()));
        } else {
            ui::warn(&format!(
                "{} change(s) pushed, {} failed",
                report.total_changes(),
                report.failed
            ));
        }
    }
    Ok(())
}

/// Check every selected kind, confirm once, then commit.
pub fn align(
    client: &Client,
    repo: &dyn LocalRepo,
    config: &SharpConfig,
    server: Option<&str>,
    options: &AlignOptions,
    ctx: &mut AlignContext<'_>,
) -> Result<RunOutcome> {
    let sources = |kind| Sources {
        client,
        repo,
        ignored: config.ignore_list(server, kind),
    };

    let mut orchestrator = Orchestrator::new();
    for kind in &options.kinds {
        match kind {
            ResourceKind::Cookbook => orchestrator.add(
                CookbookController::new(sources(ResourceKind::Cookbook), &options.environment)
                    .force(options.force)
                    .rollback(options.rollback.clone()),
            ),
            ResourceKind::DataBag => orchestrator.add(
                DataBagController::new(sources(ResourceKind::DataBag))
                    .dump_remote_only(options.dump_remote_only),
            ),
            ResourceKind::Role => orchestrator.add(
                RoleController::new(sources(ResourceKind::Role))
                    .dump_remote_only(options.dump_remote_only),
            ),
            ResourceKind::Environment => {
                orchestrator.add(EnvironmentController::new(sources(ResourceKind::Environment)))
            }
        }
    }

    log::debug!("aligning {:?}", orchestrator.kinds());
    orchestrator.run(ctx)
}
