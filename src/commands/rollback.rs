//! `sharp rollback --list | --show <id> | --to <id>`

use crate::Context;
use crate::cli::RollbackArgs;
use crate::config::SharpConfig;
use crate::error::ConfigError;
use crate::journal::{AuditLog, SharpJournal};
use crate::notify::Notifiers;
use crate::prompt::TerminalPrompt;
use crate::rollback::{RollbackSnapshot, RollbackStore, format_identifier};
use crate::server_context::KnifeDir;
use crate::ui::TerminalReporter;
use alignment::{Journal, Prompt, Reporter};
use anyhow::Result;
use chefkit::Client;

pub fn run(ctx: &Context, args: RollbackArgs) -> Result<()> {
    let config = SharpConfig::load()?;
    let store = config
        .rollback_destination()
        .map(RollbackStore::new)
        .ok_or(ConfigError::RollbackDisabled)?;
    let mut reporter = TerminalReporter::new(ctx.verbose > 0);

    if args.list {
        return list(&store, &mut reporter);
    }
    if let Some(identifier) = args.show {
        return show(&store, identifier, &mut reporter);
    }
    if let Some(identifier) = args.to {
        let connection = KnifeDir::open()?.connection()?;
        let node_name = connection.node_name.as_deref();
        let client = Client::http(&connection.server_url, node_name.unwrap_or_default());
        let audit = AuditLog::new(config.log_destination(), AuditLog::user_for(node_name));
        let mut journal = SharpJournal::new(audit, Notifiers::default());
        return rollback_to(
            &store,
            identifier,
            &client,
            &mut TerminalPrompt,
            &mut reporter,
            &mut journal,
        )
        .map(|_| ());
    }
    Ok(())
}

/// Print every point with its time
pub fn list(store: &RollbackStore, reporter: &mut dyn Reporter) -> Result<()> {
    reporter.item("Available rollback points :");
    for identifier in store.list()? {
        reporter.item(&format!("  * {identifier} ({})", format_identifier(identifier)));
    }
    Ok(())
}

/// Print what a point would restore
pub fn show(store: &RollbackStore, identifier: u64, reporter: &mut dyn Reporter) -> Result<()> {
    let snapshot = store.load(identifier)?;
    describe(&snapshot, reporter);
    Ok(())
}

fn describe(snapshot: &RollbackSnapshot, reporter: &mut dyn Reporter) {
    reporter.item("Rollback point has the following informations :");
    reporter.item(&format!("  environment : {}", snapshot.environment));
    reporter.item("  cookbooks versions :");
    for (cookbook, version) in &snapshot.cookbook_versions {
        reporter.item(&format!("   * {cookbook} => {version}"));
    }
}

/// Show a point, ask, then restore its pins.
///
/// Returns whether the environment was saved.
pub fn rollback_to(
    store: &RollbackStore,
    identifier: u64,
    client: &Client,
    prompt: &mut dyn Prompt,
    reporter: &mut dyn Reporter,
    journal: &mut dyn Journal,
) -> Result<bool> {
    let snapshot = store.load(identifier)?;
    describe(&snapshot, reporter);

    let answer = prompt.ask("Continue rollback ? Y/(N) ", "N")?;
    if !answer.trim().eq_ignore_ascii_case("y") {
        reporter.item("Aborting !");
        return Ok(false);
    }

    let restored = store.restore_to(identifier, client, reporter)?;
    journal.record(&format!(
        "rolled back environment {} to point {identifier}",
        restored.environment
    ));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignment::{RecordingJournal, RecordingReporter, ScriptedPrompt};
    use chefkit::Environment;
    use chefkit::backend::memory::MemoryBackend;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_with_point(dir: &TempDir) -> RollbackStore {
        let store = RollbackStore::new(dir.path());
        store
            .save(&RollbackSnapshot {
                identifier: 1_700_000_000,
                environment: "prod".into(),
                cookbook_versions: BTreeMap::from([("A".to_string(), "1.1.0".to_string())]),
            })
            .unwrap();
        store
    }

    fn bumped_prod() -> Environment {
        let mut env = Environment::new("prod");
        env.pin("A", "1.9.0");
        env.pin("B", "2.0.0");
        env
    }

    #[test]
    fn test_list_and_show() {
        let dir = TempDir::new().unwrap();
        let store = store_with_point(&dir);
        let mut reporter = RecordingReporter::default();

        list(&store, &mut reporter).unwrap();
        assert!(reporter.contains("Available rollback points :"));
        assert!(reporter.contains("  * 1700000000 ("));

        show(&store, 1_700_000_000, &mut reporter).unwrap();
        assert!(reporter.contains("  environment : prod"));
        assert!(reporter.contains("   * A => 1.1.0"));
    }

    #[test]
    fn test_show_missing_point() {
        let dir = TempDir::new().unwrap();
        let store = RollbackStore::new(dir.path());
        let err = show(&store, 42, &mut RecordingReporter::default()).unwrap_err();
        assert_eq!(err.to_string(), "could not load rollback point 42");
    }

    #[test]
    fn test_rollback_to_restores_recorded_pins() {
        let dir = TempDir::new().unwrap();
        let store = store_with_point(&dir);
        let backend = Arc::new(MemoryBackend::new().with_environment(bumped_prod()));
        let client = Client::with_backend(Box::new(Arc::clone(&backend)));

        let mut prompt = ScriptedPrompt::new(["y"]);
        let mut reporter = RecordingReporter::default();
        let mut journal = RecordingJournal::default();
        let applied = rollback_to(
            &store,
            1_700_000_000,
            &client,
            &mut prompt,
            &mut reporter,
            &mut journal,
        )
        .unwrap();

        assert!(applied);
        let env = backend.environment("prod").unwrap();
        assert_eq!(env.cookbook_versions["A"], "1.1.0");
        assert_eq!(env.cookbook_versions["B"], "= 2.0.0");
        assert!(reporter.contains("Setting A to version 1.1.0"));
        assert_eq!(prompt.asked, vec!["Continue rollback ? Y/(N) "]);
        assert_eq!(journal.entries.len(), 1);
    }

    #[test]
    fn test_rollback_declined() {
        let dir = TempDir::new().unwrap();
        let store = store_with_point(&dir);
        let backend = Arc::new(MemoryBackend::new().with_environment(bumped_prod()));
        let client = Client::with_backend(Box::new(Arc::clone(&backend)));

        let mut reporter = RecordingReporter::default();
        let applied = rollback_to(
            &store,
            1_700_000_000,
            &client,
            &mut ScriptedPrompt::default(),
            &mut reporter,
            &mut RecordingJournal::default(),
        )
        .unwrap();

        assert!(!applied);
        assert!(reporter.contains("Aborting !"));
        assert_eq!(backend.environment("prod").unwrap().cookbook_versions["A"], "= 1.9.0");
    }
}
