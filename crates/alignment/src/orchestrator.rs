//! Runs the selected controllers: check everything, confirm once, commit everything

use crate::context::AlignContext;
use crate::controller::AlignmentController;
use crate::types::{ApprovedSet, CommitReport, ResourceKind};
use anyhow::Result;

/// Question asked once every kind has been checked
pub const PROCEED_QUESTION: &str = "> Proceed ";

/// Object-safe view of a controller plus its pending approved set
pub trait Stage {
    fn kind(&self) -> ResourceKind;

    /// Run the controller's check and keep the result; returns the number approved
    fn check(&mut self, ctx: &mut AlignContext<'_>) -> Result<usize>;

    /// Commit whatever `check` approved
    fn commit(&mut self, ctx: &mut AlignContext<'_>) -> Result<CommitReport>;
}

/// A controller waiting between its check and its commit
pub struct Pending<C: AlignmentController> {
    controller: C,
    approved: Option<ApprovedSet<C::Item>>,
}

impl<C: AlignmentController> Pending<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            approved: None,
        }
    }
}

impl<C: AlignmentController> Stage for Pending<C> {
    fn kind(&self) -> ResourceKind {
        self.controller.kind()
    }

    fn check(&mut self, ctx: &mut AlignContext<'_>) -> Result<usize> {
        let approved = self.controller.check(ctx)?;
        let count = approved.len();
        self.approved = Some(approved);
        Ok(count)
    }

    fn commit(&mut self, ctx: &mut AlignContext<'_>) -> Result<CommitReport> {
        match self.approved.take() {
            Some(approved) if !approved.is_empty() => self.controller.commit(approved, ctx),
            _ => Ok(CommitReport::default()),
        }
    }
}

/// Where an align run stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Checking(ResourceKind),
    AwaitFinalConfirmation,
    Committing(ResourceKind),
    Done,
    /// Every check came back empty
    NothingToDo,
    /// The operator refused the final confirmation
    Declined,
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    NothingToDo,
    Declined,
    Completed(CommitReport),
}

/// Sequences controllers through check, one aggregate confirmation, and commit
pub struct Orchestrator<'a> {
    stages: Vec<Box<dyn Stage + 'a>>,
    phase: Phase,
}

impl<'a> Orchestrator<'a> {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            phase: Phase::Init,
        }
    }

    /// Register a controller
    pub fn add<C>(&mut self, controller: C)
    where
        C: AlignmentController + 'a,
    {
        self.stages.push(Box::new(Pending::new(controller)));
    }

    /// Register an already-wrapped stage
    pub fn add_stage(&mut self, stage: Box<dyn Stage + 'a>) {
        self.stages.push(stage);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Kinds registered, in the order they will run
    pub fn kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<ResourceKind> = self.stages.iter().map(|s| s.kind()).collect();
        kinds.sort();
        kinds
    }

    /// Run the whole align sequence.
    ///
    /// A failed check is reported and that kind contributes nothing. A
    /// failed commit is reported and the next kind still runs.
    pub fn run(&mut self, ctx: &mut AlignContext<'_>) -> Result<RunOutcome> {
        self.stages.sort_by_key(|stage| stage.kind());

        let mut pending = 0;
        for stage in &mut self.stages {
            let kind = stage.kind();
            self.phase = Phase::Checking(kind);
            match stage.check(ctx) {
                Ok(count) => pending += count,
                Err(e) => ctx
                    .reporter
                    .error(&format!("Unable to check {kind}: {e:#}")),
            }
        }

        if pending == 0 {
            self.phase = Phase::NothingToDo;
            ctx.reporter.item("Nothing else to do");
            return Ok(RunOutcome::NothingToDo);
        }

        self.phase = Phase::AwaitFinalConfirmation;
        if !ctx.prompt.confirm(PROCEED_QUESTION, false)? {
            self.phase = Phase::Declined;
            ctx.reporter.item("Aborting.");
            return Ok(RunOutcome::Declined);
        }

        let mut report = CommitReport::default();
        for stage in &mut self.stages {
            let kind = stage.kind();
            self.phase = Phase::Committing(kind);
            match stage.commit(ctx) {
                Ok(stage_report) => report.merge(&stage_report),
                Err(e) => {
                    ctx.reporter
                        .error(&format!("Unable to align {kind}: {e:#}"));
                    report.failed += 1;
                    report.failures.push((kind.to_string(), format!("{e:#}")));
                }
            }
        }

        self.phase = Phase::Done;
        Ok(RunOutcome::Completed(report))
    }
}

impl Default for Orchestrator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{NoJournal, RecordingReporter, ScriptedPrompt};
    use crate::types::{CandidateStatus, CommitOutcome, ItemKey, UpdateCandidate};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Fake {
        kind: ResourceKind,
        approve: usize,
        fail_commit: bool,
        log: Log,
    }

    impl AlignmentController for Fake {
        type Item = ();

        fn kind(&self) -> ResourceKind {
            self.kind
        }

        fn check(&mut self, _ctx: &mut AlignContext<'_>) -> Result<ApprovedSet<()>> {
            self.log.borrow_mut().push(format!("check {}", self.kind));
            let items = (0..self.approve)
                .map(|i| {
                    UpdateCandidate::new(ItemKey::new(i.to_string()), (), CandidateStatus::LocalOnly)
                })
                .collect();
            Ok(ApprovedSet::new(self.kind, items))
        }

        fn commit(
            &mut self,
            approved: ApprovedSet<()>,
            _ctx: &mut AlignContext<'_>,
        ) -> Result<CommitReport> {
            self.log.borrow_mut().push(format!("commit {}", self.kind));
            if self.fail_commit {
                anyhow::bail!("environment save failed");
            }
            let mut report = CommitReport::default();
            for _ in approved.items {
                report.add_outcome(CommitOutcome::Updated);
            }
            Ok(report)
        }
    }

    fn fake(kind: ResourceKind, approve: usize, log: &Log) -> Fake {
        Fake {
            kind,
            approve,
            fail_commit: false,
            log: Rc::clone(log),
        }
    }

    #[test]
    fn test_runs_in_fixed_kind_order() {
        let log: Log = Rc::default();
        let mut orchestrator = Orchestrator::new();
        orchestrator.add(fake(ResourceKind::Environment, 1, &log));
        orchestrator.add(fake(ResourceKind::Cookbook, 1, &log));
        orchestrator.add(fake(ResourceKind::Role, 1, &log));
        orchestrator.add(fake(ResourceKind::DataBag, 1, &log));

        let mut prompt = ScriptedPrompt::new(["Y"]);
        let mut reporter = RecordingReporter::default();
        let mut journal = NoJournal;
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        let outcome = orchestrator.run(&mut ctx).unwrap();
        assert!(matches!(outcome, RunOutcome::Completed(ref r) if r.updated == 4));
        assert_eq!(orchestrator.phase(), Phase::Done);
        assert_eq!(
            *log.borrow(),
            vec![
                "check cookbooks",
                "check data bags",
                "check roles",
                "check environments",
                "commit cookbooks",
                "commit data bags",
                "commit roles",
                "commit environments",
            ]
        );
    }

    #[test]
    fn test_nothing_to_do_skips_confirmation() {
        let log: Log = Rc::default();
        let mut orchestrator = Orchestrator::new();
        orchestrator.add(fake(ResourceKind::Role, 0, &log));

        let mut prompt = ScriptedPrompt::default();
        let mut reporter = RecordingReporter::default();
        let mut journal = NoJournal;
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        let outcome = orchestrator.run(&mut ctx).unwrap();
        assert!(matches!(outcome, RunOutcome::NothingToDo));
        assert_eq!(orchestrator.phase(), Phase::NothingToDo);
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn test_declined_commits_nothing() {
        let log: Log = Rc::default();
        let mut orchestrator = Orchestrator::new();
        orchestrator.add(fake(ResourceKind::Role, 2, &log));

        let mut prompt = ScriptedPrompt::new(["n"]);
        let mut reporter = RecordingReporter::default();
        let mut journal = NoJournal;
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        let outcome = orchestrator.run(&mut ctx).unwrap();
        assert!(matches!(outcome, RunOutcome::Declined));
        assert_eq!(prompt.asked, vec![PROCEED_QUESTION]);
        assert!(!log.borrow().iter().any(|l| l.starts_with("commit")));
    }

    #[test]
    fn test_failed_kind_does_not_stop_the_next() {
        let log: Log = Rc::default();
        let mut orchestrator = Orchestrator::new();
        let mut cookbooks = fake(ResourceKind::Cookbook, 1, &log);
        cookbooks.fail_commit = true;
        orchestrator.add(cookbooks);
        orchestrator.add(fake(ResourceKind::Role, 1, &log));

        let mut prompt = ScriptedPrompt::new(["y"]);
        let mut reporter = RecordingReporter::default();
        let mut journal = NoJournal;
        let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);

        let outcome = orchestrator.run(&mut ctx).unwrap();
        let RunOutcome::Completed(report) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 1);
        assert!(reporter.contains("Unable to align cookbooks: environment save failed"));
        assert!(log.borrow().contains(&"commit roles".to_string()));
    }
}
