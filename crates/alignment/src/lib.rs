//! # Alignment
//!
//! Reconcile a local working copy with the state held by a remote
//! configuration server.
//!
//! ## Core Concepts
//!
//! - **Diff**: local-only, remote-only and changed keys between two collections
//! - **IgnoreList**: names a server context never wants pushed
//! - **Decision**: the Y/N/All/Quit protocol turning candidates into an approved set
//! - **AlignmentController**: check and commit for one resource kind
//! - **Orchestrator**: checks every kind, asks once, then commits every kind
//!
//! ## Example
//!
//! ```ignore
//! use alignment::{AlignContext, Orchestrator, RecordingReporter, ScriptedPrompt, NoJournal};
//!
//! let mut orchestrator = Orchestrator::new();
//! orchestrator.add(role_controller);
//! orchestrator.add(cookbook_controller);
//!
//! let mut prompt = ScriptedPrompt::new(["A", "Y"]);
//! let mut reporter = RecordingReporter::default();
//! let mut journal = NoJournal;
//! let mut ctx = AlignContext::new(&mut prompt, &mut reporter, &mut journal);
//!
//! let outcome = orchestrator.run(&mut ctx)?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`Prompt`]: operator answers
//! - [`Reporter`]: progress lines
//! - [`Journal`]: audit log and bump notifications

pub mod context;
pub mod controller;
pub mod decision;
pub mod diff;
pub mod error;
pub mod ignore;
pub mod orchestrator;
pub mod types;

pub use context::{
    AlignContext, AutoApprove, AutoDecline, Bump, Journal, Level, NoJournal, Prompt,
    RecordingJournal, RecordingReporter, Reporter, ScriptedPrompt, SilentReporter,
};
pub use controller::{AlignmentController, review};
pub use decision::{Answer, Decision, DecisionState, Verdict, resolve, resolve_with};
pub use diff::{
    Diff, DiffOutcome, Field, changed_content, changed_fields, compare_versions, compute,
    order_versions, parse_version,
};
pub use error::{Error, Result};
pub use ignore::{IgnoreList, filter};
pub use orchestrator::{Orchestrator, Pending, Phase, RunOutcome, Stage};
pub use types::{
    ApprovedSet, CandidateStatus, ChangeInfo, CommitOutcome, CommitReport, ItemKey,
    ResourceKind, UpdateCandidate, VersionVerdict,
};
