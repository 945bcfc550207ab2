//! Per-kind controllers and the review loop they share

use crate::context::AlignContext;
use crate::decision::{Verdict, resolve_with};
use crate::ignore::{IgnoreList, filter};
use crate::types::{ApprovedSet, CommitReport, ResourceKind, UpdateCandidate};
use anyhow::Result;

/// Diff, filter, decide and commit for one resource kind.
///
/// `check` gathers the operator's per-item decisions; `commit` pushes the
/// approved items once the run as a whole has been confirmed.
pub trait AlignmentController {
    /// The object saved for each approved candidate
    type Item;

    fn kind(&self) -> ResourceKind;

    /// Compare local and remote state and ask which differences to push
    fn check(&mut self, ctx: &mut AlignContext<'_>) -> Result<ApprovedSet<Self::Item>>;

    /// Push the approved items.
    ///
    /// Per-item failures belong in the report. An `Err` means the kind as a
    /// whole failed.
    fn commit(
        &mut self,
        approved: ApprovedSet<Self::Item>,
        ctx: &mut AlignContext<'_>,
    ) -> Result<CommitReport>;
}

/// Show every candidate, drop ignored ones and run the decision protocol.
///
/// Ignored candidates are listed with an ` (ignored)` suffix and never
/// reach the prompt. `up_to_date` is printed when nothing is left to ask.
pub fn review<T>(
    kind: ResourceKind,
    candidates: Vec<UpdateCandidate<T>>,
    ignored: &IgnoreList,
    up_to_date: &str,
    ctx: &mut AlignContext<'_>,
) -> Result<ApprovedSet<T>> {
    for candidate in &candidates {
        let suffix = if ignored.contains(&candidate.key) {
            " (ignored)"
        } else {
            ""
        };
        ctx.reporter
            .item(&format!("* {}{}", candidate.describe(kind), suffix));
    }

    let (kept, _) = filter(candidates, ignored);
    if kept.is_empty() {
        ctx.reporter.item(&format!("* {up_to_date}"));
        return Ok(ApprovedSet::empty(kind));
    }

    let AlignContext {
        prompt, reporter, ..
    } = ctx;

    let approved = resolve_with(
        kept,
        &mut **prompt,
        |candidate| candidate.question(kind),
        |candidate, verdict| match verdict {
            Verdict::Approve => {}
            Verdict::Skip => {
                reporter.item(&format!("* Skipping {} {}", candidate.key, kind.noun()));
            }
            Verdict::Stop => {
                reporter.item(&format!("* Aborting {} alignment.", kind.label()));
            }
        },
    )?;

    Ok(ApprovedSet::new(kind, approved))
}
