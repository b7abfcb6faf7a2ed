//! 运行编排 - 一次校验运行的完整流程
//!
//! 1. validate item limit and selection criteria (no storage touched)
//! 2. reconcile: create status records for bitstreams that have none
//! 3. walk the candidate cursor, applying the action to each id
//! 4. stop at the item limit or when candidates run out
//!
//! Per-bitstream verification problems are results, not errors. Storage
//! failures while selecting or recording abort the run.

use super::recorder::ResultRecorder;
use super::report::{ProgressReporter, RunSummary};
use super::selection::{SelectionCriteria, SelectionFilter};
use super::verifier::VerificationEngine;
use crate::bitstore::BitstreamStore;
use crate::db::MetadataRepository;
use crate::scope;
use crate::utils::{CheckerError, CheckerResult};
use serde::Serialize;
use shared::error::ErrorCode;
use shared::util::now_millis;
use shared::{DsoRef, MostRecentChecksum};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// 运行动作
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Verify and record
    #[default]
    Check,
    /// Report current status only
    Print,
    /// Reported, not implemented
    History,
    /// Reported, not implemented
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Check, Action::Print, Action::History, Action::Delete];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::Check => "check",
            Action::Print => "print",
            Action::History => "history",
            Action::Delete => "delete",
        }
    }

    /// Actions that only emit placeholder rows
    pub fn is_implemented(&self) -> bool {
        matches!(self, Action::Check | Action::Print)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CheckerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                CheckerError::configuration(
                    ErrorCode::UnknownAction,
                    format!("Unknown do action {}", wanted),
                )
            })
    }
}

/// 校验运行器
pub struct ChecksumWorker {
    repo: Arc<dyn MetadataRepository>,
    selection: SelectionFilter,
    engine: VerificationEngine,
    recorder: ResultRecorder,
}

impl ChecksumWorker {
    pub fn new(
        repo: Arc<dyn MetadataRepository>,
        store: Arc<dyn BitstreamStore>,
        page_size: usize,
    ) -> Self {
        Self {
            selection: SelectionFilter::new(Arc::clone(&repo), page_size),
            engine: VerificationEngine::new(Arc::clone(&repo), store),
            recorder: ResultRecorder::new(Arc::clone(&repo)),
            repo,
        }
    }

    /// Execute one run and report to `out`.
    ///
    /// `item_limit` of `None` means no limit; `Some(0)` is rejected.
    pub fn run<W: Write>(
        &self,
        action: Action,
        criteria: &SelectionCriteria,
        item_limit: Option<usize>,
        verbose: bool,
        out: W,
    ) -> CheckerResult<RunSummary> {
        if item_limit == Some(0) {
            return Err(CheckerError::configuration(
                ErrorCode::InvalidItemLimit,
                "Item limit must be a positive number",
            ));
        }
        criteria.validate()?;

        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("checksum_run", run_id = %run_id, action = %action);
        let _guard = span.enter();

        let mut summary = RunSummary::new(run_id, action, now_millis());
        let mut reporter = ProgressReporter::new(out, verbose);
        reporter.comment(criteria)?;
        reporter.comment(format!("Action {}", action))?;

        tracing::info!(criteria = %criteria, limit = ?item_limit, "Checksum run started");

        reporter.comment(format!(
            "Start check for new bitstreams: {}",
            chrono::Local::now().to_rfc3339()
        ))?;
        summary.reconciled = self.repo.reconcile_missing()?;
        reporter.comment(format!(
            "Done check for new bitstreams: {}",
            chrono::Local::now().to_rfc3339()
        ))?;
        if summary.reconciled > 0 {
            tracing::info!(count = summary.reconciled, "Created status records for new bitstreams");
        }

        let candidates = self.selection.select(criteria)?;
        for (row, candidate) in candidates.enumerate() {
            let bitstream_id = candidate?;

            match action {
                Action::Check => {
                    let attempt = self.engine.verify(bitstream_id);
                    if verbose {
                        reporter.line(attempt.to_long_string())?;
                    }
                    self.recorder.record(&attempt)?;
                    if attempt.result.is_failure() {
                        tracing::warn!(bitstream_id, result = %attempt.result, "Checksum verification failed");
                    }
                    summary.record(attempt.result);
                }
                Action::Print => {}
                Action::History | Action::Delete => {
                    reporter.unimplemented(row, bitstream_id, action)?;
                    summary.unimplemented += 1;
                }
            }

            if verbose || action == Action::Print {
                let status = self.print_bitstream(&mut reporter, row, bitstream_id)?;
                if action == Action::Print {
                    match status.and_then(|s| s.result) {
                        Some(result) => summary.record(result),
                        None => summary.unchecked += 1,
                    }
                }
            } else {
                reporter.marker()?;
            }

            summary.total += 1;
            if item_limit.is_some_and(|limit| summary.total >= limit) {
                tracing::debug!(limit = ?item_limit, "Item limit reached");
                break;
            }
        }

        reporter.finish()?;
        summary.finished_at = now_millis();

        tracing::info!(
            total = summary.total,
            failures = summary.failures(),
            unimplemented = summary.unimplemented,
            duration_ms = summary.finished_at - summary.started_at,
            "Checksum run finished"
        );
        Ok(summary)
    }

    fn print_bitstream<W: Write>(
        &self,
        reporter: &mut ProgressReporter<W>,
        row: usize,
        bitstream_id: u64,
    ) -> CheckerResult<Option<MostRecentChecksum>> {
        let status = self.repo.load_current_status(bitstream_id)?;
        let info = self.repo.load_bitstream(bitstream_id)?;
        let ancestors = if reporter.is_verbose() {
            scope::ancestors(self.repo.as_ref(), DsoRef::bitstream(bitstream_id))?
        } else {
            Vec::new()
        };

        reporter.bitstream_rows(row, status.as_ref(), info.as_ref(), bitstream_id, &ancestors)?;
        Ok(status)
    }
}
