//! Batch screening: parallel per-instrument evaluation with isolated failures.
//!
//! Each instrument is fetched and screened independently on a rayon pool.
//! Nothing is shared between instruments except read-only inputs, the
//! completion counter and the cancel flag.
//!
//! Failure policy:
//! - Invalid configuration is rejected when the `Screener` is built, before
//!   any instrument runs.
//! - Fetch errors and malformed bars become `InstrumentOutcome::Failed` for
//!   that instrument only; the batch continues.
//! - Cancellation stops instruments from starting. An instrument that has
//!   started always runs to completion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cyclescreen_core::{
    EvaluationError, Indicator, Screener, ScreeningReport, ScreeningResult, SkipReason,
};

use crate::source::{BarSource, DateRange};

/// Errors that abort a batch before it starts.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Batch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOptions {
    pub range: DateRange,
    /// Worker thread cap; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

/// Shared flag for stopping a batch between instruments.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to a failed instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DataSource,
    MalformedBars,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataSource => "data_source",
            Self::MalformedBars => "malformed_bars",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentFailure {
    pub instrument: String,
    pub kind: FailureKind,
    pub cause: String,
}

/// Per-instrument result of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InstrumentOutcome {
    Screened(ScreeningReport),
    Failed(InstrumentFailure),
}

impl InstrumentOutcome {
    pub fn instrument(&self) -> &str {
        match self {
            InstrumentOutcome::Screened(r) => &r.result.instrument_id,
            InstrumentOutcome::Failed(f) => &f.instrument,
        }
    }

    pub fn status(&self) -> CompletionStatus {
        match self {
            InstrumentOutcome::Screened(r) => match r.result.skip_reason {
                Some(reason) => CompletionStatus::Skipped(reason),
                None if r.result.qualifies => CompletionStatus::Qualified,
                None => CompletionStatus::NotQualified,
            },
            InstrumentOutcome::Failed(_) => CompletionStatus::Failed,
        }
    }
}

/// Short classification of a finished instrument for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Qualified,
    NotQualified,
    Skipped(SkipReason),
    Failed,
}

/// Emitted once per finished instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub instrument: String,
    /// Position of the instrument in the input list.
    pub index: usize,
    /// Instruments finished so far, including this one.
    pub completed: usize,
    pub total: usize,
    pub status: CompletionStatus,
}

/// Counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub screened: usize,
    pub qualified: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_started: usize,
}

/// Receives progress while a batch runs. Called from worker threads.
pub trait ScreenProgress: Send + Sync {
    fn on_complete(&self, event: &CompletionEvent);

    fn on_batch_complete(&self, _summary: &BatchSummary) {}
}

/// Ignores all progress.
pub struct NoProgress;

impl ScreenProgress for NoProgress {
    fn on_complete(&self, _event: &CompletionEvent) {}
}

/// Logs progress through the `log` facade, one line every `every` instruments.
pub struct LogProgress {
    pub every: usize,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self { every: 10 }
    }
}

impl ScreenProgress for LogProgress {
    fn on_complete(&self, event: &CompletionEvent) {
        if let CompletionStatus::Failed = event.status {
            return; // logged by the runner with its cause
        }
        if event.completed % self.every.max(1) == 0 || event.completed == event.total {
            info!(
                "[{}/{}] {} {:?}",
                event.completed, event.total, event.instrument, event.status
            );
        }
    }

    fn on_batch_complete(&self, s: &BatchSummary) {
        info!(
            "screening complete: {}/{} screened, {} qualified, {} skipped, {} failed, {} not started",
            s.screened, s.total, s.qualified, s.skipped, s.failed, s.not_started
        );
    }
}

/// Everything a batch produced, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<InstrumentOutcome>,
    pub total: usize,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

impl BatchReport {
    /// Verdicts of every screened instrument.
    pub fn results(&self) -> impl Iterator<Item = &ScreeningResult> {
        self.outcomes.iter().filter_map(|o| match o {
            InstrumentOutcome::Screened(r) => Some(&r.result),
            InstrumentOutcome::Failed(_) => None,
        })
    }

    pub fn reports(&self) -> impl Iterator<Item = &ScreeningReport> {
        self.outcomes.iter().filter_map(|o| match o {
            InstrumentOutcome::Screened(r) => Some(r),
            InstrumentOutcome::Failed(_) => None,
        })
    }

    pub fn qualified(&self) -> impl Iterator<Item = &ScreeningResult> {
        self.results().filter(|r| r.qualifies)
    }

    pub fn failures(&self) -> impl Iterator<Item = &InstrumentFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            InstrumentOutcome::Failed(f) => Some(f),
            InstrumentOutcome::Screened(_) => None,
        })
    }

    /// Drill-down report for one instrument, if it was screened.
    pub fn report_for(&self, instrument: &str) -> Option<&ScreeningReport> {
        self.reports().find(|r| r.result.instrument_id == instrument)
    }

    pub fn skip_counts(&self) -> HashMap<SkipReason, usize> {
        let mut counts = HashMap::new();
        for reason in self.results().filter_map(|r| r.skip_reason) {
            *counts.entry(reason).or_insert(0) += 1;
        }
        counts
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total,
            screened: self.results().count(),
            qualified: self.qualified().count(),
            skipped: self.results().filter(|r| r.skip_reason.is_some()).count(),
            failed: self.failures().count(),
            not_started: self.total - self.outcomes.len(),
        }
    }
}

/// Fetch and screen a single instrument, capturing failures as values.
pub fn screen_instrument<I: Indicator>(
    instrument: &str,
    source: &dyn BarSource,
    screener: &Screener<I>,
    range: DateRange,
) -> InstrumentOutcome {
    let bars = match source.fetch(instrument, range) {
        Ok(bars) => bars,
        Err(e) => {
            return InstrumentOutcome::Failed(InstrumentFailure {
                instrument: instrument.to_string(),
                kind: FailureKind::DataSource,
                cause: e.to_string(),
            })
        }
    };

    match screener.screen(instrument, &bars) {
        Ok(report) => InstrumentOutcome::Screened(report),
        Err(EvaluationError::MalformedBars { source, .. }) => {
            InstrumentOutcome::Failed(InstrumentFailure {
                instrument: instrument.to_string(),
                kind: FailureKind::MalformedBars,
                cause: source.to_string(),
            })
        }
    }
}

/// Screen every instrument in parallel.
///
/// Outcomes keep the order of `instruments`. Instruments that never started
/// because of cancellation have no outcome.
pub fn run_batch<I: Indicator>(
    instruments: &[String],
    source: &dyn BarSource,
    screener: &Screener<I>,
    options: &BatchOptions,
    progress: &dyn ScreenProgress,
    cancel: &CancelToken,
) -> Result<BatchReport, BatchError> {
    let started = Instant::now();
    let total = instruments.len();
    let completed = AtomicUsize::new(0);

    info!(
        "screening {total} instruments from {} ({} to {})",
        source.name(),
        options.range.start,
        options.range.end
    );

    let work = || -> Vec<Option<InstrumentOutcome>> {
        instruments
            .par_iter()
            .enumerate()
            .map(|(index, instrument)| {
                if cancel.is_cancelled() {
                    return None;
                }
                let outcome = screen_instrument(instrument, source, screener, options.range);
                if let InstrumentOutcome::Failed(f) = &outcome {
                    warn!("{}: {}", f.instrument, f.cause);
                }
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress.on_complete(&CompletionEvent {
                    instrument: instrument.clone(),
                    index,
                    completed: done,
                    total,
                    status: outcome.status(),
                });
                Some(outcome)
            })
            .collect()
    };

    let slots = match options.threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n.max(1))
            .build()?
            .install(work),
        None => work(),
    };

    let outcomes: Vec<InstrumentOutcome> = slots.into_iter().flatten().collect();
    let report = BatchReport {
        cancelled: outcomes.len() < total,
        outcomes,
        total,
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    progress.on_batch_complete(&report.summary());
    Ok(report)
}
