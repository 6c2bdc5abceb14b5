//! Screening verdicts and drill-down reports.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{InstrumentId, SwingResult};
use crate::indicators::OscillatorPoint;

/// Why an instrument was not evaluated to a full verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Series shorter than the configured minimum.
    InsufficientData,
    /// Mean volume below `min_avg_volume`.
    LowVolume,
    /// Fewer closed swings than `min_swing_count`.
    TooFewSwings,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::InsufficientData => "insufficient_data",
            SkipReason::LowVolume => "low_volume",
            SkipReason::TooFewSwings => "too_few_swings",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict and ranking fields for one instrument in one screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub instrument_id: InstrumentId,
    pub swing_count: usize,
    /// Always `<= swing_count`.
    pub hit_count: usize,
    /// `hit_count / swing_count`; `None` when there are no swings.
    pub hit_ratio: Option<f64>,
    /// Mean `return_pct` over all swings, hits and misses alike.
    pub avg_return: Option<f64>,
    pub qualifies: bool,
    pub skip_reason: Option<SkipReason>,
}

impl ScreeningResult {
    /// A result for an instrument rejected before any swing was measured.
    pub fn skipped(instrument_id: impl Into<InstrumentId>, reason: SkipReason) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            swing_count: 0,
            hit_count: 0,
            hit_ratio: None,
            avg_return: None,
            qualifies: false,
            skip_reason: Some(reason),
        }
    }
}

/// A verdict plus everything needed to display how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningReport {
    pub result: ScreeningResult,
    /// Mean volume over the series, when the series was long enough to check.
    pub mean_volume: Option<f64>,
    /// `None` when the instrument was rejected before the oscillator ran.
    pub oscillator: Option<Vec<OscillatorPoint>>,
    pub swings: Vec<SwingResult>,
}

impl ScreeningReport {
    pub fn oscillator_computed(&self) -> bool {
        self.oscillator.is_some()
    }
}
