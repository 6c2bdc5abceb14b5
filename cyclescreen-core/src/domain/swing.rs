//! Swing: a closed oversold → overbought cycle and its evaluated outcome.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A closed cycle: the oscillator dropped below the oversold threshold at
/// `start_index` and next reached the overbought threshold at `end_index`.
///
/// Invariant: `end_index > start_index` (and therefore `end_date > start_date`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Swing {
    pub start_index: usize,
    pub start_date: NaiveDate,
    pub start_price: f64,
    pub end_index: usize,
    pub end_date: NaiveDate,
    pub end_price: f64,
}

impl Swing {
    /// Number of bars from the oversold cross to the overbought cross.
    pub fn bars_held(&self) -> usize {
        self.end_index - self.start_index
    }
}

/// A swing with its realized price return classified against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingResult {
    #[serde(flatten)]
    pub swing: Swing,
    /// `(end_price / start_price - 1) * 100`
    pub return_pct: f64,
    pub is_hit: bool,
}
