//! Relative Strength Index (RSI) with simple rolling averages.
//!
//! gain/loss per bar from the close-to-close change (the first bar has no change),
//! avg_gain/avg_loss = simple mean over the trailing `period` bars,
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Lookback: period - 1.
//! Edge cases: avg_loss == 0 with avg_gain > 0 → 100; both zero → undefined (NaN).

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    /// Callers validate `period >= 1` through `ScreenConfig::validate`.
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rsi_series(&closes, self.period)
    }
}

/// RSI over a raw close series. A zero period yields an all-NaN series.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        if delta.is_nan() {
            gains[i] = f64::NAN;
            losses[i] = f64::NAN;
        } else if delta > 0.0 {
            gains[i] = delta;
        } else if delta < 0.0 {
            losses[i] = -delta;
        }
    }

    // Window sums are taken fresh per bar: a running sum leaves float residue
    // after a move, and a flat window must average to exactly zero.
    let p = period as f64;
    for i in (period - 1)..n {
        let start = i + 1 - period;
        let avg_gain = gains[start..=i].iter().sum::<f64>() / p;
        let avg_loss = losses[start..=i].iter().sum::<f64>() / p;
        result[i] = compute_rsi(avg_gain, avg_loss);
    }

    result
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 {
            100.0
        } else {
            f64::NAN // 0/0: no movement
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
