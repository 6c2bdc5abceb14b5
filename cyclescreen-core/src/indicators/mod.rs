//! Oscillator indicators.
//!
//! Indicators are pure functions: bar history in, numeric series out. The
//! output has the same length as the input and uses `f64::NAN` for points
//! where the value is undefined (warmup, or no price movement in the window).

pub mod rsi;

pub use rsi::{rsi_series, Rsi};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Trait for oscillators that drive cycle detection.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on price data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading bars that are always undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`; undefined points are NaN.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// One oscillator reading for drill-down display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorPoint {
    pub date: NaiveDate,
    /// `None` where the oscillator is undefined.
    pub value: Option<f64>,
}

/// Pair a computed series with bar dates, mapping NaN to `None`.
pub fn oscillator_points(bars: &[Bar], values: &[f64]) -> Vec<OscillatorPoint> {
    bars.iter()
        .zip(values)
        .map(|(bar, &v)| OscillatorPoint {
            date: bar.date,
            value: if v.is_nan() { None } else { Some(v) },
        })
        .collect()
}

/// Create synthetic bars from close prices for testing.
///
/// Dates are consecutive days from 2024-01-02, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}
