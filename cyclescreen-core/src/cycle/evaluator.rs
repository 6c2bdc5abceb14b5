//! Swing evaluation: realized return and hit classification.

use crate::domain::{Swing, SwingResult};

/// Percentage return from `start_price` to `end_price`.
pub fn return_pct(start_price: f64, end_price: f64) -> f64 {
    (end_price / start_price - 1.0) * 100.0
}

/// A swing is a hit when its return meets or exceeds `min_return_pct`.
pub fn evaluate_swing(swing: &Swing, min_return_pct: f64) -> SwingResult {
    let return_pct = return_pct(swing.start_price, swing.end_price);
    SwingResult {
        swing: *swing,
        return_pct,
        is_hit: return_pct >= min_return_pct,
    }
}

pub fn evaluate_swings(swings: &[Swing], min_return_pct: f64) -> Vec<SwingResult> {
    swings
        .iter()
        .map(|s| evaluate_swing(s, min_return_pct))
        .collect()
}
