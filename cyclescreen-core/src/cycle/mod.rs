//! Cycle detection and swing evaluation.
//!
//! The detector turns an oscillator series into closed oversold → overbought
//! intervals; the evaluator attaches the realized price return to each one.

pub mod detector;
pub mod evaluator;

pub use detector::{find_swings, CycleDetector, DetectorState, SwingSpan};
pub use evaluator::{evaluate_swing, evaluate_swings, return_pct};
