//! CycleScreen Core: oscillator cycle detection and screening verdicts.
//!
//! This crate is the pure evaluation engine:
//! - Domain types (bars, swings, swing results)
//! - RSI oscillator with simple rolling averages
//! - Oversold → overbought cycle state machine
//! - Swing return evaluation and hit classification
//! - Per-instrument screening with volume pre-filter and hit-ratio verdict
//!
//! Nothing here fetches data, caches, or blocks. Every function is a
//! deterministic computation over caller-owned, immutable input.

pub mod cycle;
pub mod domain;
pub mod indicators;
pub mod screen;

pub use cycle::{find_swings, CycleDetector, DetectorState, SwingSpan};
pub use domain::{validate_bars, Bar, InstrumentId, MalformedBarError, Swing, SwingResult};
pub use indicators::{oscillator_points, Indicator, OscillatorPoint, Rsi};
pub use screen::{
    ConfigError, EvaluationError, ScreenConfig, Screener, ScreeningReport, ScreeningResult,
    SkipReason,
};
