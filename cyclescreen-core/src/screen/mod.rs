//! Screening: configuration, aggregation into per-instrument verdicts.

pub mod config;
pub mod result;
pub mod screener;

pub use config::{ConfigError, ScreenConfig};
pub use result::{ScreeningReport, ScreeningResult, SkipReason};
pub use screener::{EvaluationError, Screener};
