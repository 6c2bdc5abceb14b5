//! CycleScreen Runner: screening orchestration over many instruments.
//!
//! This crate builds on `cyclescreen-core` to provide:
//! - Bar sources (CSV directory, seeded synthetic series)
//! - In-memory series memoization keyed by instrument, range and period
//! - Universe lists (TOML markets, listing CSVs)
//! - Parallel batch screening with progress, cancellation and failure isolation
//! - Result ranking
//! - JSON, CSV and Markdown export
//! - TOML run configuration

pub mod batch;
pub mod cache;
pub mod config;
pub mod export;
pub mod ranking;
pub mod source;
pub mod universe;

pub use batch::{
    run_batch, screen_instrument, BatchError, BatchOptions, BatchReport, BatchSummary,
    CancelToken, CompletionEvent, CompletionStatus, FailureKind, InstrumentFailure,
    InstrumentOutcome, LogProgress, NoProgress, ScreenProgress,
};
pub use cache::{CacheStats, CachedSource, SeriesKey};
pub use config::{
    BatchConfig, DataConfig, ListingConfig, RunConfig, RunConfigError, UniverseConfig, INLINE_MARKET,
};
pub use export::{load_artifacts, save_artifacts, ScreenRun, SCHEMA_VERSION};
pub use ranking::{compare_results, rank_results, top_qualified};
pub use source::{BarSource, CsvDirSource, DateRange, SourceError, SyntheticSource};
pub use universe::{Market, Universe, UniverseError};
