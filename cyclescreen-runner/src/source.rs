//! Bar sources: the data-access boundary of a screening run.
//!
//! The `BarSource` trait abstracts over where bars come from (CSV exports,
//! synthetic series, an external downloader) so the batch runner can be
//! driven by any of them and mocked in tests. Sources may block; the core
//! never does.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cyclescreen_core::Bar;

/// Inclusive date range of requested bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `years` years (of 365 days) ending at `end`, or `None` when the
    /// start would fall outside the representable calendar.
    pub fn trailing_years(end: NaiveDate, years: u32) -> Option<Self> {
        let span = chrono::Duration::try_days(365 * i64::from(years))?;
        let start = end.checked_sub_signed(span)?;
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Errors from fetching one instrument's bars.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no data for instrument '{instrument}'")]
    NotFound { instrument: String },

    #[error("failed to read data for '{instrument}': {source}")]
    Io {
        instrument: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse data for '{instrument}': {message}")]
    Parse { instrument: String, message: String },
}

/// A provider of daily bars.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Bars for `instrument` within `range`, in the order the source holds them.
    ///
    /// Sources must not reorder or repair data: ordering and value checks
    /// belong to screening, which reports them as malformed bars.
    fn fetch(&self, instrument: &str, range: DateRange) -> Result<Vec<Bar>, SourceError>;
}

// ─── CSV directory ──────────────────────────────────────────────────

/// One CSV row. Accepts both `date,close,volume` and the capitalised
/// `Date,...,Close,...,Volume` layout of common spreadsheet exports;
/// extra columns are ignored.
#[derive(Debug, Deserialize)]
struct CsvBar {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

/// Reads `{dir}/{INSTRUMENT}.csv`.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, instrument: &str) -> PathBuf {
        self.dir.join(format!("{instrument}.csv"))
    }
}

impl BarSource for CsvDirSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, instrument: &str, range: DateRange) -> Result<Vec<Bar>, SourceError> {
        let path = self.path_for(instrument);
        if !path.exists() {
            return Err(SourceError::NotFound {
                instrument: instrument.to_string(),
            });
        }

        let file = std::fs::File::open(&path).map_err(|source| SourceError::Io {
            instrument: instrument.to_string(),
            source,
        })?;
        let bars = read_csv_bars(instrument, file, range)?;
        debug!("{instrument}: read {} bars from {}", bars.len(), path.display());
        Ok(bars)
    }
}

/// Parse CSV bars from any reader, keeping rows inside `range`.
pub fn read_csv_bars(
    instrument: &str,
    reader: impl std::io::Read,
    range: DateRange,
) -> Result<Vec<Bar>, SourceError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for row in rdr.deserialize::<CsvBar>() {
        let row = row.map_err(|e| SourceError::Parse {
            instrument: instrument.to_string(),
            message: e.to_string(),
        })?;
        if range.contains(row.date) {
            bars.push(Bar::new(row.date, row.close, row.volume));
        }
    }
    Ok(bars)
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// Deterministic pseudo-random series for demos and development.
///
/// Each instrument gets its own seeded random walk with a slow cyclical
/// drift, so oscillator cycles actually occur. Weekends are skipped.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(42)
    }
}

impl BarSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, instrument: &str, range: DateRange) -> Result<Vec<Bar>, SourceError> {
        Ok(generate_synthetic_bars(instrument, range, self.seed))
    }
}

fn generate_synthetic_bars(instrument: &str, range: DateRange, seed: u64) -> Vec<Bar> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(instrument.as_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let cycle_len: f64 = rng.gen_range(30.0..90.0);
    let amplitude: f64 = rng.gen_range(0.004..0.015);
    let base_volume: f64 = rng.gen_range(50_000.0..2_000_000.0);

    let mut bars = Vec::new();
    let mut price = rng.gen_range(20.0..200.0_f64);
    let mut current = range.start;
    let mut t = 0.0_f64;

    while current <= range.end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let drift = amplitude * (std::f64::consts::TAU * t / cycle_len).sin();
        let daily_return = drift + rng.gen_range(-0.02..0.02);
        price = (price * (1.0 + daily_return)).max(0.01);
        let volume = (base_volume * rng.gen_range(0.5..1.5)).round();

        bars.push(Bar::new(current, price, volume));

        t += 1.0;
        current += chrono::Duration::days(1);
    }

    bars
}
