//! Run configuration loaded from TOML.
//!
//! ```toml
//! [screen]
//! period = 14
//! low_threshold = 20.0
//! high_threshold = 70.0
//! min_avg_volume = 100000.0
//!
//! [data]
//! data_dir = "data"
//! years = 5
//!
//! [batch]
//! threads = 4
//!
//! [universe]
//! file = "universe.toml"
//! instruments = ["EQNR.OL"]
//!
//! [[universe.listings]]
//! name = "stockholm"
//! file = "listings/stockholm.csv"
//! column = "Symbol"
//! suffix = ".ST"
//! ```
//!
//! Every section and field is optional; command-line flags override file values.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cyclescreen_core::{ConfigError, ScreenConfig};

use crate::source::DateRange;
use crate::universe::{Universe, UniverseError};

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid screening parameters: {0}")]
    Screen(#[from] ConfigError),

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("data.years = {years} reaches outside the supported calendar")]
    LookbackOutOfRange { years: u32 },

    #[error("no data source: set data.data_dir or data.synthetic")]
    NoDataSource,

    #[error("batch.threads must be at least 1")]
    InvalidThreads,

    #[error("listing market '{name}' is already defined")]
    DuplicateMarket { name: String },

    #[error("no instruments: set universe.file, universe.listings or universe.instruments")]
    EmptyUniverse,

    #[error(transparent)]
    Universe(#[from] UniverseError),
}

// ── Sections ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory of `{INSTRUMENT}.csv` files.
    pub data_dir: Option<PathBuf>,
    /// Use seeded synthetic series instead of files.
    pub synthetic: bool,
    pub seed: u64,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Lookback when `start` is unset.
    pub years: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            synthetic: false,
            seed: 42,
            start: None,
            end: None,
            years: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker cap; `None` uses rayon's global pool.
    pub threads: Option<usize>,
    pub progress_every: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            threads: None,
            progress_every: 25,
        }
    }
}

/// Market name for instruments listed inline in the config or on the command line.
pub const INLINE_MARKET: &str = "inline";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub file: Option<PathBuf>,
    /// Exchange listing CSVs, one market each.
    pub listings: Vec<ListingConfig>,
    /// Added to the `inline` market.
    pub instruments: Vec<String>,
}

/// A ticker column in a listing CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingConfig {
    pub name: String,
    pub file: PathBuf,
    #[serde(default = "default_listing_column")]
    pub column: String,
    #[serde(default)]
    pub suffix: String,
}

fn default_listing_column() -> String {
    "Symbol".to_string()
}

// ── RunConfig ──

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub screen: ScreenConfig,
    pub data: DataConfig,
    pub batch: BatchConfig,
    pub universe: UniverseConfig,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, RunConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, RunConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check everything that would make a run fail before any instrument is screened.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        self.screen.validate()?;
        if !self.data.synthetic && self.data.data_dir.is_none() {
            return Err(RunConfigError::NoDataSource);
        }
        if self.batch.threads == Some(0) {
            return Err(RunConfigError::InvalidThreads);
        }
        if let (Some(start), Some(end)) = (self.data.start, self.data.end) {
            if start > end {
                return Err(RunConfigError::InvalidRange { start, end });
            }
        }
        Ok(())
    }

    /// Date range to fetch, anchored on `today` when `end` is unset.
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange, RunConfigError> {
        let end = self.data.end.unwrap_or(today);
        let range = match self.data.start {
            Some(start) => DateRange::new(start, end),
            None => DateRange::trailing_years(end, self.data.years).ok_or(
                RunConfigError::LookbackOutOfRange {
                    years: self.data.years,
                },
            )?,
        };
        if range.start > range.end {
            return Err(RunConfigError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        Ok(range)
    }

    /// Universe file (if any) merged with the inline instrument list.
    pub fn load_universe(&self) -> Result<Universe, RunConfigError> {
        let mut universe = match &self.universe.file {
            Some(path) => Universe::from_file(path)?,
            None => Universe::default(),
        };
        for listing in &self.universe.listings {
            if universe.markets.contains_key(&listing.name) {
                return Err(RunConfigError::DuplicateMarket {
                    name: listing.name.clone(),
                });
            }
            let file = std::fs::File::open(&listing.file).map_err(|source| UniverseError::Read {
                path: listing.file.display().to_string(),
                source,
            })?;
            let count =
                universe.add_market_from_csv(&listing.name, file, &listing.column, &listing.suffix)?;
            debug!("listing {}: {count} tickers", listing.name);
        }
        if !self.universe.instruments.is_empty() {
            universe.extend_market(INLINE_MARKET, self.universe.instruments.iter().cloned());
        }
        if universe.instrument_count() == 0 {
            return Err(RunConfigError::EmptyUniverse);
        }
        Ok(universe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = RunConfig::from_toml("").unwrap();
        assert_eq!(cfg, RunConfig::default());
        assert_eq!(cfg.screen.period, 14);
        assert_eq!(cfg.data.years, 5);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let cfg = RunConfig::from_toml(
            r#"
            [screen]
            low_threshold = 25.0
            min_swing_count = 3

            [data]
            data_dir = "bars"
            start = "2020-01-01"

            [batch]
            threads = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.screen.low_threshold, 25.0);
        assert_eq!(cfg.screen.high_threshold, 70.0);
        assert_eq!(cfg.screen.min_swing_count, 3);
        assert_eq!(cfg.data.data_dir, Some(PathBuf::from("bars")));
        assert_eq!(cfg.data.start, Some(date(2020, 1, 1)));
        assert_eq!(cfg.batch.threads, Some(2));
        assert_eq!(cfg.batch.progress_every, 25);
        cfg.validate().unwrap();
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = RunConfig::default();
        cfg.data.synthetic = true;
        cfg.universe.instruments = vec!["AAA".into(), "BBB".into()];
        let text = cfg.to_toml().unwrap();
        assert_eq!(RunConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn validate_rejects_bad_screen_params() {
        let mut cfg = RunConfig::default();
        cfg.data.synthetic = true;
        cfg.screen.low_threshold = 80.0;
        assert!(matches!(
            cfg.validate(),
            Err(RunConfigError::Screen(ConfigError::InvalidThresholds { .. }))
        ));
    }

    #[test]
    fn validate_requires_a_source() {
        assert!(matches!(
            RunConfig::default().validate(),
            Err(RunConfigError::NoDataSource)
        ));
    }

    #[test]
    fn validate_rejects_zero_threads_and_inverted_range() {
        let mut cfg = RunConfig::default();
        cfg.data.synthetic = true;
        cfg.batch.threads = Some(0);
        assert!(matches!(cfg.validate(), Err(RunConfigError::InvalidThreads)));

        cfg.batch.threads = None;
        cfg.data.start = Some(date(2024, 6, 1));
        cfg.data.end = Some(date(2024, 1, 1));
        assert!(matches!(
            cfg.validate(),
            Err(RunConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn date_range_defaults_to_trailing_years() {
        let cfg = RunConfig::default();
        let today = date(2025, 3, 1);
        let range = cfg.date_range(today).unwrap();
        assert_eq!(range.end, today);
        assert_eq!((range.end - range.start).num_days(), 5 * 365);

        let mut cfg = RunConfig::default();
        cfg.data.start = Some(date(2030, 1, 1));
        assert!(cfg.date_range(today).is_err());
    }

    #[test]
    fn huge_lookback_is_an_error_not_a_panic() {
        let cfg = RunConfig::from_toml("[data]\nyears = 4000000000\n").unwrap();
        assert!(matches!(
            cfg.date_range(date(2025, 3, 1)),
            Err(RunConfigError::LookbackOutOfRange { years: 4_000_000_000 })
        ));
    }

    #[test]
    fn universe_merges_file_and_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("universe.toml");
        std::fs::write(
            &path,
            "[markets.oslo]\nsuffix = \".OL\"\ntickers = [\"EQNR\", \"DNB\"]\n",
        )
        .unwrap();

        let mut cfg = RunConfig::default();
        cfg.universe.file = Some(path);
        cfg.universe.instruments = vec!["AAPL".into()];
        let universe = cfg.load_universe().unwrap();
        let all = universe.all_instruments();
        assert_eq!(all.len(), 3);
        assert!(all.contains(&"EQNR.OL".to_string()));
        assert!(all.contains(&"AAPL".to_string()));
    }

    #[test]
    fn inline_instruments_keep_file_markets_named_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("universe.toml");
        std::fs::write(
            &path,
            "[markets.default]\ntickers = [\"MSFT\"]\n\n[markets.inline]\ntickers = [\"IBM\"]\n",
        )
        .unwrap();

        let mut cfg = RunConfig::default();
        cfg.universe.file = Some(path);
        cfg.universe.instruments = vec!["AAPL".into()];
        let universe = cfg.load_universe().unwrap();

        assert_eq!(universe.market_instruments("default"), Some(vec!["MSFT".to_string()]));
        assert_eq!(
            universe.market_instruments(INLINE_MARKET),
            Some(vec!["IBM".to_string(), "AAPL".to_string()])
        );
    }

    #[test]
    fn listings_become_markets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockholm.csv");
        std::fs::write(&path, "Name,Symbol\nVolvo B,VOLV-B\nEricsson B,ERIC-B\n").unwrap();

        let cfg = RunConfig::from_toml(&format!(
            "[[universe.listings]]\nname = \"stockholm\"\nfile = {:?}\nsuffix = \".ST\"\n",
            path.display().to_string()
        ))
        .unwrap();
        assert_eq!(cfg.universe.listings[0].column, "Symbol");

        let universe = cfg.load_universe().unwrap();
        assert_eq!(
            universe.all_instruments(),
            vec!["VOLV-B.ST".to_string(), "ERIC-B.ST".to_string()]
        );
    }

    #[test]
    fn listing_cannot_replace_a_file_market() {
        let dir = tempfile::tempdir().unwrap();
        let universe_path = dir.path().join("universe.toml");
        std::fs::write(&universe_path, "[markets.oslo]\ntickers = [\"EQNR\"]\n").unwrap();
        let listing_path = dir.path().join("oslo.csv");
        std::fs::write(&listing_path, "Symbol\nDNB\n").unwrap();

        let mut cfg = RunConfig::default();
        cfg.universe.file = Some(universe_path);
        cfg.universe.listings = vec![ListingConfig {
            name: "oslo".into(),
            file: listing_path,
            column: "Symbol".into(),
            suffix: ".OL".into(),
        }];
        assert!(matches!(
            cfg.load_universe(),
            Err(RunConfigError::DuplicateMarket { name }) if name == "oslo"
        ));
    }

    #[test]
    fn missing_listing_file_is_a_read_error() {
        let mut cfg = RunConfig::default();
        cfg.universe.listings = vec![ListingConfig {
            name: "nyse".into(),
            file: PathBuf::from("/nonexistent/nyse.csv"),
            column: "Symbol".into(),
            suffix: String::new(),
        }];
        assert!(matches!(
            cfg.load_universe(),
            Err(RunConfigError::Universe(UniverseError::Read { .. }))
        ));
    }

    #[test]
    fn empty_universe_is_an_error() {
        assert!(matches!(
            RunConfig::default().load_universe(),
            Err(RunConfigError::EmptyUniverse)
        ));
    }
}
