//! Universe configuration: market-organized instrument lists.
//!
//! A universe groups tickers by market (e.g. "nyse", "oslo", "stockholm").
//! Each market may carry an exchange suffix that is appended to its tickers
//! when building instrument ids (".OL" for Oslo Børs, ".ST" for Stockholm).
//! Universes are stored as TOML, or built from a ticker column of a CSV
//! listing file.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize universe: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("listing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("listing CSV has no column named '{0}'")]
    MissingColumn(String),
}

/// One market's ticker list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Appended to every ticker, e.g. ".OL".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,
    pub tickers: Vec<String>,
}

impl Market {
    /// Instrument ids: ticker plus suffix, unless the ticker already has it.
    pub fn instruments(&self) -> impl Iterator<Item = String> + '_ {
        self.tickers.iter().map(move |t| {
            if self.suffix.is_empty() || t.ends_with(&self.suffix) {
                t.clone()
            } else {
                format!("{t}{}", self.suffix)
            }
        })
    }
}

/// The complete universe configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub markets: BTreeMap<String, Market>,
}

impl Universe {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|source| UniverseError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, UniverseError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A single unnamed market from explicit instrument ids.
    pub fn from_instruments(instruments: impl IntoIterator<Item = String>) -> Self {
        let mut universe = Self::default();
        universe.extend_market("default", instruments);
        universe
    }

    /// Append tickers to `market`, creating it without a suffix if absent.
    pub fn extend_market(&mut self, market: &str, tickers: impl IntoIterator<Item = String>) {
        self.markets
            .entry(market.to_string())
            .or_default()
            .tickers
            .extend(tickers);
    }

    /// Add a market read from a listing CSV, taking tickers from `column`.
    ///
    /// Blank cells are skipped.
    pub fn add_market_from_csv(
        &mut self,
        name: &str,
        reader: impl std::io::Read,
        column: &str,
        suffix: &str,
    ) -> Result<usize, UniverseError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let idx = rdr
            .headers()?
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| UniverseError::MissingColumn(column.to_string()))?;

        let mut tickers = Vec::new();
        for record in rdr.records() {
            let record = record?;
            if let Some(t) = record.get(idx).map(str::trim).filter(|t| !t.is_empty()) {
                tickers.push(t.to_string());
            }
        }
        let count = tickers.len();
        self.markets.insert(
            name.to_string(),
            Market {
                suffix: suffix.to_string(),
                tickers,
            },
        );
        Ok(count)
    }

    /// All instrument ids across markets, in market order, duplicates removed.
    pub fn all_instruments(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.markets
            .values()
            .flat_map(|m| m.instruments())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Instrument ids for one market.
    pub fn market_instruments(&self, market: &str) -> Option<Vec<String>> {
        self.markets.get(market).map(|m| m.instruments().collect())
    }

    pub fn market_names(&self) -> Vec<&str> {
        self.markets.keys().map(|s| s.as_str()).collect()
    }

    /// Total number of distinct instruments.
    pub fn instrument_count(&self) -> usize {
        self.all_instruments().len()
    }
}
