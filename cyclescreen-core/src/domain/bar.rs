//! Bar: the fundamental market data unit for screening.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily close/volume bar for a single instrument.
///
/// Bars are owned by the caller and only ever read by the screening engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, close: f64, volume: f64) -> Self {
        Self {
            date,
            close,
            volume,
        }
    }

    /// Positive, finite close and non-negative, finite volume.
    pub fn is_sane(&self) -> bool {
        self.close.is_finite() && self.close > 0.0 && self.volume.is_finite() && self.volume >= 0.0
    }
}

/// A bar series that cannot be screened.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedBarError {
    #[error("bar {index}: date {date} does not follow {previous} (dates must be strictly ascending)")]
    NonMonotonicDate {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("bar {index} ({date}): close must be positive and finite, got {close}")]
    InvalidClose {
        index: usize,
        date: NaiveDate,
        close: f64,
    },

    #[error("bar {index} ({date}): volume must be non-negative and finite, got {volume}")]
    InvalidVolume {
        index: usize,
        date: NaiveDate,
        volume: f64,
    },
}

/// Check that a series is strictly ascending by date with sane values.
///
/// Reports the first offending bar.
pub fn validate_bars(bars: &[Bar]) -> Result<(), MalformedBarError> {
    let mut previous: Option<NaiveDate> = None;
    for (index, bar) in bars.iter().enumerate() {
        if let Some(prev) = previous {
            if bar.date <= prev {
                return Err(MalformedBarError::NonMonotonicDate {
                    index,
                    previous: prev,
                    date: bar.date,
                });
            }
        }
        if !(bar.close.is_finite() && bar.close > 0.0) {
            return Err(MalformedBarError::InvalidClose {
                index,
                date: bar.date,
                close: bar.close,
            });
        }
        if !(bar.volume.is_finite() && bar.volume >= 0.0) {
            return Err(MalformedBarError::InvalidVolume {
                index,
                date: bar.date,
                volume: bar.volume,
            });
        }
        previous = Some(bar.date);
    }
    Ok(())
}
