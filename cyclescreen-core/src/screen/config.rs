//! Screening configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid configuration. Fatal: raised before any instrument is screened.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("period must be >= 1, got {0}")]
    InvalidPeriod(usize),

    #[error("thresholds must satisfy 0 <= low < high <= 100, got low={low}, high={high}")]
    InvalidThresholds { low: f64, high: f64 },

    #[error("min_avg_volume must be a non-negative number, got {0}")]
    InvalidMinVolume(f64),

    #[error("min_return_pct must be finite, got {0}")]
    InvalidMinReturn(f64),

    #[error("min_hit_ratio must be within [0, 1], got {0}")]
    InvalidHitRatio(f64),
}

/// Parameters for screening one instrument.
///
/// Missing fields take their defaults when deserialized, so a TOML
/// `[screen]` table only needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// RSI lookback in bars.
    pub period: usize,
    /// Oversold threshold; a cycle starts when the oscillator drops below it.
    pub low_threshold: f64,
    /// Overbought threshold; a cycle ends when the oscillator reaches it.
    pub high_threshold: f64,
    /// Minimum mean daily volume over the whole series.
    pub min_avg_volume: f64,
    /// Minimum number of closed swings for an instrument to be ranked.
    pub min_swing_count: usize,
    /// Minimum return (percent) for a swing to count as a hit.
    pub min_return_pct: f64,
    /// Minimum fraction of swings that must be hits.
    pub min_hit_ratio: f64,
    /// Minimum series length; the effective floor is never below `period + 1`.
    pub min_bars: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            period: 14,
            low_threshold: 20.0,
            high_threshold: 70.0,
            min_avg_volume: 0.0,
            min_swing_count: 1,
            min_return_pct: 10.0,
            min_hit_ratio: 0.5,
            min_bars: 0,
        }
    }
}

impl ScreenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::InvalidPeriod(self.period));
        }
        let (low, high) = (self.low_threshold, self.high_threshold);
        // NaN fails every comparison, so it is rejected here too.
        if !(low >= 0.0 && low < high && high <= 100.0) {
            return Err(ConfigError::InvalidThresholds { low, high });
        }
        if !(self.min_avg_volume.is_finite() && self.min_avg_volume >= 0.0) {
            return Err(ConfigError::InvalidMinVolume(self.min_avg_volume));
        }
        if !self.min_return_pct.is_finite() {
            return Err(ConfigError::InvalidMinReturn(self.min_return_pct));
        }
        if !(0.0..=1.0).contains(&self.min_hit_ratio) {
            return Err(ConfigError::InvalidHitRatio(self.min_hit_ratio));
        }
        Ok(())
    }

    /// Fewest bars a series needs before the oscillator is computed.
    pub fn required_bars(&self) -> usize {
        (self.period + 1).max(self.min_bars)
    }

    /// Deterministic content hash of every parameter.
    ///
    /// Two configs with the same hash produce identical results on the same bars.
    pub fn config_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.period as u64).to_le_bytes());
        hasher.update(&self.low_threshold.to_le_bytes());
        hasher.update(&self.high_threshold.to_le_bytes());
        hasher.update(&self.min_avg_volume.to_le_bytes());
        hasher.update(&(self.min_swing_count as u64).to_le_bytes());
        hasher.update(&self.min_return_pct.to_le_bytes());
        hasher.update(&self.min_hit_ratio.to_le_bytes());
        hasher.update(&(self.min_bars as u64).to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }
}
