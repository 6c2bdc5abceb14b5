//! Per-instrument screening pipeline.
//!
//! 1. Validate bars (malformed series are an error for this instrument only).
//! 2. Too few bars → `insufficient_data`.
//! 3. Mean volume below minimum → `low_volume`.
//! 4. Oscillator → cycle detection → swing evaluation.
//! 5. Too few swings → `too_few_swings` (ranking fields still filled in).
//! 6. Otherwise qualifies when `hit_ratio >= min_hit_ratio`.
//!
//! Steps 2 and 3 short-circuit: the oscillator is never computed for them.

use log::debug;
use thiserror::Error;

use crate::cycle::{evaluate_swings, find_swings};
use crate::domain::{validate_bars, Bar, MalformedBarError};
use crate::indicators::{oscillator_points, Indicator, Rsi};

use super::config::{ConfigError, ScreenConfig};
use super::result::{ScreeningReport, ScreeningResult, SkipReason};

/// Per-instrument failure. Never fatal to a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("{instrument}: malformed bars: {source}")]
    MalformedBars {
        instrument: String,
        #[source]
        source: MalformedBarError,
    },
}

/// A validated configuration bound to an oscillator.
///
/// Construction is the only place a configuration can be rejected; once a
/// `Screener` exists every call to [`Screener::screen`] is infallible apart
/// from bad input data. Screeners hold no mutable state and can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct Screener<I = Rsi> {
    config: ScreenConfig,
    indicator: I,
}

impl Screener<Rsi> {
    /// Screener over an RSI of the configured period.
    pub fn new(config: ScreenConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let indicator = Rsi::new(config.period);
        Ok(Self { config, indicator })
    }
}

impl<I: Indicator> Screener<I> {
    /// Screener over a caller-supplied oscillator.
    pub fn with_indicator(config: ScreenConfig, indicator: I) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, indicator })
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Screen one instrument's bar series.
    pub fn screen(
        &self,
        instrument: &str,
        bars: &[Bar],
    ) -> Result<ScreeningReport, EvaluationError> {
        validate_bars(bars).map_err(|source| EvaluationError::MalformedBars {
            instrument: instrument.to_string(),
            source,
        })?;

        let cfg = &self.config;

        if bars.len() < cfg.required_bars() {
            debug!(
                "{instrument}: {} bars < required {}",
                bars.len(),
                cfg.required_bars()
            );
            return Ok(ScreeningReport {
                result: ScreeningResult::skipped(instrument, SkipReason::InsufficientData),
                mean_volume: None,
                oscillator: None,
                swings: Vec::new(),
            });
        }

        let mean_volume = mean(bars.iter().map(|b| b.volume)).unwrap_or(0.0);
        if mean_volume < cfg.min_avg_volume {
            debug!(
                "{instrument}: mean volume {mean_volume:.0} < {}",
                cfg.min_avg_volume
            );
            return Ok(ScreeningReport {
                result: ScreeningResult::skipped(instrument, SkipReason::LowVolume),
                mean_volume: Some(mean_volume),
                oscillator: None,
                swings: Vec::new(),
            });
        }

        let values = self.indicator.compute(bars);
        let swings = find_swings(bars, &values, cfg.low_threshold, cfg.high_threshold);
        let evaluated = evaluate_swings(&swings, cfg.min_return_pct);

        let swing_count = evaluated.len();
        let hit_count = evaluated.iter().filter(|s| s.is_hit).count();
        let hit_ratio = (swing_count > 0).then(|| hit_count as f64 / swing_count as f64);
        let avg_return = mean(evaluated.iter().map(|s| s.return_pct));

        let (qualifies, skip_reason) = if swing_count < cfg.min_swing_count {
            (false, Some(SkipReason::TooFewSwings))
        } else {
            // min_swing_count == 0 with no swings: nothing to measure, no verdict.
            (hit_ratio.is_some_and(|r| r >= cfg.min_hit_ratio), None)
        };

        debug!(
            "{instrument}: {swing_count} swings, {hit_count} hits, qualifies={qualifies}"
        );

        Ok(ScreeningReport {
            result: ScreeningResult {
                instrument_id: instrument.to_string(),
                swing_count,
                hit_count,
                hit_ratio,
                avg_return,
                qualifies,
                skip_reason,
            },
            mean_volume: Some(mean_volume),
            oscillator: Some(oscillator_points(bars, &values)),
            swings: evaluated,
        })
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn invalid_config_rejected_at_construction() {
        let config = ScreenConfig {
            low_threshold: 80.0,
            high_threshold: 30.0,
            ..Default::default()
        };
        assert!(Screener::new(config).is_err());
    }

    #[test]
    fn too_short_series_is_insufficient() {
        let screener = Screener::new(ScreenConfig::default()).unwrap();
        let bars = make_bars(&[10.0; 14]);
        let report = screener.screen("SHORT", &bars).unwrap();
        assert_eq!(
            report.result.skip_reason,
            Some(SkipReason::InsufficientData)
        );
        assert!(!report.oscillator_computed());
        assert_eq!(report.mean_volume, None);
    }

    #[test]
    fn malformed_bars_are_an_error() {
        let screener = Screener::new(ScreenConfig::default()).unwrap();
        let mut bars = make_bars(&[10.0; 20]);
        bars[5].close = -1.0;
        let err = screener.screen("BAD", &bars).unwrap_err();
        assert!(err.to_string().contains("BAD"));
        assert!(matches!(
            err,
            EvaluationError::MalformedBars {
                source: MalformedBarError::InvalidClose { index: 5, .. },
                ..
            }
        ));
    }

    #[test]
    fn zero_min_swing_count_without_swings_does_not_qualify() {
        let config = ScreenConfig {
            min_swing_count: 0,
            min_hit_ratio: 0.0,
            ..Default::default()
        };
        let screener = Screener::new(config).unwrap();
        let report = screener.screen("FLAT", &make_bars(&[10.0; 30])).unwrap();
        assert_eq!(report.result.swing_count, 0);
        assert_eq!(report.result.skip_reason, None);
        assert!(!report.result.qualifies);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(mean([1.0, 2.0, 3.0].into_iter()), Some(2.0));
    }
}
