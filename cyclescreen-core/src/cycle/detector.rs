//! Oversold → overbought cycle state machine.
//!
//! ```text
//!            value falls below low            value reaches high
//!  Seeking ─────────────────────────▶ Armed ─────────────────────▶ Seeking (emit swing)
//!                                      │  ▲
//!                                      └──┘ value falls below low again:
//!                                           pending start moves (last crossing wins)
//! ```
//!
//! Crossings are half-open: a downward cross needs `previous >= low && current < low`,
//! an upward cross needs `previous < high && current >= high`. NaN points are
//! absent: they neither change state nor become the "previous" value.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Swing};

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorState {
    Seeking,
    Armed { pending_start: usize },
}

/// A closed cycle expressed as bar indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingSpan {
    pub start: usize,
    pub end: usize,
}

/// Streaming cycle detector. Feed points in ascending index order.
#[derive(Debug, Clone)]
pub struct CycleDetector {
    low: f64,
    high: f64,
    state: DetectorState,
    previous: Option<f64>,
}

impl CycleDetector {
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            state: DetectorState::Seeking,
            previous: None,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Process one oscillator point. Returns a span when a cycle closes.
    pub fn update(&mut self, index: usize, value: f64) -> Option<SwingSpan> {
        if value.is_nan() {
            return None;
        }
        let previous = self.previous.replace(value)?;

        let crossed_down = previous >= self.low && value < self.low;
        let crossed_up = previous < self.high && value >= self.high;

        match self.state {
            DetectorState::Seeking => {
                if crossed_down {
                    self.state = DetectorState::Armed {
                        pending_start: index,
                    };
                }
                None
            }
            DetectorState::Armed { pending_start } => {
                if crossed_up {
                    self.state = DetectorState::Seeking;
                    Some(SwingSpan {
                        start: pending_start,
                        end: index,
                    })
                } else {
                    if crossed_down {
                        self.state = DetectorState::Armed {
                            pending_start: index,
                        };
                    }
                    None
                }
            }
        }
    }

    /// Run a fresh detector over a whole series.
    ///
    /// A start still pending at the end of the series is discarded.
    pub fn detect(values: &[f64], low: f64, high: f64) -> Vec<SwingSpan> {
        let mut detector = Self::new(low, high);
        values
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| detector.update(i, v))
            .collect()
    }
}

/// Detect cycles and resolve them against the bars they were computed from.
///
/// `oscillator` should have one value per bar. Values past the last bar are
/// ignored, and bars past the last value are treated as undefined points.
pub fn find_swings(bars: &[Bar], oscillator: &[f64], low: f64, high: f64) -> Vec<Swing> {
    let len = bars.len().min(oscillator.len());
    CycleDetector::detect(&oscillator[..len], low, high)
        .into_iter()
        .filter_map(|span| {
            let start = bars.get(span.start)?;
            let end = bars.get(span.end)?;
            Some(Swing {
                start_index: span.start,
                start_date: start.date,
                start_price: start.close,
                end_index: span.end,
                end_date: end.date,
                end_price: end.close,
            })
        })
        .collect()
}
