//! Domain types for CycleScreen

pub mod bar;
pub mod swing;

pub use bar::{validate_bars, Bar, MalformedBarError};
pub use swing::{Swing, SwingResult};

/// Instrument identifier (ticker symbol, optionally with exchange suffix).
pub type InstrumentId = String;
