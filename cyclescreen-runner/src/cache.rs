//! In-memory series memoization at the data-access boundary.
//!
//! Keyed by (instrument, date range, oscillator period). Entries fetched
//! for one period are never served to a screener with another. Fetch errors
//! are never cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use cyclescreen_core::Bar;

use crate::source::{BarSource, DateRange, SourceError};

/// Cache key for a fetched series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub instrument: String,
    pub range: DateRange,
    pub period: usize,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// A memoizing wrapper around any `BarSource`.
///
/// Owned by the orchestrator; the screening core never sees it.
pub struct CachedSource<S> {
    inner: S,
    period: usize,
    entries: Mutex<HashMap<SeriesKey, Arc<Vec<Bar>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<S: BarSource> CachedSource<S> {
    pub fn new(inner: S, period: usize) -> Self {
        Self {
            inner,
            period,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fetch through the cache, sharing the stored series.
    ///
    /// Concurrent misses on the same key may both reach the inner source;
    /// the first stored series wins.
    pub fn get(&self, instrument: &str, range: DateRange) -> Result<Arc<Vec<Bar>>, SourceError> {
        let key = SeriesKey {
            instrument: instrument.to_string(),
            range,
            period: self.period,
        };

        if let Some(bars) = self.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(bars));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let bars = Arc::new(self.inner.fetch(instrument, range)?);
        debug!("cache store {instrument} ({} bars)", bars.len());
        let stored = Arc::clone(self.lock().entry(key).or_insert(bars));
        Ok(stored)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lock().len(),
        }
    }

    /// Drop every cached series.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // Critical sections are single map operations, so a poisoned map is still consistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SeriesKey, Arc<Vec<Bar>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: BarSource> BarSource for CachedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, instrument: &str, range: DateRange) -> Result<Vec<Bar>, SourceError> {
        self.get(instrument, range).map(|bars| bars.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl BarSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch(&self, instrument: &str, range: DateRange) -> Result<Vec<Bar>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if instrument == "MISSING" {
                return Err(SourceError::NotFound {
                    instrument: instrument.to_string(),
                });
            }
            Ok(vec![Bar::new(range.start, 10.0, 100.0)])
        }
    }

    fn range(year: i32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
        )
    }

    fn counting() -> CountingSource {
        CountingSource {
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn repeated_fetch_hits_cache() {
        let cache = CachedSource::new(counting(), 14);
        let a = cache.get("SPY", range(2024)).unwrap();
        let b = cache.get("SPY", range(2024)).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn different_range_is_a_different_entry() {
        let cache = CachedSource::new(counting(), 14);
        cache.get("SPY", range(2023)).unwrap();
        cache.get("SPY", range(2024)).unwrap();
        cache.get("QQQ", range(2024)).unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.stats().entries, 3);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = CachedSource::new(counting(), 14);
        assert!(cache.get("MISSING", range(2024)).is_err());
        assert!(cache.get("MISSING", range(2024)).is_err());
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn clear_forces_refetch() {
        let cache = CachedSource::new(counting(), 14);
        cache.get("SPY", range(2024)).unwrap();
        cache.clear();
        cache.get("SPY", range(2024)).unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn usable_as_bar_source() {
        let cache = CachedSource::new(counting(), 14);
        let source: &dyn BarSource = &cache;
        assert_eq!(source.name(), "counting");
        assert_eq!(source.fetch("SPY", range(2024)).unwrap().len(), 1);
        assert_eq!(source.fetch("SPY", range(2024)).unwrap().len(), 1);
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 1);
    }
}
