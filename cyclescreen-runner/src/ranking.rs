//! Ranking of screening results.
//!
//! Order: qualifying instruments first, then by hit ratio, swing count and
//! average return (all descending), with the instrument id as a final
//! tiebreak so the order is total and stable across runs. Missing ratios
//! and returns sort after every present value.

use std::cmp::Ordering;

use cyclescreen_core::ScreeningResult;

/// Compare two results for ranking (`Less` = ranks higher).
pub fn compare_results(a: &ScreeningResult, b: &ScreeningResult) -> Ordering {
    b.qualifies
        .cmp(&a.qualifies)
        .then_with(|| desc_option(a.hit_ratio, b.hit_ratio))
        .then_with(|| b.swing_count.cmp(&a.swing_count))
        .then_with(|| desc_option(a.avg_return, b.avg_return))
        .then_with(|| a.instrument_id.cmp(&b.instrument_id))
}

/// Sort results best-first.
pub fn rank_results<'a>(
    results: impl IntoIterator<Item = &'a ScreeningResult>,
) -> Vec<&'a ScreeningResult> {
    let mut ranked: Vec<&ScreeningResult> = results.into_iter().collect();
    ranked.sort_by(|a, b| compare_results(a, b));
    ranked
}

/// Ranked qualifying results, truncated to `limit` when given.
pub fn top_qualified<'a>(
    results: impl IntoIterator<Item = &'a ScreeningResult>,
    limit: Option<usize>,
) -> Vec<&'a ScreeningResult> {
    let mut ranked = rank_results(results.into_iter().filter(|r| r.qualifies));
    if let Some(n) = limit {
        ranked.truncate(n);
    }
    ranked
}

fn desc_option(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclescreen_core::SkipReason;

    fn result(id: &str, qualifies: bool, ratio: Option<f64>, swings: usize) -> ScreeningResult {
        ScreeningResult {
            instrument_id: id.to_string(),
            swing_count: swings,
            hit_count: ratio.map(|r| (r * swings as f64).round() as usize).unwrap_or(0),
            hit_ratio: ratio,
            avg_return: ratio.map(|r| r * 10.0),
            qualifies,
            skip_reason: None,
        }
    }

    #[test]
    fn qualified_first_then_ratio() {
        let results = vec![
            result("LOW", false, Some(0.9), 10),
            result("MID", true, Some(0.6), 10),
            result("TOP", true, Some(0.8), 5),
        ];
        let ids: Vec<&str> = rank_results(&results)
            .iter()
            .map(|r| r.instrument_id.as_str())
            .collect();
        assert_eq!(ids, vec!["TOP", "MID", "LOW"]);
    }

    #[test]
    fn ties_broken_by_swings_then_id() {
        let results = vec![
            result("B", true, Some(0.5), 4),
            result("A", true, Some(0.5), 4),
            result("C", true, Some(0.5), 8),
        ];
        let ids: Vec<&str> = rank_results(&results)
            .iter()
            .map(|r| r.instrument_id.as_str())
            .collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn missing_ratio_sorts_last() {
        let results = vec![
            ScreeningResult::skipped("SKIP", SkipReason::LowVolume),
            result("ANY", false, Some(0.0), 2),
        ];
        let ranked = rank_results(&results);
        assert_eq!(ranked[0].instrument_id, "ANY");
    }

    #[test]
    fn top_qualified_filters_and_limits() {
        let results = vec![
            result("A", true, Some(0.7), 3),
            result("B", false, Some(0.9), 3),
            result("C", true, Some(0.9), 3),
        ];
        let top = top_qualified(&results, Some(1));
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].instrument_id, "C");
    }
}
