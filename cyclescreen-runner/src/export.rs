//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: the full screening run with schema versioning
//! - **CSV**: ranked results, failures, swings and oscillator drill-down
//! - **Markdown**: a human-readable summary of a run
//!
//! Persisted runs include a `schema_version` field. Newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use cyclescreen_core::{Bar, ScreenConfig, ScreeningReport, ScreeningResult, SwingResult};

use crate::batch::{BatchReport, InstrumentFailure};
use crate::ranking::rank_results;
use crate::source::DateRange;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// A complete screening run as persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenRun {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: ScreenConfig,
    pub config_hash: String,
    pub range: DateRange,
    pub source: String,
    pub report: BatchReport,
}

impl ScreenRun {
    pub fn new(config: ScreenConfig, range: DateRange, source: &str, report: BatchReport) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            config_hash: config.config_hash(),
            config,
            range,
            source: source.to_string(),
            report,
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(run: &ScreenRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("failed to serialize screening run to JSON")
}

/// Deserialize a run, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ScreenRun> {
    let run: ScreenRun =
        serde_json::from_str(json).context("failed to deserialize screening run from JSON")?;
    if run.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            run.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(run)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|x| format!("{x:.decimals$}")).unwrap_or_default()
}

/// Columns: rank, instrument, swing_count, hit_count, hit_ratio, avg_return,
/// qualifies, skip_reason
pub fn export_results_csv(results: &[&ScreeningResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "instrument",
        "swing_count",
        "hit_count",
        "hit_ratio",
        "avg_return",
        "qualifies",
        "skip_reason",
    ])?;

    for (i, r) in results.iter().enumerate() {
        wtr.write_record([
            &(i + 1).to_string(),
            &r.instrument_id,
            &r.swing_count.to_string(),
            &r.hit_count.to_string(),
            &fmt_opt(r.hit_ratio, 4),
            &fmt_opt(r.avg_return, 4),
            &r.qualifies.to_string(),
            r.skip_reason.map(|s| s.as_str()).unwrap_or(""),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: instrument, kind, cause
pub fn export_failures_csv<'a>(
    failures: impl IntoIterator<Item = &'a InstrumentFailure>,
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["instrument", "kind", "cause"])?;
    for f in failures {
        wtr.write_record([f.instrument.as_str(), f.kind.as_str(), &f.cause])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: start_date, start_price, end_date, end_price, bars_held, return_pct, is_hit
pub fn export_swings_csv(swings: &[SwingResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "start_date",
        "start_price",
        "end_date",
        "end_price",
        "bars_held",
        "return_pct",
        "is_hit",
    ])?;
    for s in swings {
        wtr.write_record([
            &s.swing.start_date.to_string(),
            &format!("{:.6}", s.swing.start_price),
            &s.swing.end_date.to_string(),
            &format!("{:.6}", s.swing.end_price),
            &s.swing.bars_held().to_string(),
            &format!("{:.4}", s.return_pct),
            &s.is_hit.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Close, volume and oscillator per bar for charting one instrument.
///
/// Columns: date, close, volume, oscillator (blank where undefined or not computed)
pub fn export_drilldown_csv(bars: &[Bar], report: &ScreeningReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "close", "volume", "oscillator"])?;
    for (i, bar) in bars.iter().enumerate() {
        let value = report
            .oscillator
            .as_ref()
            .and_then(|points| points.get(i))
            .and_then(|p| p.value);
        wtr.write_record([
            &bar.date.to_string(),
            &format!("{:.6}", bar.close),
            &format!("{:.0}", bar.volume),
            &fmt_opt(value, 4),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a screening run.
///
/// Creates `screen_{timestamp}/` under `output_dir` containing:
/// - `run.json`: the full `ScreenRun`
/// - `results.csv`: every screened instrument, ranked
/// - `failures.csv`: instruments that could not be screened
/// - `report.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(run: &ScreenRun, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("screen_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("run.json"), export_json(run)?)?;

    let ranked = rank_results(run.report.results());
    std::fs::write(run_dir.join("results.csv"), export_results_csv(&ranked)?)?;
    std::fs::write(
        run_dir.join("failures.csv"),
        export_failures_csv(run.report.failures())?,
    )?;
    std::fs::write(run_dir.join("report.md"), generate_report(run))?;

    Ok(run_dir)
}

/// Load a `ScreenRun` from an artifact directory's run.json.
pub fn load_artifacts(dir: &Path) -> Result<ScreenRun> {
    let path = dir.join("run.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown summary for a screening run.
pub fn generate_report(run: &ScreenRun) -> String {
    let mut md = String::with_capacity(2048);
    let c = &run.config;
    let s = run.report.summary();

    md.push_str("# Screening Report\n\n");

    md.push_str("## Configuration\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Period | {} to {} |\n", run.range.start, run.range.end));
    md.push_str(&format!("| Source | {} |\n", run.source));
    md.push_str(&format!("| RSI period | {} |\n", c.period));
    md.push_str(&format!(
        "| Thresholds | {} / {} |\n",
        c.low_threshold, c.high_threshold
    ));
    md.push_str(&format!("| Min avg volume | {:.0} |\n", c.min_avg_volume));
    md.push_str(&format!("| Min swings | {} |\n", c.min_swing_count));
    md.push_str(&format!("| Min return | {}% |\n", c.min_return_pct));
    md.push_str(&format!("| Min hit ratio | {:.2} |\n", c.min_hit_ratio));
    md.push_str(&format!("| Config hash | {} |\n", run.config_hash));
    md.push('\n');

    md.push_str("## Summary\n\n");
    md.push_str(&format!(
        "{} instruments: {} screened, {} qualified, {} skipped, {} failed",
        s.total, s.screened, s.qualified, s.skipped, s.failed
    ));
    if run.report.cancelled {
        md.push_str(&format!(" ({} not started, run cancelled)", s.not_started));
    }
    md.push_str("\n\n");

    let qualified = rank_results(run.report.qualified());
    md.push_str("## Qualified\n\n");
    if qualified.is_empty() {
        md.push_str("No instruments matched the criteria.\n");
    } else {
        md.push_str("| # | Instrument | Swings | Hit ratio | Avg return |\n");
        md.push_str("| ---: | --- | ---: | ---: | ---: |\n");
        for (i, r) in qualified.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% | {} |\n",
                i + 1,
                r.instrument_id,
                r.swing_count,
                r.hit_ratio.unwrap_or(0.0) * 100.0,
                r.avg_return
                    .map(|v| format!("{v:.2}%"))
                    .unwrap_or_else(|| "-".into())
            ));
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{FailureKind, InstrumentOutcome};
    use chrono::NaiveDate;
    use cyclescreen_core::{OscillatorPoint, SkipReason, Swing};

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        )
    }

    fn screened(id: &str, qualifies: bool) -> InstrumentOutcome {
        InstrumentOutcome::Screened(ScreeningReport {
            result: ScreeningResult {
                instrument_id: id.to_string(),
                swing_count: 4,
                hit_count: 3,
                hit_ratio: Some(0.75),
                avg_return: Some(12.5),
                qualifies,
                skip_reason: None,
            },
            mean_volume: Some(1000.0),
            oscillator: None,
            swings: vec![],
        })
    }

    fn sample_run() -> ScreenRun {
        let report = BatchReport {
            outcomes: vec![
                screened("AAA", true),
                InstrumentOutcome::Screened(ScreeningReport {
                    result: ScreeningResult::skipped("THIN", SkipReason::LowVolume),
                    mean_volume: Some(10.0),
                    oscillator: None,
                    swings: vec![],
                }),
                InstrumentOutcome::Failed(InstrumentFailure {
                    instrument: "BAD".into(),
                    kind: FailureKind::MalformedBars,
                    cause: "bar 3: close must be positive".into(),
                }),
            ],
            total: 3,
            cancelled: false,
            elapsed_secs: 0.5,
        };
        ScreenRun::new(ScreenConfig::default(), range(), "synthetic", report)
    }

    #[test]
    fn json_roundtrip_and_version_check() {
        let run = sample_run();
        let json = export_json(&run).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.report.outcomes, run.report.outcomes);
        assert_eq!(back.config_hash, run.config_hash);

        let future = json.replace("\"schema_version\": 1", "\"schema_version\": 99");
        assert!(import_json(&future).is_err());
    }

    #[test]
    fn screened_run_reads_back_bit_identical() {
        use crate::batch::{run_batch, BatchOptions, CancelToken, NoProgress};
        use crate::source::SyntheticSource;
        use cyclescreen_core::Screener;

        let config = ScreenConfig {
            min_return_pct: 3.0,
            ..Default::default()
        };
        let screener = Screener::new(config.clone()).unwrap();
        let ids: Vec<String> = (0..4).map(|i| format!("SYN{i}")).collect();
        let year = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        let options = BatchOptions {
            range: year,
            threads: None,
        };
        let report = run_batch(
            &ids,
            &SyntheticSource::default(),
            &screener,
            &options,
            &NoProgress,
            &CancelToken::new(),
        )
        .unwrap();
        assert!(report.reports().any(|r| !r.swings.is_empty()));

        let run = ScreenRun::new(config, year, "synthetic", report);
        let back = import_json(&export_json(&run).unwrap()).unwrap();

        assert_eq!(back.report.outcomes, run.report.outcomes);
        for (a, b) in run.report.results().zip(back.report.results()) {
            assert_eq!(a.avg_return.map(f64::to_bits), b.avg_return.map(f64::to_bits));
        }
    }

    #[test]
    fn results_csv_has_rank_and_blank_optionals() {
        let run = sample_run();
        let ranked = rank_results(run.report.results());
        let csv = export_results_csv(&ranked).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("rank,instrument"));
        assert_eq!(lines[1], "1,AAA,4,3,0.7500,12.5000,true,");
        assert_eq!(lines[2], "2,THIN,0,0,,,false,low_volume");
    }

    #[test]
    fn failures_csv_uses_snake_case_kind() {
        let run = sample_run();
        let csv = export_failures_csv(run.report.failures()).unwrap();
        assert!(csv.contains("BAD,malformed_bars,"));
    }

    #[test]
    fn drilldown_blank_where_undefined() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bars = vec![Bar::new(d, 10.0, 100.0), Bar::new(d.succ_opt().unwrap(), 11.0, 200.0)];
        let report = ScreeningReport {
            result: ScreeningResult::skipped("X", SkipReason::TooFewSwings),
            mean_volume: Some(150.0),
            oscillator: Some(vec![
                OscillatorPoint { date: d, value: None },
                OscillatorPoint {
                    date: d.succ_opt().unwrap(),
                    value: Some(100.0),
                },
            ]),
            swings: vec![],
        };
        let csv = export_drilldown_csv(&bars, &report).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "2024-01-02,10.000000,100,");
        assert_eq!(lines[2], "2024-01-03,11.000000,200,100.0000");
    }

    #[test]
    fn swings_csv_rows() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let swing = SwingResult {
            swing: Swing {
                start_index: 1,
                start_date: d,
                start_price: 10.0,
                end_index: 4,
                end_date: d + chrono::Duration::days(3),
                end_price: 11.5,
            },
            return_pct: 15.0,
            is_hit: true,
        };
        let csv = export_swings_csv(&[swing]).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with(",3,15.0000,true"));
    }

    #[test]
    fn save_and_load_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let run = sample_run();
        let run_dir = save_artifacts(&run, dir.path()).unwrap();

        assert!(run_dir.join("results.csv").exists());
        assert!(run_dir.join("failures.csv").exists());
        let md = std::fs::read_to_string(run_dir.join("report.md")).unwrap();
        assert!(md.contains("| 1 | AAA | 4 | 75.0% | 12.50% |"));

        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.report.total, 3);
    }
}
