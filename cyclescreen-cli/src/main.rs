//! CycleScreen CLI: screen a universe, inspect one instrument, write a starter config.
//!
//! Commands:
//! - `screen`: run the oscillator-cycle screen over a universe and save artifacts
//! - `inspect`: screen a single instrument and write its drill-down CSVs
//! - `init-config`: write a default TOML run config

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;

use cyclescreen_core::{ScreeningReport, ScreeningResult, Screener};
use cyclescreen_runner::export::{export_drilldown_csv, export_swings_csv};
use cyclescreen_runner::{
    rank_results, run_batch, save_artifacts, BarSource, BatchOptions, CachedSource, CancelToken,
    CsvDirSource, LogProgress, RunConfig, ScreenRun, SyntheticSource, Universe,
};

#[derive(Parser)]
#[command(
    name = "cyclescreen",
    about = "CycleScreen: find instruments whose oversold-to-overbought cycles pay off"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen every instrument in a universe.
    Screen {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        overrides: ScreenOverrides,

        /// Universe TOML file (markets with ticker lists).
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Comma-separated instrument ids, added to the universe.
        #[arg(long, value_delimiter = ',')]
        instruments: Vec<String>,

        /// Worker threads. Defaults to one per core.
        #[arg(long)]
        threads: Option<usize>,

        /// Rows to print from the ranked table.
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// Write drill-down CSVs for this many top qualifying instruments.
        #[arg(long, default_value_t = 0)]
        drilldown: usize,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output: PathBuf,
    },
    /// Screen one instrument and write its oscillator and swing tables.
    Inspect {
        /// Instrument id, e.g. EQNR.OL.
        symbol: String,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        overrides: ScreenOverrides,

        /// Output directory for the drill-down CSVs.
        #[arg(long, default_value = "results")]
        output: PathBuf,
    },
    /// Write a default run config.
    InitConfig {
        /// Destination TOML path.
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Where bars come from.
#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// Path to a TOML run config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of `{INSTRUMENT}.csv` files with date,close,volume columns.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Use seeded synthetic series instead of files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Seed for synthetic series.
    #[arg(long)]
    seed: Option<u64>,

    /// Start date (YYYY-MM-DD). Defaults to `years` before the end date.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,
}

/// Screening parameters that override the config file.
#[derive(Args, Debug, Default)]
struct ScreenOverrides {
    /// Oscillator period.
    #[arg(long)]
    period: Option<usize>,

    /// Oversold threshold.
    #[arg(long)]
    low: Option<f64>,

    /// Overbought threshold.
    #[arg(long)]
    high: Option<f64>,

    /// Minimum mean daily volume.
    #[arg(long)]
    min_volume: Option<f64>,

    /// Minimum number of completed swings.
    #[arg(long)]
    min_swings: Option<usize>,

    /// Return (percent) a swing needs to count as a hit.
    #[arg(long)]
    min_return: Option<f64>,

    /// Fraction of swings that must be hits (0..=1).
    #[arg(long)]
    min_hit_ratio: Option<f64>,

    /// Minimum number of bars.
    #[arg(long)]
    min_bars: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Screen {
            source,
            overrides,
            universe,
            instruments,
            threads,
            top,
            drilldown,
            output,
        } => {
            let mut config = load_config(&source, &overrides)?;
            if universe.is_some() {
                config.universe.file = universe;
            }
            config.universe.instruments.extend(instruments);
            if threads.is_some() {
                config.batch.threads = threads;
            }
            config.validate()?;
            if config.data.synthetic {
                run_screen(&config, SyntheticSource::new(config.data.seed), top, drilldown, &output)
            } else {
                run_screen(&config, csv_source(&config)?, top, drilldown, &output)
            }
        }
        Commands::Inspect {
            symbol,
            source,
            overrides,
            output,
        } => {
            let config = load_config(&source, &overrides)?;
            config.validate()?;
            if config.data.synthetic {
                run_inspect(&config, &SyntheticSource::new(config.data.seed), &symbol, &output)
            } else {
                run_inspect(&config, &csv_source(&config)?, &symbol, &output)
            }
        }
        Commands::InitConfig { path, force } => run_init_config(&path, force),
    }
}

// ── Configuration ──

fn load_config(source: &SourceArgs, overrides: &ScreenOverrides) -> Result<RunConfig> {
    let mut config = match &source.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    apply_source_args(&mut config, source);
    apply_overrides(&mut config, overrides);
    Ok(config)
}

fn apply_source_args(config: &mut RunConfig, args: &SourceArgs) {
    if let Some(dir) = &args.data_dir {
        config.data.data_dir = Some(dir.clone());
        config.data.synthetic = false;
    }
    if args.synthetic {
        config.data.synthetic = true;
    }
    if let Some(seed) = args.seed {
        config.data.seed = seed;
    }
    if args.start.is_some() {
        config.data.start = args.start;
    }
    if args.end.is_some() {
        config.data.end = args.end;
    }
}

fn apply_overrides(config: &mut RunConfig, o: &ScreenOverrides) {
    let s = &mut config.screen;
    if let Some(v) = o.period {
        s.period = v;
    }
    if let Some(v) = o.low {
        s.low_threshold = v;
    }
    if let Some(v) = o.high {
        s.high_threshold = v;
    }
    if let Some(v) = o.min_volume {
        s.min_avg_volume = v;
    }
    if let Some(v) = o.min_swings {
        s.min_swing_count = v;
    }
    if let Some(v) = o.min_return {
        s.min_return_pct = v;
    }
    if let Some(v) = o.min_hit_ratio {
        s.min_hit_ratio = v;
    }
    if let Some(v) = o.min_bars {
        s.min_bars = v;
    }
}

fn csv_source(config: &RunConfig) -> Result<CsvDirSource> {
    let dir = config
        .data
        .data_dir
        .as_ref()
        .context("no data directory configured")?;
    if !dir.is_dir() {
        bail!("data directory does not exist: {}", dir.display());
    }
    Ok(CsvDirSource::new(dir))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// ── screen ──

fn run_screen<S: BarSource>(
    config: &RunConfig,
    source: S,
    top: usize,
    drilldown: usize,
    output: &Path,
) -> Result<()> {
    let screener = Screener::new(config.screen.clone())?;
    let universe: Universe = config.load_universe()?;
    let instruments = universe.all_instruments();
    let range = config.date_range(today())?;
    info!(
        "universe: {} instruments across {} market(s)",
        instruments.len(),
        universe.market_names().len()
    );

    let source = CachedSource::new(source, config.screen.period);
    let options = BatchOptions {
        range,
        threads: config.batch.threads,
    };
    let progress = LogProgress {
        every: config.batch.progress_every,
    };
    let report = run_batch(
        &instruments,
        &source,
        &screener,
        &options,
        &progress,
        &CancelToken::new(),
    )?;

    let ranked = rank_results(report.results());
    print_ranked(&ranked, top);

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("{} instrument(s) failed:", failures.len());
        for f in failures.iter().take(10) {
            println!("  {}: {}", f.instrument, f.cause);
        }
        if failures.len() > 10 {
            println!("  ... see failures.csv");
        }
    }

    let source_name = source.inner().name().to_string();
    let run = ScreenRun::new(config.screen.clone(), range, &source_name, report);
    let run_dir = save_artifacts(&run, output)?;

    let drill: Vec<&ScreeningResult> = rank_results(run.report.qualified())
        .into_iter()
        .take(drilldown)
        .collect();
    for result in drill {
        let bars = source.get(&result.instrument_id, range)?;
        if let Some(report) = run.report.report_for(&result.instrument_id) {
            write_drilldown(&run_dir, &result.instrument_id, &bars, report)?;
        }
    }

    println!();
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn print_ranked(ranked: &[&ScreeningResult], top: usize) {
    let qualified = ranked.iter().filter(|r| r.qualifies).count();
    println!();
    println!(
        "=== Screening Result: {qualified} of {} qualify ===",
        ranked.len()
    );
    println!(
        "{:>4} {:<14} {:>6} {:>5} {:>9} {:>9}  {}",
        "#", "Instrument", "Swings", "Hits", "Hit ratio", "Avg ret", "Verdict"
    );
    println!("{}", "-".repeat(66));
    for (i, r) in ranked.iter().take(top).enumerate() {
        let verdict = match (r.qualifies, r.skip_reason) {
            (true, _) => "QUALIFIES".to_string(),
            (false, Some(reason)) => format!("skipped: {reason}"),
            (false, None) => "-".to_string(),
        };
        println!(
            "{:>4} {:<14} {:>6} {:>5} {:>9} {:>9}  {}",
            i + 1,
            r.instrument_id,
            r.swing_count,
            r.hit_count,
            r.hit_ratio
                .map(|v| format!("{:.1}%", v * 100.0))
                .unwrap_or_else(|| "-".into()),
            r.avg_return
                .map(|v| format!("{v:.2}%"))
                .unwrap_or_else(|| "-".into()),
            verdict
        );
    }
    if ranked.len() > top {
        println!("({} more in results.csv)", ranked.len() - top);
    }
}

fn write_drilldown(
    dir: &Path,
    instrument: &str,
    bars: &[cyclescreen_core::Bar],
    report: &ScreeningReport,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    let drill_path = dir.join(format!("{instrument}_drilldown.csv"));
    std::fs::write(&drill_path, export_drilldown_csv(bars, report)?)?;
    let swings_path = dir.join(format!("{instrument}_swings.csv"));
    std::fs::write(&swings_path, export_swings_csv(&report.swings)?)?;
    Ok((drill_path, swings_path))
}

// ── inspect ──

fn run_inspect<S: BarSource>(
    config: &RunConfig,
    source: &S,
    symbol: &str,
    output: &Path,
) -> Result<()> {
    let screener = Screener::new(config.screen.clone())?;
    let range = config.date_range(today())?;
    let bars = source.fetch(symbol, range)?;
    let report = screener.screen(symbol, &bars)?;
    let r = &report.result;

    println!();
    println!("=== {symbol} ===");
    println!("Period:         {} to {}", range.start, range.end);
    println!("Bars:           {}", bars.len());
    if let Some(v) = report.mean_volume {
        println!("Mean volume:    {v:.0}");
    }
    if let Some(reason) = r.skip_reason {
        println!("Skipped:        {reason}");
    }
    println!("Swings:         {}", r.swing_count);
    println!("Hits:           {}", r.hit_count);
    if let Some(ratio) = r.hit_ratio {
        println!("Hit ratio:      {:.1}%", ratio * 100.0);
    }
    if let Some(avg) = r.avg_return {
        println!("Avg return:     {avg:.2}%");
    }
    println!("Qualifies:      {}", if r.qualifies { "yes" } else { "no" });

    if !report.swings.is_empty() {
        println!();
        println!(
            "{:<12} {:>10} {:<12} {:>10} {:>5} {:>8}",
            "Start", "Price", "End", "Price", "Bars", "Return"
        );
        println!("{}", "-".repeat(62));
        for s in &report.swings {
            println!(
                "{:<12} {:>10.2} {:<12} {:>10.2} {:>5} {:>7.2}%{}",
                s.swing.start_date.to_string(),
                s.swing.start_price,
                s.swing.end_date.to_string(),
                s.swing.end_price,
                s.swing.bars_held(),
                s.return_pct,
                if s.is_hit { " *" } else { "" }
            );
        }
    }

    let (drill, swings) = write_drilldown(output, symbol, &bars, &report)?;
    println!();
    println!("Drill-down: {}", drill.display());
    println!("Swings:     {}", swings.display());
    Ok(())
}

// ── init-config ──

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (pass --force to overwrite)", path.display());
    }
    let mut config = RunConfig::default();
    config.data.data_dir = Some(PathBuf::from("data"));
    config.universe.file = Some(PathBuf::from("universe.toml"));
    std::fs::write(path, config.to_toml()?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
