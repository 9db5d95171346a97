//! signal-runner: run the analysis pipeline over candle files and print the
//! signal bundle as JSON.
//!
//! Usage:
//!   signal-runner --primary es-15m.json --timeframe 15m
//!   signal-runner --primary es-15m.json --timeframe 15m --series 1h=es-1h.json --reference NQ=nq-15m.json
//!   signal-runner --primary es-15m.json --timeframe 5m --now 1719900000 --delayed --pretty

mod feed;

use std::path::PathBuf;

use analysis_core::{Candle, CandleFeed, Clock, Direction, FixedClock, SystemClock, Timeframe};
use analysis_orchestrator::{AnalysisConfig, AnalysisOrchestrator, MacroContext, MarketSnapshot};
use anyhow::{anyhow, bail, Context, Result};
use futures_util::future::join_all;

use crate::feed::FileFeed;

#[derive(Debug, Clone, PartialEq)]
struct RunArgs {
    symbol: String,
    timeframe: Timeframe,
    primary: PathBuf,
    series: Vec<(Timeframe, PathBuf)>,
    references: Vec<(String, PathBuf)>,
    usd_bias: Option<Direction>,
    macro_relevance: f64,
    now: Option<i64>,
    delayed: bool,
    pretty: bool,
}

fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

/// Every value following a repeatable `flag`
fn values_of<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}

fn split_pair<'a>(raw: &'a str, flag: &str) -> Result<(&'a str, PathBuf)> {
    let (key, path) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("{} expects KEY=FILE, got {:?}", flag, raw))?;
    Ok((key, PathBuf::from(path)))
}

fn parse_timeframe(raw: &str) -> Result<Timeframe> {
    Timeframe::parse(raw).with_context(|| format!("Unknown timeframe {:?}", raw))
}

fn parse_args(args: &[String]) -> Result<RunArgs> {
    let primary = value_of(args, "--primary").context("--primary FILE is required")?;
    let timeframe = parse_timeframe(value_of(args, "--timeframe").unwrap_or("15m"))?;

    let series = values_of(args, "--series")
        .into_iter()
        .map(|raw| {
            let (tf, path) = split_pair(raw, "--series")?;
            Ok((parse_timeframe(tf)?, path))
        })
        .collect::<Result<Vec<_>>>()?;

    let references = values_of(args, "--reference")
        .into_iter()
        .map(|raw| {
            let (symbol, path) = split_pair(raw, "--reference")?;
            Ok((symbol.to_string(), path))
        })
        .collect::<Result<Vec<_>>>()?;

    let usd_bias = match value_of(args, "--usd-bias").map(|s| s.to_ascii_uppercase()) {
        None => None,
        Some(s) if s == "LONG" => Some(Direction::Long),
        Some(s) if s == "SHORT" => Some(Direction::Short),
        Some(s) if s == "NEUTRAL" => Some(Direction::Neutral),
        Some(other) => bail!("--usd-bias expects LONG, SHORT or NEUTRAL, got {:?}", other),
    };
    let macro_relevance = match value_of(args, "--macro-relevance") {
        Some(raw) => raw.parse().with_context(|| format!("Invalid --macro-relevance {:?}", raw))?,
        None => 1.0,
    };

    let now = value_of(args, "--now")
        .map(|raw| raw.parse::<i64>().with_context(|| format!("Invalid --now {:?}", raw)))
        .transpose()?;

    Ok(RunArgs {
        symbol: value_of(args, "--symbol").unwrap_or("ES").to_string(),
        timeframe,
        primary: PathBuf::from(primary),
        series,
        references,
        usd_bias,
        macro_relevance,
        now,
        delayed: args.iter().any(|a| a == "--delayed"),
        pretty: args.iter().any(|a| a == "--pretty"),
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  signal-runner --primary FILE [--timeframe 15m] [--symbol ES]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --series TF=FILE        Extra timeframe of the same symbol (repeatable)");
    eprintln!("  --reference SYM=FILE    Correlated symbol for SMT (repeatable)");
    eprintln!("  --usd-bias DIR          USD macro bias: LONG, SHORT or NEUTRAL");
    eprintln!("  --macro-relevance X     Macro weight 0-1 (default: 1.0)");
    eprintln!("  --now UNIX              Evaluate at this time instead of the wall clock");
    eprintln!("  --delayed               Mark the feed as delayed");
    eprintln!("  --pretty                Pretty-print the JSON output");
}

async fn load_snapshot(run: &RunArgs) -> Result<MarketSnapshot> {
    let mut feed = FileFeed::new();
    feed.register(&run.symbol, run.timeframe, &run.primary);
    for (tf, path) in &run.series {
        feed.register(&run.symbol, *tf, path);
    }
    for (symbol, path) in &run.references {
        feed.register(symbol, run.timeframe, path);
    }

    let candles = feed
        .fetch(&run.symbol, run.timeframe)
        .await
        .with_context(|| format!("Failed to load primary series {}", run.primary.display()))?;

    let series_results = join_all(run.series.iter().map(|(tf, _)| feed.fetch(&run.symbol, *tf))).await;
    let reference_results = join_all(run.references.iter().map(|(symbol, _)| feed.fetch(symbol, run.timeframe))).await;

    let mut snapshot = MarketSnapshot::new(run.symbol.clone(), run.timeframe, candles);
    snapshot.delayed = run.delayed;
    snapshot.macro_context = run.usd_bias.map(|usd_bias| MacroContext {
        usd_bias,
        relevance: run.macro_relevance,
    });

    for ((tf, _), result) in run.series.iter().zip(series_results) {
        let candles: Vec<Candle> = result.with_context(|| format!("Failed to load {} series", tf))?;
        snapshot.series.insert(*tf, candles);
    }
    // A reference that fails to load only costs its SMT check
    for ((symbol, _), result) in run.references.iter().zip(reference_results) {
        match result {
            Ok(candles) => {
                snapshot.references.insert(symbol.clone(), candles);
            }
            Err(e) => tracing::warn!("Skipping reference {}: {}", symbol, e),
        }
    }

    Ok(snapshot)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signal_runner=info,analysis_orchestrator=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }
    let run = match parse_args(&args) {
        Ok(run) => run,
        Err(e) => {
            print_usage();
            return Err(e);
        }
    };

    let config = AnalysisConfig::from_env().context("Invalid analysis configuration")?;
    let clock: Box<dyn Clock> = match run.now {
        Some(ts) => Box::new(FixedClock(ts)),
        None => Box::new(SystemClock),
    };

    let snapshot = load_snapshot(&run).await?;
    tracing::info!(
        "Loaded {} {} candles for {} ({} extra series, {} references)",
        snapshot.candles.len(),
        snapshot.timeframe,
        snapshot.symbol,
        snapshot.series.len(),
        snapshot.references.len()
    );

    let bundle = AnalysisOrchestrator::new(config).analyze(&snapshot, clock.now())?;

    let json = if run.pretty {
        serde_json::to_string_pretty(&bundle)?
    } else {
        serde_json::to_string(&bundle)?
    };
    println!("{}", json);

    Ok(())
}
