use std::sync::Arc;

use analysis_core::AnalysisSection;
use analysis_orchestrator::{render_text, AnalysisOrchestrator, DashboardConfig, Watchlist, WatchlistResult};
use anyhow::{Context, Result};
use clap::Parser;

mod cli;

use cli::{Cli, Command};

const DEFAULT_LOG_FILTER: &str = "finsight_cli=info,analysis_orchestrator=info,market_data_client=warn";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = DashboardConfig::from_env().context("failed to load configuration")?;
    if config.fred_api_key.is_none() {
        tracing::info!("FRED_API_KEY not set, using default risk-free rate {}", config.default_risk_free_rate);
    }
    let orchestrator = Arc::new(AnalysisOrchestrator::new(config));

    match cli.command {
        Command::Analyze { symbol, json } => {
            let report = orchestrator
                .analyze_equity(&symbol)
                .await
                .with_context(|| format!("analysis of {} failed", symbol))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_text(&report));
            }
        }
        Command::Crypto { pair, interval, json } => {
            let report = orchestrator
                .analyze_crypto(&pair, interval)
                .await
                .with_context(|| format!("analysis of {} failed", pair))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_text(&report));
            }
        }
        Command::Technicals { symbol, interval } => {
            let section = orchestrator
                .analyze_technicals(&symbol, interval)
                .await
                .with_context(|| format!("technical analysis of {} failed", symbol))?;
            print_section(&symbol, &section);
        }
        Command::Watchlist { symbols, concurrency } => {
            let result = Watchlist::new(Arc::clone(&orchestrator), concurrency).run(symbols).await;
            print_watchlist(&result);
        }
        Command::Yields => {
            let curve = orchestrator
                .get_yield_curve()
                .await
                .context("failed to fetch the Treasury yield curve")?;
            for point in &curve.points {
                println!("{:>4}  {:>6.2}%  ({})", point.maturity_label, point.yield_pct, point.date);
            }
            if let Some(spread) = curve.spread("2Y", "10Y") {
                println!("10Y-2Y spread: {:+.2} points", spread);
            }
            if curve.is_inverted() {
                println!("The curve is inverted.");
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    let json_logging = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so reports can be piped
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_section(symbol: &str, section: &AnalysisSection) {
    println!(
        "{} {}: {}  score {:+.0}  confidence {:.0}%",
        symbol.to_uppercase(),
        section.kind.title(),
        section.rating,
        section.score,
        section.confidence * 100.0
    );
    for line in &section.narrative {
        println!("  - {}", line);
    }
    if !section.signals.is_empty() {
        println!("  Signals: {}", section.reason());
    }
}

fn print_watchlist(result: &WatchlistResult) {
    println!("{:<4} {:<8} {:>10} {:>7} {:<9} {:>6}  Highlights", "#", "Symbol", "Price", "Score", "Rating", "Conf");
    for (i, entry) in result.ranked.iter().enumerate() {
        let price = entry.price.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<8} {:>10} {:>+7.0} {:<9} {:>5.0}%  {}",
            i + 1,
            entry.symbol,
            price,
            entry.overall_score,
            entry.overall_rating.to_string(),
            entry.confidence * 100.0,
            entry.highlights.join(", ")
        );
    }
    for failure in &result.failures {
        println!("{:<4} {:<8} failed: {}", "-", failure.symbol, failure.error);
    }
    println!(
        "{} of {} symbols analyzed at {}",
        result.ranked.len(),
        result.total_analyzed,
        result.timestamp.format("%Y-%m-%d %H:%M UTC")
    );
}
