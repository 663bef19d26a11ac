use super::AnalysisOrchestrator;
use analysis_core::{AnalysisError, CompleteAnalysis, Rating, SignalStrength};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

type SymbolTask = (String, Result<CompleteAnalysis, AnalysisError>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub overall_score: f64,
    pub overall_rating: Rating,
    pub overall_signal: SignalStrength,
    pub confidence: f64,
    pub highlights: Vec<String>,
}

impl From<&CompleteAnalysis> for WatchlistEntry {
    fn from(analysis: &CompleteAnalysis) -> Self {
        let highlights = analysis
            .sections
            .iter()
            .filter(|s| s.rating != Rating::Moderate && s.confidence > 0.5)
            .map(|s| format!("{}: {}", s.kind.title(), s.rating))
            .collect();

        Self {
            symbol: analysis.symbol.clone(),
            name: analysis.name.clone(),
            price: analysis.quote.as_ref().map(|q| q.price),
            overall_score: analysis.overall_score,
            overall_rating: analysis.overall_rating,
            overall_signal: analysis.overall_signal,
            confidence: analysis.overall_confidence,
            highlights,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistFailure {
    pub symbol: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistResult {
    /// Highest overall score first
    pub ranked: Vec<WatchlistEntry>,
    pub failures: Vec<WatchlistFailure>,
    pub total_analyzed: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Batch analysis of many equities with bounded concurrency.
pub struct Watchlist {
    orchestrator: Arc<AnalysisOrchestrator>,
    concurrency: usize,
}

impl Watchlist {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, concurrency: usize) -> Self {
        Self {
            orchestrator,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(&self, symbols: Vec<String>) -> WatchlistResult {
        let total_analyzed = symbols.len();
        tracing::info!("Analyzing watchlist of {} symbols", total_analyzed);

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut symbols_by_task = HashMap::new();

        for symbol in symbols {
            let orchestrator = Arc::clone(&self.orchestrator);
            let permits = Arc::clone(&permits);
            let task_symbol = symbol.clone();
            let handle = tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = orchestrator.analyze_equity(&task_symbol).await;
                (task_symbol, result)
            });
            symbols_by_task.insert(handle.id(), symbol);
        }

        let (mut ranked, mut failures) = collect(tasks, symbols_by_task).await;

        rank(&mut ranked);
        failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        tracing::info!(
            "Watchlist complete: {}/{} analyzed",
            ranked.len(),
            total_analyzed
        );

        WatchlistResult {
            ranked,
            failures,
            total_analyzed,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Drain the analysis tasks. A task that panicked or was cancelled is
/// reported as a failure for the symbol it was spawned for.
async fn collect(
    mut tasks: JoinSet<SymbolTask>,
    mut symbols_by_task: HashMap<Id, String>,
) -> (Vec<WatchlistEntry>, Vec<WatchlistFailure>) {
    let mut ranked = Vec::new();
    let mut failures = Vec::new();

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, (_, Ok(analysis)))) => ranked.push(WatchlistEntry::from(&analysis)),
            Ok((_, (symbol, Err(e)))) => {
                tracing::warn!("Failed to analyze {}: {}", symbol, e);
                failures.push(WatchlistFailure {
                    symbol,
                    error: e.to_string(),
                });
            }
            Err(e) => {
                let symbol = symbols_by_task
                    .remove(&e.id())
                    .unwrap_or_else(|| "<unknown>".to_string());
                tracing::error!("Watchlist task for {} failed: {}", symbol, e);
                failures.push(WatchlistFailure {
                    symbol,
                    error: e.to_string(),
                });
            }
        }
    }

    (ranked, failures)
}

/// Highest score first; ties broken by confidence, then symbol.
pub fn rank(entries: &mut [WatchlistEntry]) {
    entries.sort_by(|a, b| {
        b.overall_score
            .total_cmp(&a.overall_score)
            .then(b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}
