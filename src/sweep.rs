//! Parameter Sweep Module
//!
//! Runs the remote backtest for every entry/target combination with bounded
//! concurrency and ranks the aggregated results.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregator::aggregate;
use crate::supabase::MarketDataService;
use crate::types::{AggregationInputs, BacktestParams, Summary};

/// Entry/target pair for one sweep run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepParams {
    pub entry_spread: f64,
    pub target_margin: f64,
}

/// Results from a single backtest run
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub params: SweepParams,
    pub summary: Summary,
}

#[derive(Serialize)]
struct SweepRow {
    entry_spread: f64,
    target_margin: f64,
    total_trades: u32,
    wins: u32,
    win_rate: f64,
    gross_return: f64,
    net_return: f64,
    net_profit: f64,
    final_equity: f64,
}

/// Generate all parameter combinations
pub fn generate_combinations(entries: &[f64], targets: &[f64]) -> Vec<SweepParams> {
    let mut combinations = Vec::with_capacity(entries.len() * targets.len());

    for &entry_spread in entries {
        for &target_margin in targets {
            combinations.push(SweepParams {
                entry_spread,
                target_margin,
            });
        }
    }

    combinations
}

/// Parse a comma-separated list such as "0,0.5,1.0"
pub fn parse_values(list: &str) -> Result<Vec<f64>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("Invalid number in list: {}", s))
        })
        .collect()
}

/// Run parameter sweep against the remote engine.
///
/// A combination whose request fails is logged and left out of the results.
/// Results are ordered by net profit, best first.
pub async fn run_sweep(
    service: Arc<dyn MarketDataService>,
    combinations: Vec<SweepParams>,
    period_days: u32,
    inputs: AggregationInputs,
    concurrency: usize,
) -> Vec<SweepResult> {
    let total = combinations.len();
    let completed = AtomicUsize::new(0);
    let start = std::time::Instant::now();

    info!(
        "Running {} parameter combinations ({} at a time)...",
        total, concurrency
    );

    let mut results: Vec<SweepResult> = stream::iter(combinations)
        .map(|params| {
            let service = service.clone();
            let completed = &completed;
            async move {
                let request = BacktestParams {
                    entry_spread: params.entry_spread,
                    target_margin: params.target_margin,
                    period_days,
                    capital: Some(inputs.capital),
                    fee_rate: Some(inputs.fee_rate),
                };
                let outcome = service.simulate_backtest(&request).await;

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 10 == 0 || done == total {
                    info!("[{}/{}] combinations done", done, total);
                }

                match outcome {
                    Ok(trades) => Some(SweepResult {
                        params,
                        summary: aggregate(&trades, &inputs).summary,
                    }),
                    Err(e) => {
                        warn!(
                            "Sweep entry={} target={} failed: {:#}",
                            params.entry_spread, params.target_margin, e
                        );
                        None
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|r| async move { r })
        .collect()
        .await;

    results.sort_by(|a, b| b.summary.net_profit.total_cmp(&a.summary.net_profit));

    info!(
        "Sweep completed: {}/{} combinations in {:.1}s",
        results.len(),
        total,
        start.elapsed().as_secs_f64()
    );

    results
}

/// Write results to CSV
pub fn write_csv(results: &[SweepResult], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for result in results {
        let s = &result.summary;
        writer.serialize(SweepRow {
            entry_spread: result.params.entry_spread,
            target_margin: result.params.target_margin,
            total_trades: s.total_trades,
            wins: s.wins,
            win_rate: s.win_rate,
            gross_return: s.gross_return,
            net_return: s.net_return,
            net_profit: s.net_profit,
            final_equity: s.final_equity,
        })?;
    }

    writer.flush()?;
    info!("Results written to {}", path.display());
    Ok(())
}
