//! Backtest simulation runs
//!
//! Each request fetches a fresh trade list and aggregates it. The newest
//! completed request owns the published result; a slower, older request
//! finishing afterwards is handed back to its caller but never replaces it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregator::aggregate;
use crate::config::SimulationDefaults;
use crate::supabase::MarketDataService;
use crate::types::{AggregationInputs, Aggregation, BacktestParams};

/// One completed simulation request
#[derive(Debug, Clone, Serialize)]
pub struct SimulationRun {
    pub id: Uuid,
    /// Request order; higher is newer
    pub sequence: u64,
    pub requested_at: DateTime<Utc>,
    pub params: BacktestParams,
    pub inputs: AggregationInputs,
    #[serde(flatten)]
    pub result: Aggregation,
}

pub struct SimulationDesk {
    service: Arc<dyn MarketDataService>,
    defaults: SimulationDefaults,
    next_sequence: AtomicU64,
    latest: RwLock<Option<SimulationRun>>,
}

impl SimulationDesk {
    pub fn new(service: Arc<dyn MarketDataService>, defaults: SimulationDefaults) -> Self {
        Self {
            service,
            defaults,
            next_sequence: AtomicU64::new(1),
            latest: RwLock::new(None),
        }
    }

    /// Run one simulation. Inputs are captured when the request starts.
    pub async fn run(&self, params: BacktestParams) -> Result<SimulationRun> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let requested_at = Utc::now();
        let inputs = self.defaults.resolve(params.capital, params.fee_rate);

        let trades = self
            .service
            .simulate_backtest(&params)
            .await
            .context("Backtest simulation request failed")?;

        let run = SimulationRun {
            id: Uuid::new_v4(),
            sequence,
            requested_at,
            params,
            inputs,
            result: aggregate(&trades, &inputs),
        };

        info!(
            "Simulation #{}: {} trades, win rate {:.1}%, net profit {:.0}",
            sequence,
            run.result.summary.total_trades,
            run.result.summary.win_rate,
            run.result.summary.net_profit
        );

        self.publish(&run).await;
        Ok(run)
    }

    /// Replace the published run unless a newer request already landed
    async fn publish(&self, run: &SimulationRun) {
        let mut latest = self.latest.write().await;
        match latest.as_ref() {
            Some(current) if current.sequence > run.sequence => {
                debug!(
                    "Discarding stale simulation #{} (#{} already published)",
                    run.sequence, current.sequence
                );
            }
            _ => *latest = Some(run.clone()),
        }
    }

    pub async fn latest(&self) -> Option<SimulationRun> {
        self.latest.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketCandle, SpreadHeatmapCell, TradeRecord};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Returns one trade per request whose exit spread equals the target
    /// margin. Requests whose entry spread has a gate wait for it to open.
    #[derive(Default)]
    struct StubService {
        gates: Mutex<HashMap<u64, oneshot::Receiver<()>>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl MarketDataService for StubService {
        async fn get_candles(&self, _: u32) -> Result<Vec<MarketCandle>> {
            Ok(vec![])
        }

        async fn get_spread_heatmap(&self, _: u32) -> Result<Vec<SpreadHeatmapCell>> {
            Ok(vec![])
        }

        async fn simulate_backtest(&self, params: &BacktestParams) -> Result<Vec<TradeRecord>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("service unavailable"));
            }
            let gate = self
                .gates
                .lock()
                .unwrap()
                .remove(&(params.entry_spread as u64));
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(vec![TradeRecord {
                entry_at: Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap(),
                exit_at: Utc.with_ymd_and_hms(2025, 1, 6, 1, 0, 0).unwrap(),
                entry_spread: 0.0,
                exit_spread: params.target_margin,
            }])
        }
    }

    fn params(entry_spread: f64, target_margin: f64) -> BacktestParams {
        BacktestParams {
            entry_spread,
            target_margin,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_applies_defaults() {
        let desk = SimulationDesk::new(Arc::new(StubService::default()), SimulationDefaults::default());
        let run = desk.run(params(0.0, 1.24)).await.unwrap();

        assert_eq!(run.inputs.capital, 600_000.0);
        assert_eq!(run.inputs.fee_rate, 0.24);
        assert_eq!(run.result.summary.total_trades, 1);
        assert!((run.result.summary.net_profit - 3_000.0).abs() < 1e-6);

        let latest = desk.latest().await.unwrap();
        assert_eq!(latest.id, run.id);
    }

    #[tokio::test]
    async fn test_new_run_replaces_previous() {
        let desk = SimulationDesk::new(Arc::new(StubService::default()), SimulationDefaults::default());
        desk.run(params(0.0, 1.0)).await.unwrap();
        let second = desk.run(params(0.0, 2.0)).await.unwrap();

        let latest = desk.latest().await.unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.result.trades.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_run_is_discarded() {
        let (open_gate, gate) = oneshot::channel();
        let service = StubService::default();
        service.gates.lock().unwrap().insert(1, gate);
        let desk = Arc::new(SimulationDesk::new(Arc::new(service), SimulationDefaults::default()));

        // The older request blocks until the newer one has been published
        let slow_desk = desk.clone();
        let slow = tokio::spawn(async move { slow_desk.run(params(1.0, 1.0)).await });
        tokio::task::yield_now().await;
        while desk.next_sequence.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        let fast = desk.run(params(2.0, 2.0)).await.unwrap();
        open_gate.send(()).unwrap();
        let slow = slow.await.unwrap().unwrap();

        assert!(slow.sequence < fast.sequence);
        assert_eq!(desk.latest().await.unwrap().id, fast.id);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_result() {
        let service = Arc::new(StubService::default());
        let desk = SimulationDesk::new(service.clone(), SimulationDefaults::default());
        let first = desk.run(params(0.0, 1.0)).await.unwrap();

        service.fail.store(true, Ordering::SeqCst);
        let err = desk.run(params(0.0, 2.0)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("service unavailable"));

        assert_eq!(desk.latest().await.unwrap().id, first.id);
    }
}
