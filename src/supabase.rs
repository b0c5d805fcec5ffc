//! Supabase market data client
//!
//! The dashboard reads everything through three PostgREST remote procedures.
//! Calls are one-shot: failures are returned to the caller and never retried.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::config::SupabaseConfig;
use crate::types::{BacktestParams, MarketCandle, SpreadHeatmapCell, TradeRecord};

/// Remote source of candles, heatmap cells and backtest trades
#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Candles bucketed by `interval_minutes`, newest first
    async fn get_candles(&self, interval_minutes: u32) -> Result<Vec<MarketCandle>>;

    /// Average spread per weekly slot, keyed in UTC
    async fn get_spread_heatmap(&self, segment_minutes: u32) -> Result<Vec<SpreadHeatmapCell>>;

    /// Trades the remote engine finds for the given thresholds
    async fn simulate_backtest(&self, params: &BacktestParams) -> Result<Vec<TradeRecord>>;
}

#[derive(Serialize)]
struct CandlesArgs {
    interval_minutes: u32,
}

#[derive(Serialize)]
struct HeatmapArgs {
    segment_minutes: u32,
}

/// `simulate_backtest` takes the exit threshold as `exit_spread`. Capital and
/// fee rate only feed local aggregation and are never sent.
#[derive(Serialize)]
struct BacktestArgs {
    entry_spread: f64,
    exit_spread: f64,
    period_days: u32,
}

impl From<&BacktestParams> for BacktestArgs {
    fn from(params: &BacktestParams) -> Self {
        Self {
            entry_spread: params.entry_spread,
            exit_spread: params.target_margin,
            period_days: params.period_days,
        }
    }
}

/// PostgREST RPC client
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        })
    }

    /// Invoke a remote procedure and decode its row set.
    /// A `null` body is an empty result.
    async fn rpc<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        function: &str,
        args: &T,
    ) -> Result<Vec<R>> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Content-Type", "application/json")
            .json(args)
            .send()
            .await
            .with_context(|| format!("Failed to call {}", function))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("RPC {} failed ({}): {}", function, status, body);
            return Err(anyhow!("RPC {} failed ({}): {}", function, status, body));
        }

        let rows: Option<Vec<R>> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", function))?;

        Ok(rows.unwrap_or_default())
    }
}

#[async_trait]
impl MarketDataService for SupabaseClient {
    async fn get_candles(&self, interval_minutes: u32) -> Result<Vec<MarketCandle>> {
        debug!("Fetching candles with interval: {}m", interval_minutes);

        let candles: Vec<MarketCandle> = self
            .rpc("get_market_candles", &CandlesArgs { interval_minutes })
            .await?;

        debug!("Fetched {} candles", candles.len());
        Ok(candles)
    }

    async fn get_spread_heatmap(&self, segment_minutes: u32) -> Result<Vec<SpreadHeatmapCell>> {
        debug!("Fetching heatmap with segment: {}m", segment_minutes);
        self.rpc("get_spread_heatmap", &HeatmapArgs { segment_minutes })
            .await
    }

    async fn simulate_backtest(&self, params: &BacktestParams) -> Result<Vec<TradeRecord>> {
        debug!(
            "Simulating backtest: entry={} target={} period={}d",
            params.entry_spread, params.target_margin, params.period_days
        );

        let trades: Vec<TradeRecord> = self
            .rpc("simulate_backtest", &BacktestArgs::from(params))
            .await?;

        debug!("Backtest returned {} trades", trades.len());
        Ok(trades)
    }
}
