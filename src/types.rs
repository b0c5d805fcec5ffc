use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::simulation::SimulationDesk;
use crate::supabase::MarketDataService;

/// OHLC bucket of the premium series as returned by `get_market_candles`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCandle {
    pub bucket: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub avg_spread: f64,
}

/// Average spread for one (day, hour, segment) slot of the week, keyed in UTC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadHeatmapCell {
    pub day_of_week: u32, // 0 = Sunday
    pub hour_of_day: u32,
    #[serde(default)]
    pub minute_segment: u32,
    pub avg_spread: f64,
}

/// One simulated round trip produced by the remote backtest engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_at: DateTime<Utc>,
    pub exit_at: DateTime<Utc>,
    pub entry_spread: f64,
    pub exit_spread: f64,
}

/// Capital and cost assumptions applied to a trade list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationInputs {
    pub capital: f64,
    /// Combined fee + slippage per trade, in percent
    pub fee_rate: f64,
}

/// Per-trade figures derived from a [`TradeRecord`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeView {
    pub entry_at: DateTime<Utc>,
    pub exit_at: DateTime<Utc>,
    pub entry_spread: f64,
    pub exit_spread: f64,
    pub spread_diff: f64,
    pub net_percent: f64,
    pub profit_amount: f64,
}

/// Totals over one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_trades: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub gross_return: f64,
    pub net_return: f64,
    pub net_profit: f64,
    pub final_equity: f64,
}

/// Output of [`crate::aggregator::aggregate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub trades: Vec<TradeView>,
    pub summary: Summary,
}

/// Parameters of a `simulate_backtest` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestParams {
    pub entry_spread: f64,
    pub target_margin: f64,
    pub period_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<f64>,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            entry_spread: 0.0,
            target_margin: 3.0,
            period_days: 7,
            capital: None,
            fee_rate: None,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub service: Arc<dyn MarketDataService>,
    pub desk: SimulationDesk,
}
