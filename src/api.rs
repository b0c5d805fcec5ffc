use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::candles::{self, CandleInterval, MarketStats};
use crate::heatmap::HeatmapGrid;
use crate::types::{AppState, BacktestParams, MarketCandle};

/// Response for candles endpoint
#[derive(Serialize)]
pub struct CandlesResponse {
    pub interval_minutes: u32,
    /// Oldest first
    pub candles: Vec<MarketCandle>,
    pub stats: Option<MarketStats>,
}

/// Query params for candles endpoint
#[derive(Debug, Deserialize)]
pub struct CandlesQueryParams {
    pub interval: Option<u32>,
}

/// Query params for heatmap endpoint
#[derive(Debug, Deserialize)]
pub struct HeatmapQueryParams {
    pub segment: Option<u32>,
}

fn error_response(status: StatusCode, message: String) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({"error": message})))
}

/// API routes, mounted under `/api`
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/candles", get(get_candles))
        .route("/heatmap", get(get_heatmap))
        .route("/backtest", post(run_backtest))
        .route("/backtest/latest", get(latest_backtest))
}

/// GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/candles - Premium candles with headline stats
pub async fn get_candles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CandlesQueryParams>,
) -> impl IntoResponse {
    let interval = match CandleInterval::from_minutes(params.interval.unwrap_or(60)) {
        Ok(interval) => interval,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.service.get_candles(interval.minutes()).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(serde_json::json!(CandlesResponse {
                interval_minutes: interval.minutes(),
                stats: candles::market_stats(&rows),
                candles: candles::chronological(&rows),
            })),
        ),
        Err(e) => {
            warn!("Candle request failed: {:#}", e);
            error_response(StatusCode::BAD_GATEWAY, format!("{:#}", e))
        }
    }
}

/// GET /api/heatmap - Weekly KST heatmap grid
pub async fn get_heatmap(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HeatmapQueryParams>,
) -> impl IntoResponse {
    let segment = params.segment.unwrap_or(60);

    // Validate before spending a remote call
    if let Err(e) = HeatmapGrid::build(&[], segment) {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    let cells = match state.service.get_spread_heatmap(segment).await {
        Ok(cells) => cells,
        Err(e) => {
            warn!("Heatmap request failed: {:#}", e);
            return error_response(StatusCode::BAD_GATEWAY, format!("{:#}", e));
        }
    };

    match HeatmapGrid::build(&cells, segment) {
        Ok(grid) => (StatusCode::OK, Json(serde_json::json!(grid))),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// POST /api/backtest - Run a simulation and publish it as the latest result
pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    Json(params): Json<BacktestParams>,
) -> impl IntoResponse {
    match state.desk.run(params).await {
        Ok(run) => (StatusCode::OK, Json(serde_json::json!(run))),
        Err(e) => {
            warn!("Backtest request failed: {:#}", e);
            error_response(StatusCode::BAD_GATEWAY, format!("{:#}", e))
        }
    }
}

/// GET /api/backtest/latest - Most recent published simulation
pub async fn latest_backtest(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.desk.latest().await {
        Some(run) => (StatusCode::OK, Json(serde_json::json!(run))),
        None => error_response(StatusCode::NOT_FOUND, "No simulation has run yet".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationDefaults;
    use crate::simulation::SimulationDesk;
    use crate::supabase::MarketDataService;
    use crate::types::{SpreadHeatmapCell, TradeRecord};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct FixedService;

    #[async_trait]
    impl MarketDataService for FixedService {
        async fn get_candles(&self, interval_minutes: u32) -> Result<Vec<MarketCandle>> {
            if interval_minutes == 1440 {
                return Err(anyhow!("upstream timeout"));
            }
            Ok((0..3)
                .rev()
                .map(|h| MarketCandle {
                    bucket: Utc.with_ymd_and_hms(2025, 1, 6, h, 0, 0).unwrap(),
                    open: 1.0,
                    high: 1.0 + h as f64,
                    low: 0.5,
                    close: 1.0 + h as f64 / 10.0,
                    avg_spread: 1.0,
                })
                .collect())
        }

        async fn get_spread_heatmap(&self, _: u32) -> Result<Vec<SpreadHeatmapCell>> {
            Ok(vec![SpreadHeatmapCell {
                day_of_week: 6,
                hour_of_day: 20,
                minute_segment: 0,
                avg_spread: 2.0,
            }])
        }

        async fn simulate_backtest(&self, _: &BacktestParams) -> Result<Vec<TradeRecord>> {
            Ok(vec![])
        }
    }

    fn state() -> State<Arc<AppState>> {
        let service: Arc<dyn MarketDataService> = Arc::new(FixedService);
        State(Arc::new(AppState {
            desk: SimulationDesk::new(service.clone(), SimulationDefaults::default()),
            service,
        }))
    }

    async fn body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_candles_chronological_with_stats() {
        let response = get_candles(state(), Query(CandlesQueryParams { interval: Some(240) }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body(response).await;
        assert_eq!(json["interval_minutes"], 240);
        assert_eq!(json["candles"][0]["bucket"], "2025-01-06T00:00:00Z");
        assert_eq!(json["stats"]["max"], 3.0);
        assert_eq!(json["stats"]["current"], 1.2);
    }

    #[tokio::test]
    async fn test_candles_rejects_unknown_interval() {
        let response = get_candles(state(), Query(CandlesQueryParams { interval: Some(5) }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_candles_remote_failure() {
        let response = get_candles(state(), Query(CandlesQueryParams { interval: Some(1440) }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body(response).await["error"]
            .as_str()
            .unwrap()
            .contains("upstream timeout"));
    }

    #[tokio::test]
    async fn test_heatmap_grid_in_kst() {
        let response = get_heatmap(state(), Query(HeatmapQueryParams { segment: None }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body(response).await;
        assert_eq!(json["segment_minutes"], 60);
        assert_eq!(json["rows"][0][5], 2.0);

        let response = get_heatmap(state(), Query(HeatmapQueryParams { segment: Some(7) }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_backtest_then_latest() {
        let state = state();

        let response = latest_backtest(State(state.0.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = run_backtest(State(state.0.clone()), Json(BacktestParams::default()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body(response).await;
        assert_eq!(json["summary"]["total_trades"], 0);
        assert_eq!(json["summary"]["win_rate"], 0.0);
        assert_eq!(json["summary"]["final_equity"], 600_000.0);

        let response = latest_backtest(state).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
