//! Configuration for the market data service and simulation defaults

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::AggregationInputs;

/// Connection settings for the Supabase project backing the dashboard
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL (e.g., "https://xyz.supabase.co")
    pub url: String,

    /// Anon/public API key, sent as both `apikey` and bearer token
    pub anon_key: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl SupabaseConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Capital and cost assumptions used when a request leaves them out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationDefaults {
    /// Starting capital in KRW
    pub capital: f64,

    /// Fee + slippage per trade, in percent
    pub fee_rate: f64,
}

impl Default for SimulationDefaults {
    fn default() -> Self {
        Self {
            capital: 600_000.0,
            fee_rate: 0.24,
        }
    }
}

impl SimulationDefaults {
    /// Fill in whatever the caller did not specify
    pub fn resolve(&self, capital: Option<f64>, fee_rate: Option<f64>) -> AggregationInputs {
        AggregationInputs {
            capital: capital.unwrap_or(self.capital),
            fee_rate: fee_rate.unwrap_or(self.fee_rate),
        }
    }
}
