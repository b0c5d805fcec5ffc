// Library crate - exports shared types, the P&L aggregator and the market data client

pub mod types;
pub mod aggregator;
pub mod config;
pub mod supabase;
pub mod candles;
pub mod heatmap;
pub mod simulation;
pub mod sweep;
pub mod render;
pub mod api;

// Re-export commonly used types
pub use types::*;
pub use aggregator::aggregate;
pub use simulation::{SimulationDesk, SimulationRun};
pub use supabase::{MarketDataService, SupabaseClient};
