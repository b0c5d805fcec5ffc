use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::info;

use premium_dashboard::{
    api,
    candles::{self, CandleInterval},
    config::{SimulationDefaults, SupabaseConfig},
    heatmap::HeatmapGrid,
    render, sweep, AggregationInputs, AppState, BacktestParams, MarketDataService, SimulationDesk, SupabaseClient,
};

#[derive(Parser, Debug)]
#[command(name = "premium-dashboard")]
#[command(author, version, about = "Kimchi premium dashboard and spread backtest simulator")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: String,

    /// Supabase anon key
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    supabase_key: String,

    /// Remote call timeout in seconds
    #[arg(long, env = "SUPABASE_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the JSON API and dashboard frontend
    Serve {
        /// Port to run the web server on
        #[arg(short, long, env = "PORT", default_value = "3000")]
        port: u16,

        /// Directory with the frontend assets
        #[arg(long, default_value = "frontend")]
        static_dir: PathBuf,

        /// Capital used when a request leaves it out (KRW)
        #[arg(long, default_value = "600000", allow_hyphen_values = true)]
        capital: f64,

        /// Fee + slippage per trade (%) used when a request leaves it out
        #[arg(long, default_value = "0.24", allow_hyphen_values = true)]
        fee_rate: f64,
    },

    /// Print premium candles and headline stats
    Candles {
        /// Bucket size in minutes (60, 240 or 1440)
        #[arg(short, long, default_value = "60")]
        interval: u32,
    },

    /// Print the weekly heatmap in KST
    Heatmap {
        /// Segment size in minutes (30 or 60)
        #[arg(short, long, default_value = "60")]
        segment: u32,
    },

    /// Run one backtest simulation
    Backtest {
        /// Entry spread (%)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        entry: f64,

        /// Target margin over entry (%)
        #[arg(long, default_value = "3", allow_hyphen_values = true)]
        target: f64,

        /// Lookback period in days
        #[arg(long, default_value = "7")]
        period: u32,

        /// Capital (KRW)
        #[arg(long, default_value = "600000", allow_hyphen_values = true)]
        capital: f64,

        /// Fee + slippage per trade (%)
        #[arg(long, default_value = "0.24", allow_hyphen_values = true)]
        fee_rate: f64,
    },

    /// Sweep entry/target combinations and rank them
    Sweep {
        /// Comma-separated entry spreads (%)
        #[arg(long, default_value = "-0.5,0,0.5,1.0", allow_hyphen_values = true)]
        entries: String,

        /// Comma-separated target margins (%)
        #[arg(long, default_value = "0.5,1.0,2.0,3.0", allow_hyphen_values = true)]
        targets: String,

        /// Lookback period in days
        #[arg(long, default_value = "7")]
        period: u32,

        /// Capital (KRW)
        #[arg(long, default_value = "600000", allow_hyphen_values = true)]
        capital: f64,

        /// Fee + slippage per trade (%)
        #[arg(long, default_value = "0.24", allow_hyphen_values = true)]
        fee_rate: f64,

        /// Concurrent remote simulations
        #[arg(long, default_value = "4")]
        concurrency: usize,

        /// Write all results to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of top results to print
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("premium_dashboard=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = SupabaseConfig::new(&args.supabase_url, &args.supabase_key)
        .with_timeout(Duration::from_secs(args.timeout_secs));
    let service: Arc<dyn MarketDataService> = Arc::new(SupabaseClient::new(&config)?);

    match args.command {
        Commands::Serve {
            port,
            static_dir,
            capital,
            fee_rate,
        } => serve(service, port, static_dir, SimulationDefaults { capital, fee_rate }).await,
        Commands::Candles { interval } => show_candles(service, interval).await,
        Commands::Heatmap { segment } => show_heatmap(service, segment).await,
        Commands::Backtest {
            entry,
            target,
            period,
            capital,
            fee_rate,
        } => {
            let desk = SimulationDesk::new(service, SimulationDefaults { capital, fee_rate });
            let run = desk
                .run(BacktestParams {
                    entry_spread: entry,
                    target_margin: target,
                    period_days: period,
                    capital: Some(capital),
                    fee_rate: Some(fee_rate),
                })
                .await?;
            println!("{}", render::simulation(&run));
            Ok(())
        }
        Commands::Sweep {
            entries,
            targets,
            period,
            capital,
            fee_rate,
            concurrency,
            output,
            top,
        } => {
            let combinations = sweep::generate_combinations(
                &sweep::parse_values(&entries)?,
                &sweep::parse_values(&targets)?,
            );
            let inputs = AggregationInputs { capital, fee_rate };
            let results = sweep::run_sweep(service, combinations, period, inputs, concurrency).await;

            if let Some(path) = output {
                sweep::write_csv(&results, &path)?;
            }
            println!("{}", render::sweep_top(&results, top));
            Ok(())
        }
    }
}

async fn serve(
    service: Arc<dyn MarketDataService>,
    port: u16,
    static_dir: PathBuf,
    defaults: SimulationDefaults,
) -> Result<()> {
    info!("Starting premium dashboard server");
    info!(
        "Simulation defaults: capital {:.0} KRW, fee {:.2}%",
        defaults.capital, defaults.fee_rate
    );

    let state = Arc::new(AppState {
        desk: SimulationDesk::new(service.clone(), defaults),
        service,
    });

    // Build router
    let app = Router::new()
        .nest("/api", api::router())
        .fallback_service(ServeDir::new(&static_dir))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Server running at http://{}", addr);
    info!("Serving frontend from {}", static_dir.display());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn show_candles(service: Arc<dyn MarketDataService>, interval: u32) -> Result<()> {
    let interval = CandleInterval::from_minutes(interval)?;
    let rows = service
        .get_candles(interval.minutes())
        .await
        .context("Failed to fetch candles")?;

    println!("Premium Chart ({})", interval);
    println!("{}\n", render::market_stats(candles::market_stats(&rows).as_ref()));
    println!("{}", render::candle_table(&candles::chronological(&rows)));
    Ok(())
}

async fn show_heatmap(service: Arc<dyn MarketDataService>, segment: u32) -> Result<()> {
    // Reject bad segments before the remote call
    HeatmapGrid::build(&[], segment)?;

    let cells = service
        .get_spread_heatmap(segment)
        .await
        .context("Failed to fetch heatmap")?;
    let grid = HeatmapGrid::build(&cells, segment)?;

    println!("Hourly Heatmap (KST, {}m segments)", segment);
    println!("{}", render::heatmap(&grid));
    Ok(())
}
