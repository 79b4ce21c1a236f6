// src/main.rs
use anyhow::{bail, Context};
use chrono::Local;
use dotenvy::dotenv;
use ma_crossover::config::AppConfig;
use ma_crossover::connectors::binance::BinanceClient;
use ma_crossover::connectors::traits::MarketDataSource;
use ma_crossover::prompt::RunParams;
use ma_crossover::report::{create_run_directory, RunReport};
use ma_crossover::types::PriceSeries;
use ma_crossover::{logging, BacktestEngine, MovingAverageCross, SimulationConfig};
use std::io;
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let started_at = Local::now();

    // 1. Load Configuration
    let config = AppConfig::new().context("Failed to load configuration")?;
    config.validate()?;
    let _log_guard = logging::init(Path::new(&config.log_dir))?;

    println!("========================================");
    println!("     MA CROSSOVER BACKTESTER - v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");

    // 2. Resolve run parameters
    let params = {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        RunParams::collect(&config, &mut input, &mut output)?
    };

    // 3. Fetch history
    let client = BinanceClient::new();
    let candles = client
        .fetch_candles(&params.symbol, params.start_date, params.timeframe)
        .await?;
    if candles.is_empty() {
        bail!("Couldn't get data for the ticker {}", params.symbol);
    }
    let series = PriceSeries::from_candles(&candles);

    // 4. Simulate
    let strategy = MovingAverageCross::new(config.strategy)?;
    let simulation =
        SimulationConfig::new(params.initial_deposit, config.simulation.commission_rate);
    let outcome = BacktestEngine::new(strategy, simulation)?.run(&series)?;

    // 5. Report
    info!("Reporting...");
    let finished_at = Local::now();
    let output_dir =
        create_run_directory(Path::new(&config.output_dir), finished_at.date_naive()).await?;

    RunReport {
        ticker: &params.symbol,
        series: &series,
        outcome: &outcome,
        started_at,
        finished_at,
    }
    .write_all(&output_dir)
    .await?;

    info!("Saved all perflogs to {}", output_dir.display());
    Ok(())
}
