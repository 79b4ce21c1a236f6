//! Moving average crossover backtester for a single instrument.
//!
//! [`strategies::ma_cross`] turns closes into crossover signals,
//! [`crate::core::simulator`] replays them through a cash/position account
//! and [`crate::core::engine`] wires the two together. Everything else fetches data,
//! asks for run parameters and writes reports.

pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod report;
pub mod strategies;
pub mod types;
pub mod utils;

pub use crate::core::engine::{BacktestEngine, BacktestOutcome};
pub use crate::core::simulator::{PortfolioSimulator, SimulationConfig, SimulationOutput};
pub use crate::error::{BacktestError, Result};
pub use crate::strategies::ma_cross::{generate_signals, CrossoverConfig, MovingAverageCross};
