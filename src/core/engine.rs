// src/core/engine.rs
use crate::core::simulator::{PortfolioSimulator, SimulationConfig, SimulationOutput};
use crate::error::Result;
use crate::strategies::ma_cross::{CrossoverConfig, MovingAverageCross};
use crate::strategies::traits::Strategy;
use crate::types::{PortfolioSnapshot, PriceSeries, Signal, TradeRecord};
use anyhow::Context;
use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

/// Everything one run produces, handed to reporting as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOutcome {
    pub strategy: String,
    pub initial_cash: f64,
    pub signals: Vec<Signal>,
    pub history: Vec<PortfolioSnapshot>,
    pub trades: Vec<TradeRecord>,
}

impl BacktestOutcome {
    /// Value at the last bar with a defined valuation.
    pub fn final_value(&self) -> Option<f64> {
        self.history.iter().rev().find_map(|s| s.total_value)
    }
}

pub struct BacktestEngine<S> {
    strategy: S,
    simulation: SimulationConfig,
}

impl<S> BacktestEngine<S>
where
    S: Strategy,
{
    pub fn new(strategy: S, simulation: SimulationConfig) -> Result<Self> {
        simulation.validate()?;
        Ok(Self {
            strategy,
            simulation,
        })
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn run(&self, series: &PriceSeries) -> Result<BacktestOutcome> {
        let name = self.strategy.name();
        info!(
            "Starting simulation: {} over {} bars, initial cash ${:.2}, commission {}",
            name,
            series.len(),
            self.simulation.initial_cash,
            self.simulation.commission_rate
        );

        let signals = self.strategy.generate_signals(series)?;
        let SimulationOutput { history, trades } =
            PortfolioSimulator::new(self.simulation)?.run(series, &signals)?;

        let outcome = BacktestOutcome {
            strategy: name,
            initial_cash: self.simulation.initial_cash,
            signals,
            history,
            trades,
        };
        info!(
            "Simulation finished: {} trades, final value {:?}",
            outcome.trades.len(),
            outcome.final_value()
        );
        Ok(outcome)
    }
}

/// Runs independent crossover backtests over one shared series.
///
/// Each run is pure computation on its own blocking task and owns its own
/// account state; only the read-only series is shared. Results keep the
/// order of `runs`.
pub async fn run_batch(
    series: Arc<PriceSeries>,
    runs: Vec<(CrossoverConfig, SimulationConfig)>,
) -> anyhow::Result<Vec<Result<BacktestOutcome>>> {
    let handles = runs.into_iter().map(|(crossover, simulation)| {
        let series = Arc::clone(&series);
        tokio::task::spawn_blocking(move || -> Result<BacktestOutcome> {
            let strategy = MovingAverageCross::new(crossover)?;
            BacktestEngine::new(strategy, simulation)?.run(&series)
        })
    });

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.context("backtest task panicked"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BacktestError;
    use crate::types::Side;
    use chrono::{TimeZone, Utc};

    fn prices(values: &[f64]) -> PriceSeries {
        let stamps = (0..values.len())
            .map(|i| Utc.timestamp_opt(1_600_000_000 + i as i64 * 900, 0).unwrap())
            .collect();
        PriceSeries::new(stamps)
            .with_close(values.iter().copied().map(Some).collect())
            .unwrap()
    }

    fn engine(short: usize, long: usize, cash: f64, rate: f64) -> BacktestEngine<MovingAverageCross> {
        let strategy = MovingAverageCross::new(CrossoverConfig {
            short_window: short,
            long_window: long,
        })
        .unwrap();
        BacktestEngine::new(strategy, SimulationConfig::new(cash, rate)).unwrap()
    }

    #[test]
    fn step_series_end_to_end() {
        let s = prices(&[10.0, 10.0, 12.0, 12.0, 8.0, 8.0]);
        let outcome = engine(1, 2, 100.0, 0.0).run(&s).unwrap();

        assert_eq!(outcome.strategy, "MA_Cross_1_2");
        assert_eq!(outcome.history.len(), 6);
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].side, Side::Buy);
        assert_eq!(outcome.trades[1].side, Side::Sell);
        assert!((outcome.final_value().unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn final_value_skips_trailing_gap() {
        let stamps = (0..3).map(|i| Utc.timestamp_opt(i * 60, 0).unwrap()).collect();
        let s = PriceSeries::new(stamps)
            .with_close(vec![Some(5.0), Some(6.0), None])
            .unwrap();
        let outcome = engine(1, 2, 40.0, 0.0).run(&s).unwrap();
        assert_eq!(outcome.history[2].total_value, None);
        assert_eq!(outcome.final_value(), Some(40.0));
    }

    #[test]
    fn invalid_simulation_config_is_rejected() {
        let strategy = MovingAverageCross::new(CrossoverConfig::default()).unwrap();
        let err = BacktestEngine::new(strategy, SimulationConfig::new(100.0, 1.5))
            .err()
            .unwrap();
        assert!(matches!(err, BacktestError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn batch_runs_are_isolated_and_ordered() {
        let values: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 / 7.0).sin() * 10.0)
            .collect();
        let series = Arc::new(prices(&values));
        let runs = vec![
            (
                CrossoverConfig {
                    short_window: 3,
                    long_window: 9,
                },
                SimulationConfig::new(1_000.0, 0.001),
            ),
            (
                CrossoverConfig {
                    short_window: 0,
                    long_window: 9,
                },
                SimulationConfig::new(1_000.0, 0.001),
            ),
            (
                CrossoverConfig {
                    short_window: 5,
                    long_window: 20,
                },
                SimulationConfig::new(50.0, 0.0),
            ),
        ];

        let results = run_batch(Arc::clone(&series), runs).await.unwrap();
        assert_eq!(results.len(), 3);

        let first = results[0].as_ref().unwrap();
        assert_eq!(first.strategy, "MA_Cross_3_9");
        assert_eq!(first, &engine(3, 9, 1_000.0, 0.001).run(&series).unwrap());

        assert!(matches!(results[1], Err(BacktestError::InvalidParameter(_))));

        let third = results[2].as_ref().unwrap();
        assert_eq!(third.initial_cash, 50.0);
        assert_eq!(third.history.len(), 120);
    }
}
