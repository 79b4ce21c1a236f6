// src/core/simulator.rs
use crate::error::{BacktestError, Result};
use crate::types::{
    PortfolioSnapshot, PortfolioState, PriceBar, PriceSeries, Side, Signal, TradeRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_COMMISSION_RATE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub initial_cash: f64,
    pub commission_rate: f64,
}

impl SimulationConfig {
    pub fn new(initial_cash: f64, commission_rate: f64) -> Self {
        Self {
            initial_cash,
            commission_rate,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(BacktestError::InvalidParameter(format!(
                "initial cash must be positive, got {}",
                self.initial_cash
            )));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(BacktestError::InvalidParameter(format!(
                "commission rate must be in [0, 1), got {}",
                self.commission_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub history: Vec<PortfolioSnapshot>,
    pub trades: Vec<TradeRecord>,
}

/// Replays a signal sequence through a single-asset cash account.
///
/// Each bar is valued first and the bar's signal is evaluated afterwards, so
/// a snapshot never reflects the trade made on its own bar. A buy converts
/// all cash into the asset with the commission backed out of the cash, a sell
/// converts the whole position back. Signals that find nothing to trade are
/// dropped. Open positions are not liquidated at the end.
#[derive(Debug, Clone)]
pub struct PortfolioSimulator {
    config: SimulationConfig,
    state: PortfolioState,
    history: Vec<PortfolioSnapshot>,
    trades: Vec<TradeRecord>,
}

impl PortfolioSimulator {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: PortfolioState::with_cash(config.initial_cash),
            history: Vec::new(),
            trades: Vec::new(),
        })
    }

    pub fn state(&self) -> PortfolioState {
        self.state
    }

    pub fn history(&self) -> &[PortfolioSnapshot] {
        &self.history
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Advances one bar. Returns the trade executed on it, if any.
    pub fn step(&mut self, bar: PriceBar, signal: Signal) -> Option<TradeRecord> {
        let Some(price) = bar.price() else {
            debug!("No usable close at {}, valuation undefined", bar.timestamp);
            self.history.push(PortfolioSnapshot {
                timestamp: bar.timestamp,
                total_value: None,
            });
            return None;
        };

        self.history.push(PortfolioSnapshot {
            timestamp: bar.timestamp,
            total_value: Some(self.state.value_at(price)),
        });

        let trade = match signal {
            Signal::Buy if self.state.cash > 0.0 => self.buy(bar.timestamp, price),
            Signal::Sell if self.state.position_quantity > 0.0 => {
                self.sell(bar.timestamp, price)
            }
            Signal::Buy | Signal::Sell => {
                debug!(
                    "Ignoring {:?} at {}: nothing to trade (cash {}, position {})",
                    signal, bar.timestamp, self.state.cash, self.state.position_quantity
                );
                return None;
            }
            Signal::Hold => return None,
        };

        self.trades.push(trade);
        Some(trade)
    }

    fn buy(&mut self, timestamp: DateTime<Utc>, price: f64) -> TradeRecord {
        let cash = self.state.cash;
        let investable = cash / (1.0 + self.config.commission_rate);
        let quantity = investable / price;

        self.state = PortfolioState {
            cash: 0.0,
            position_quantity: quantity,
        };

        info!(
            "Buy: {:.8} @ ${:.2} (spent ${:.2}, commission ${:.2})",
            quantity,
            price,
            cash,
            cash - investable
        );

        TradeRecord {
            timestamp,
            side: Side::Buy,
            quantity,
            price,
            gross_amount: cash,
        }
    }

    fn sell(&mut self, timestamp: DateTime<Utc>, price: f64) -> TradeRecord {
        let quantity = self.state.position_quantity;
        let gross = quantity * price;
        let commission = gross * self.config.commission_rate;
        let net = gross - commission;

        self.state = PortfolioState {
            cash: net,
            position_quantity: 0.0,
        };

        info!(
            "Sell: {:.8} @ ${:.2} (gross ${:.2}, net ${:.2})",
            quantity, price, gross, net
        );

        TradeRecord {
            timestamp,
            side: Side::Sell,
            quantity,
            price,
            gross_amount: gross,
        }
    }

    pub fn into_output(self) -> SimulationOutput {
        SimulationOutput {
            history: self.history,
            trades: self.trades,
        }
    }

    /// Runs every bar of `series` against the index-aligned `signals`.
    pub fn run(mut self, series: &PriceSeries, signals: &[Signal]) -> Result<SimulationOutput> {
        if signals.len() != series.len() {
            return Err(BacktestError::MisalignedInput {
                expected: series.len(),
                actual: signals.len(),
            });
        }

        for (bar, signal) in series.bars()?.zip(signals) {
            self.step(bar, *signal);
        }

        Ok(self.into_output())
    }
}

/// Simulates `signals` over `series` from a fresh account.
pub fn run(
    series: &PriceSeries,
    signals: &[Signal],
    initial_cash: f64,
    commission_rate: f64,
) -> Result<SimulationOutput> {
    PortfolioSimulator::new(SimulationConfig::new(initial_cash, commission_rate))?
        .run(series, signals)
}
