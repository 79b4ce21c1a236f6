// src/strategies/ma_cross.rs
use crate::error::{BacktestError, Result};
use crate::strategies::traits::Strategy;
use crate::types::{usable_price, PriceSeries, Signal};
use crate::utils::rolling::RollingMean;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverConfig {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
        }
    }
}

impl CrossoverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.short_window == 0 || self.long_window == 0 {
            return Err(BacktestError::InvalidParameter(format!(
                "moving average windows must be positive (short={}, long={})",
                self.short_window, self.long_window
            )));
        }
        Ok(())
    }
}

/// Per-bar intermediate columns of the crossover rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalFrame {
    pub short_mavg: Vec<Option<f64>>,
    pub long_mavg: Vec<Option<f64>>,
    pub positions: Vec<bool>,
    pub signals: Vec<Signal>,
}

/// Long-only moving average crossover.
///
/// Wants to be in the asset while the short mean is above the long mean and
/// emits a signal only on the bar where that preference flips. Bars before
/// index `short_window` never want the asset.
#[derive(Debug, Clone)]
pub struct MovingAverageCross {
    config: CrossoverConfig,
}

impl MovingAverageCross {
    pub fn new(config: CrossoverConfig) -> Result<Self> {
        config.validate()?;
        if config.short_window >= config.long_window {
            debug!(
                "short window {} is not below long window {}; crossover will rarely fire",
                config.short_window, config.long_window
            );
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &CrossoverConfig {
        &self.config
    }

    pub fn generate(&self, series: &PriceSeries) -> Result<SignalFrame> {
        let close = series.close()?;
        let warm_up = self.config.short_window;

        let mut short = RollingMean::new(self.config.short_window);
        let mut long = RollingMean::new(self.config.long_window);
        let mut frame = SignalFrame {
            short_mavg: Vec::with_capacity(close.len()),
            long_mavg: Vec::with_capacity(close.len()),
            positions: Vec::with_capacity(close.len()),
            signals: Vec::with_capacity(close.len()),
        };

        let mut previous = false;
        for (i, raw) in close.iter().enumerate() {
            let price = usable_price(*raw);
            let s = short.update(price);
            let l = long.update(price);

            let position = match (s, l) {
                _ if i < warm_up => false,
                (Some(s), Some(l)) => s > l,
                // undefined mean: keep yesterday's position so the bar holds
                _ => previous,
            };

            frame.short_mavg.push(s);
            frame.long_mavg.push(l);
            frame.positions.push(position);
            frame.signals.push(Signal::from_transition(previous, position));
            previous = position;
        }

        debug!(
            strategy = %self.name(),
            bars = close.len(),
            buys = frame.signals.iter().filter(|s| **s == Signal::Buy).count(),
            sells = frame.signals.iter().filter(|s| **s == Signal::Sell).count(),
            "signals generated"
        );
        Ok(frame)
    }
}

impl Strategy for MovingAverageCross {
    fn name(&self) -> String {
        format!(
            "MA_Cross_{}_{}",
            self.config.short_window, self.config.long_window
        )
    }

    fn generate_signals(&self, series: &PriceSeries) -> Result<Vec<Signal>> {
        Ok(self.generate(series)?.signals)
    }
}

/// Crossover signals for `series` with the given window lengths.
pub fn generate_signals(
    series: &PriceSeries,
    short_window: usize,
    long_window: usize,
) -> Result<Vec<Signal>> {
    MovingAverageCross::new(CrossoverConfig {
        short_window,
        long_window,
    })?
    .generate_signals(series)
}
