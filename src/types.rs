// src/types.rs
use crate::error::{BacktestError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Crossover event at a single bar. Encodes a transition of the
/// short/long ordering, not the ordering itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    /// `current - previous` of two 0/1 positions: +1 buys, -1 sells.
    pub fn from_transition(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => Signal::Buy,
            (true, false) => Signal::Sell,
            _ => Signal::Hold,
        }
    }
}

/// One OHLCV candle as delivered by an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// The view of a single bar that the engine consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub close: Option<f64>,
}

impl PriceBar {
    /// The close if it is usable for valuation: finite and positive.
    pub fn price(&self) -> Option<f64> {
        usable_price(self.close)
    }
}

pub(crate) fn usable_price(close: Option<f64>) -> Option<f64> {
    close.filter(|c| c.is_finite() && *c > 0.0)
}

/// Column-oriented price history for one instrument.
///
/// Timestamps are assumed ascending and unique; this is not checked.
/// The close column is optional as a whole so that a series fetched
/// without prices is a structural error rather than a run of gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    timestamps: Vec<DateTime<Utc>>,
    close: Option<Vec<Option<f64>>>,
}

impl PriceSeries {
    /// A series with timestamps only. Attach prices with [`PriceSeries::with_close`].
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self {
            timestamps,
            close: None,
        }
    }

    pub fn with_close(mut self, close: Vec<Option<f64>>) -> Result<Self> {
        if close.len() != self.timestamps.len() {
            return Err(BacktestError::MisalignedInput {
                expected: self.timestamps.len(),
                actual: close.len(),
            });
        }
        self.close = Some(close);
        Ok(self)
    }

    pub fn from_candles(candles: &[Candle]) -> Self {
        Self {
            timestamps: candles.iter().map(|c| c.timestamp).collect(),
            close: Some(candles.iter().map(|c| Some(c.close)).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn close(&self) -> Result<&[Option<f64>]> {
        self.close
            .as_deref()
            .ok_or(BacktestError::MissingField("close"))
    }

    pub fn bars(&self) -> Result<impl Iterator<Item = PriceBar> + '_> {
        let close = self.close()?;
        Ok(self
            .timestamps
            .iter()
            .zip(close)
            .map(|(timestamp, close)| PriceBar {
                timestamp: *timestamp,
                close: *close,
            }))
    }
}

/// Cash and asset holdings of a single-asset, fully allocated account.
/// At most one of the two fields is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub position_quantity: f64,
}

impl PortfolioState {
    pub fn with_cash(cash: f64) -> Self {
        Self {
            cash,
            position_quantity: 0.0,
        }
    }

    pub fn value_at(&self, price: f64) -> f64 {
        self.cash + self.position_quantity * price
    }
}

/// Portfolio valuation at one bar. `total_value` is `None` when the bar's
/// close was undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_value: Option<f64>,
}

/// An executed trade. `gross_amount` is the cash spent for a buy and
/// `quantity * price` before commission for a sell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub gross_amount: f64,
}

/// Candle intervals offered for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::H12,
        Timeframe::D1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s.trim())
            .ok_or_else(|| BacktestError::InvalidParameter(format!("unknown timeframe '{}'", s)))
    }
}
