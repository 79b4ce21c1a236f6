// src/connectors/messages.rs
use crate::types::Candle;
use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::Deserialize;

/// One row of `GET /api/v3/klines`.
/// Binance sends it as a positional 12-element array; prices and volumes are strings.
#[derive(Debug, Deserialize)]
pub struct BinanceKline {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: i64,
    pub quote_volume: Decimal,
    pub trades: u64,
    pub taker_buy_base_volume: Decimal,
    pub taker_buy_quote_volume: Decimal,
    pub ignore: IgnoredAny,
}

impl BinanceKline {
    pub fn into_candle(self) -> Result<Candle> {
        let timestamp = Utc
            .timestamp_millis_opt(self.open_time)
            .single()
            .with_context(|| format!("Invalid kline open time {}", self.open_time))?;

        let to_f64 = |value: Decimal, field: &str| {
            value
                .to_f64()
                .with_context(|| format!("Kline {} {} out of f64 range", field, value))
        };

        Ok(Candle {
            timestamp,
            open: to_f64(self.open, "open")?,
            high: to_f64(self.high, "high")?,
            low: to_f64(self.low, "low")?,
            close: to_f64(self.close, "close")?,
            volume: to_f64(self.volume, "volume")?,
        })
    }
}
