use crate::types::{Candle, Timeframe};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of historical candles for a single instrument.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Candles from `start` (00:00 UTC) up to the latest available, ascending.
    async fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>>;
}
