// src/strategies/traits.rs
use crate::error::Result;
use crate::types::{PriceSeries, Signal};

pub trait Strategy: Send + Sync {
    fn name(&self) -> String;

    /// One signal per bar of `series`, index-aligned.
    fn generate_signals(&self, series: &PriceSeries) -> Result<Vec<Signal>>;
}
