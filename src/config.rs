// src/config.rs

use crate::core::simulator::DEFAULT_COMMISSION_RATE;
use crate::error::{BacktestError, Result};
use crate::strategies::ma_cross::CrossoverConfig;
use crate::types::Timeframe;
use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    pub commission_rate: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
        }
    }
}

/// Run parameters. Anything left unset here is asked for interactively.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub symbol: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub timeframe: Option<Timeframe>,
    pub initial_deposit: Option<f64>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default)]
    pub strategy: CrossoverConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

fn default_output_dir() -> String {
    "outputs".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

/// `APP_` prefix, `__` between nested keys.
fn environment() -> Environment {
    Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Reads `Settings.{toml,yaml,json,..}` if present, then `APP_*` variables
    /// (`APP_STRATEGY__SHORT_WINDOW=10` for nested keys).
    pub fn new() -> std::result::Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(environment());

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;

        let rate = self.simulation.commission_rate;
        if !(0.0..1.0).contains(&rate) {
            return Err(BacktestError::InvalidParameter(format!(
                "commission rate must be in [0, 1), got {}",
                rate
            )));
        }

        if let Some(deposit) = self.initial_deposit {
            if !deposit.is_finite() || deposit <= 0.0 {
                return Err(BacktestError::InvalidParameter(format!(
                    "initial deposit must be positive, got {}",
                    deposit
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;

    fn parse(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_source_uses_defaults() {
        let cfg = parse("");
        assert_eq!(cfg.symbol, None);
        assert_eq!(cfg.output_dir, "outputs");
        assert_eq!(cfg.log_dir, "logs");
        assert_eq!(cfg.strategy, CrossoverConfig::default());
        assert_eq!(cfg.simulation.commission_rate, 0.001);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn reads_full_run_description() {
        let cfg = parse(
            r#"
            symbol = "ETH/USDT"
            start_date = "2024-03-01"
            timeframe = "4h"
            initial_deposit = 2500.0
            output_dir = "runs"

            [strategy]
            short_window = 10

            [simulation]
            commission_rate = 0.0005
            "#,
        );
        assert_eq!(cfg.symbol.as_deref(), Some("ETH/USDT"));
        assert_eq!(cfg.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(cfg.timeframe, Some(Timeframe::H4));
        assert_eq!(cfg.initial_deposit, Some(2500.0));
        assert_eq!(cfg.output_dir, "runs");
        assert_eq!(cfg.strategy.short_window, 10);
        assert_eq!(cfg.strategy.long_window, 50);
        assert_eq!(cfg.simulation.commission_rate, 0.0005);
    }

    #[test]
    fn environment_reads_flat_and_nested_keys() {
        let vars = HashMap::from([
            ("APP_SYMBOL".to_string(), "SOL/USDT".to_string()),
            ("APP_STRATEGY__SHORT_WINDOW".to_string(), "7".to_string()),
            ("APP_SIMULATION__COMMISSION_RATE".to_string(), "0.002".to_string()),
            ("APP_TIMEFRAME".to_string(), "12h".to_string()),
            ("OTHER_SYMBOL".to_string(), "BTC/USDT".to_string()),
        ]);
        let cfg: AppConfig = Config::builder()
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.symbol.as_deref(), Some("SOL/USDT"));
        assert_eq!(cfg.strategy.short_window, 7);
        assert_eq!(cfg.strategy.long_window, 50);
        assert_eq!(cfg.simulation.commission_rate, 0.002);
        assert_eq!(cfg.timeframe, Some(Timeframe::H12));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = parse("");
        cfg.simulation.commission_rate = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = parse("");
        cfg.strategy.long_window = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = parse("");
        cfg.initial_deposit = Some(0.0);
        assert!(cfg.validate().is_err());
    }
}
