// src/report/mod.rs
pub mod chart;

use crate::core::engine::BacktestOutcome;
use crate::types::{PortfolioSnapshot, PriceSeries};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TEXT_REPORT_FILE: &str = "trade_log.txt";
pub const CHART_FILE: &str = "perf_report.html";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportSummary {
    pub initial_deposit: f64,
    pub final_value: f64,
    pub profit: f64,
    pub profit_percent: f64,
}

impl ReportSummary {
    /// Final value is the last defined valuation; a run with none reports
    /// the initial deposit.
    pub fn new(history: &[PortfolioSnapshot], initial_deposit: f64) -> Self {
        let final_value = history
            .iter()
            .rev()
            .find_map(|s| s.total_value)
            .unwrap_or(initial_deposit);
        let profit = final_value - initial_deposit;
        Self {
            initial_deposit,
            final_value,
            profit,
            profit_percent: profit / initial_deposit * 100.0,
        }
    }
}

/// Inputs of the reporting step. Nothing here is mutated.
pub struct RunReport<'a> {
    pub ticker: &'a str,
    pub series: &'a PriceSeries,
    pub outcome: &'a BacktestOutcome,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunReport<'_> {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary::new(&self.outcome.history, self.outcome.initial_cash)
    }

    pub fn duration_label(&self) -> String {
        format_duration(self.finished_at - self.started_at)
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }

    /// Writes the text report and the chart into `dir`.
    pub async fn write_all(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let text_path = dir.join(TEXT_REPORT_FILE);
        tokio::fs::write(&text_path, self.render_text())
            .await
            .with_context(|| format!("Failed to write {}", text_path.display()))?;
        info!("Saved text report to {}", text_path.display());

        let chart_path = dir.join(CHART_FILE);
        tokio::fs::write(&chart_path, chart::render_html(self)?)
            .await
            .with_context(|| format!("Failed to write {}", chart_path.display()))?;
        info!("Interactive chart saved to {}", chart_path.display());

        Ok(vec![text_path, chart_path])
    }
}

impl fmt::Display for RunReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();

        writeln!(f, "--- Trading Report for {} ---", self.ticker)?;
        writeln!(f, "Strategy: {}", self.outcome.strategy)?;
        writeln!(f, "Run Time: {}", self.started_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Duration: {}\n", self.duration_label())?;
        writeln!(f, "Initial Deposit: {}", format_money(summary.initial_deposit))?;
        writeln!(f, "Final Value:     {}", format_money(summary.final_value))?;
        writeln!(
            f,
            "Total Profit:    {} ({:.2}%)\n",
            format_money(summary.profit),
            summary.profit_percent
        )?;
        writeln!(f, "--- Trade Log ---")?;

        if self.outcome.trades.is_empty() {
            return f.write_str("No orders were executed.");
        }

        writeln!(
            f,
            "{:<20} {:<6} {:>18} {:>14} {:>16}",
            "date", "action", "quantity", "price", "cost"
        )?;
        for trade in &self.outcome.trades {
            writeln!(
                f,
                "{:<20} {:<6} {:>18.8} {:>14.4} {:>16.2}",
                trade.timestamp.format("%Y-%m-%d %H:%M:%S"),
                trade.side,
                trade.quantity,
                trade.price,
                trade.gross_amount
            )?;
        }
        Ok(())
    }
}

/// Creates `base/run{N}_{DD-MM-YYYY}` for the first unused `N`.
pub async fn create_run_directory(base: &Path, today: NaiveDate) -> Result<PathBuf> {
    tokio::fs::create_dir_all(base)
        .await
        .with_context(|| format!("Failed to create {}", base.display()))?;

    let day = today.format("%d-%m-%Y").to_string();
    let mut run = 1;
    loop {
        let dir = base.join(format!("run{}_{}", run, day));
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => run += 1,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", dir.display()))
            }
        }
    }
}

/// `$1,234.56` with the sign after the currency symbol, like `$-3.10`.
pub fn format_money(value: f64) -> String {
    let Some(amount) = Decimal::from_f64(value) else {
        return "$n/a".to_string();
    };
    let rendered = format!("{:.2}", amount.round_dp(2));
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${}{}.{}", sign, grouped, frac)
}

pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_milliseconds().max(0) as f64 / 1000.0;
    let minutes = (total / 60.0).floor() as i64;
    let seconds = total % 60.0;
    format!("{}m {:.1}s", minutes, seconds)
}
