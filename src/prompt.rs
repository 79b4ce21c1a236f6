// src/prompt.rs
use crate::config::AppConfig;
use crate::types::Timeframe;
use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::io::{BufRead, Write};

/// Parameters of a single run, resolved from config or asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub timeframe: Timeframe,
    pub initial_deposit: f64,
}

impl RunParams {
    /// Takes what `config` already provides and asks for the rest.
    pub fn collect<R: BufRead, W: Write>(
        config: &AppConfig,
        input: &mut R,
        output: &mut W,
    ) -> Result<Self> {
        let mut prompter = Prompter { input, output };

        let symbol = match &config.symbol {
            Some(s) => s.trim().to_uppercase(),
            None => prompter.ticker()?,
        };
        let start_date = match config.start_date {
            Some(d) => d,
            None => prompter.start_date()?,
        };
        let timeframe = match config.timeframe {
            Some(tf) => tf,
            None => prompter.timeframe()?,
        };
        let initial_deposit = match config.initial_deposit {
            Some(d) => d,
            None => prompter.deposit()?,
        };

        Ok(Self {
            symbol,
            start_date,
            timeframe,
            initial_deposit,
        })
    }
}

struct Prompter<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<R: BufRead, W: Write> Prompter<'_, R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed while waiting for: {}", question.trim());
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    fn ticker(&mut self) -> Result<String> {
        loop {
            let ticker = self.ask("Ticker (ex: ETH/USDT): ")?.to_uppercase();
            if !ticker.is_empty() {
                return Ok(ticker);
            }
        }
    }

    fn start_date(&mut self) -> Result<NaiveDate> {
        loop {
            let raw = self.ask("Start date YYYY-MM-DD: ")?;
            match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                Ok(date) => return Ok(date),
                Err(_) => self.say("Wrong date format.")?,
            }
        }
    }

    fn timeframe(&mut self) -> Result<Timeframe> {
        self.say("\nSelect timeframe:")?;
        for (i, tf) in Timeframe::ALL.iter().enumerate() {
            self.say(&format!("  {}: {}", i + 1, tf))?;
        }

        let question = format!("Enter number (1-{}): ", Timeframe::ALL.len());
        loop {
            let choice = self.ask(&question)?;
            let picked = choice
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| Timeframe::ALL.get(i).copied());
            match picked {
                Some(tf) => return Ok(tf),
                None => self.say("Invalid choice. Please try again.")?,
            }
        }
    }

    fn deposit(&mut self) -> Result<f64> {
        loop {
            match self.ask("\nDeposit, $: ")?.parse::<f64>() {
                Ok(v) if v.is_finite() && v > 0.0 => return Ok(v),
                Ok(_) => self.say("Should be above zero.")?,
                Err(_) => self.say("Enter a number.")?,
            }
        }
    }
}
