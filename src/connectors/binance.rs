// src/connectors/binance.rs
use crate::connectors::messages::BinanceKline;
use crate::connectors::traits::MarketDataSource;
use crate::types::{Candle, Timeframe};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest::Client;
use tracing::{info, warn};

const KLINE_LIMIT: usize = 1000;

/// Public market-data client. Klines need no API key, so nothing is signed.
pub struct BinanceClient {
    http_client: Client,
    base_rest_url: String,
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceClient {
    pub fn new() -> Self {
        Self::with_base_url("https://api.binance.com")
    }

    pub fn with_base_url(base_rest_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_rest_url: base_rest_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_batch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
    ) -> Result<Vec<BinanceKline>> {
        let query = klines_query(symbol, timeframe, start_ms)?;
        let url = format!("{}/api/v3/klines?{}", self.base_rest_url, query);

        let rows = self
            .http_client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Network error requesting {}", url))?
            .error_for_status()
            .with_context(|| format!("Binance rejected {} {}", symbol, timeframe))?
            .json::<Vec<BinanceKline>>()
            .await
            .context("Failed to parse kline response")?;

        Ok(rows)
    }
}

/// `ETH/USDT` style tickers to Binance's `ETHUSDT`.
pub fn market_symbol(ticker: &str) -> String {
    ticker.trim().to_uppercase().replace('/', "")
}

pub fn klines_query(symbol: &str, timeframe: Timeframe, start_ms: i64) -> Result<String> {
    let params = [
        ("symbol", market_symbol(symbol)),
        ("interval", timeframe.as_str().to_string()),
        ("startTime", start_ms.to_string()),
        ("limit", KLINE_LIMIT.to_string()),
    ];
    Ok(serde_urlencoded::to_string(params)?)
}

pub fn start_of_day_ms(date: NaiveDate) -> Result<i64> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid start date {}", date))?;
    Ok(Utc.from_utc_datetime(&midnight).timestamp_millis())
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>> {
        let mut since = start_of_day_ms(start)?;
        let mut candles = Vec::new();

        info!(
            "Fetching '{}' data from Binance on timeframe '{}' starting from {}...",
            symbol, timeframe, start
        );

        loop {
            let batch = self.fetch_batch(symbol, timeframe, since).await?;
            let Some(last) = batch.last() else {
                break;
            };
            let next = last.open_time + 1;
            let loaded = batch.len();

            for row in batch {
                candles.push(row.into_candle()?);
            }
            if let Some(latest) = candles.last() {
                info!("Loaded {} more candles, up to {}", loaded, latest.timestamp);
            }

            if next <= since {
                warn!("Kline pagination did not advance past {}, stopping", since);
                break;
            }
            since = next;
        }

        if candles.is_empty() {
            warn!(
                "Couldn't load data for ticker {}. Maybe it doesn't exist on Binance?",
                symbol
            );
        } else {
            info!("Data loaded successfully. Total candles: {}", candles.len());
        }
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const HOUR_MS: i64 = 3_600_000;

    fn kline(open_time: i64, close: &str) -> String {
        format!(
            r#"[{open_time},"1.0","2.0","0.5","{close}","10.0",{close_time},"10.0",5,"1.0","1.0","0"]"#,
            close_time = open_time + HOUR_MS - 1,
        )
    }

    fn page(rows: &[String]) -> String {
        format!("[{}]", rows.join(","))
    }

    /// Serves one canned body per connection and returns the request targets it saw.
    async fn serve(bodies: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut targets = Vec::new();
            for body in bodies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let head = String::from_utf8_lossy(&request);
                let target = head.split_whitespace().nth(1).unwrap_or_default().to_string();
                targets.push(target);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            targets
        });
        (base_url, handle)
    }

    fn start_time(target: &str) -> i64 {
        target
            .split(['?', '&'])
            .find_map(|kv| kv.strip_prefix("startTime="))
            .unwrap()
            .parse()
            .unwrap()
    }

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn fetch_pages_until_empty_batch() {
        let t0 = start_of_day_ms(jan_first()).unwrap();
        let (base_url, server) = serve(vec![
            page(&[kline(t0, "100.0"), kline(t0 + HOUR_MS, "101.5")]),
            page(&[kline(t0 + 2 * HOUR_MS, "99.25")]),
            "[]".to_string(),
        ])
        .await;

        let client = BinanceClient::with_base_url(&base_url);
        let candles = tokio::time::timeout(
            Duration::from_secs(10),
            client.fetch_candles("eth/usdt", jan_first(), Timeframe::H1),
        )
        .await
        .unwrap()
        .unwrap();

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![100.0, 101.5, 99.25]);
        assert_eq!(candles[2].timestamp.timestamp_millis(), t0 + 2 * HOUR_MS);

        let targets = server.await.unwrap();
        let starts: Vec<i64> = targets.iter().map(|t| start_time(t)).collect();
        assert_eq!(starts, vec![t0, t0 + HOUR_MS + 1, t0 + 2 * HOUR_MS + 1]);
        assert!(targets.iter().all(|t| t.starts_with("/api/v3/klines?symbol=ETHUSDT&interval=1h")));
    }

    #[tokio::test]
    async fn fetch_stops_when_batch_does_not_advance() {
        let t0 = start_of_day_ms(jan_first()).unwrap();
        // a row older than the requested start would loop forever
        let (base_url, server) = serve(vec![page(&[kline(t0 - HOUR_MS, "50.0")])]).await;

        let client = BinanceClient::with_base_url(&base_url);
        let candles = tokio::time::timeout(
            Duration::from_secs(10),
            client.fetch_candles("ETHUSDT", jan_first(), Timeframe::H1),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(candles.len(), 1);
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fetch_with_no_data_returns_empty() {
        let (base_url, server) = serve(vec!["[]".to_string()]).await;

        let client = BinanceClient::with_base_url(&base_url);
        let candles = client
            .fetch_candles("NOPE/USDT", jan_first(), Timeframe::D1)
            .await
            .unwrap();

        assert!(candles.is_empty());
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[test]
    fn ticker_is_normalized_for_rest_api() {
        assert_eq!(market_symbol(" eth/usdt "), "ETHUSDT");
        assert_eq!(market_symbol("BTCUSDT"), "BTCUSDT");
    }

    #[test]
    fn kline_query_carries_pagination_params() {
        let query = klines_query("BTC/USDT", Timeframe::H4, 1_700_000_000_000).unwrap();
        assert_eq!(
            query,
            "symbol=BTCUSDT&interval=4h&startTime=1700000000000&limit=1000"
        );
    }

    #[test]
    fn start_date_maps_to_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(start_of_day_ms(date).unwrap(), 1_704_067_200_000);
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = BinanceClient::with_base_url("http://localhost:8080/");
        assert_eq!(client.base_rest_url, "http://localhost:8080");
    }
}
