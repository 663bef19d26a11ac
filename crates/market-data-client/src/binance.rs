use analysis_core::{AnalysisError, Candle, Interval, Quote};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::http::HttpTransport;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Spot tickers and klines from the crypto exchange.
#[derive(Clone)]
pub struct BinanceClient {
    transport: HttpTransport,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>, requests_per_minute: usize) -> Self {
        Self {
            transport: HttpTransport::new("Binance", requests_per_minute),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_transport(mut self, transport: HttpTransport) -> Self {
        self.transport = transport;
        self
    }

    /// 24-hour rolling ticker for a pair such as `BTCUSDT`.
    pub async fn get_ticker(&self, pair: &str) -> Result<Quote, AnalysisError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let ticker: Ticker24h = self
            .transport
            .get_json(self.transport.get(&url).query(&[("symbol", pair)]))
            .await?;

        Ok(Quote {
            symbol: ticker.symbol,
            price: parse_decimal(&ticker.last_price, "lastPrice")?,
            previous_close: ticker.prev_close_price.as_deref().and_then(|p| p.parse().ok()),
            change: ticker.price_change.as_deref().and_then(|p| p.parse().ok()),
            change_percent: ticker.price_change_percent.as_deref().and_then(|p| p.parse().ok()),
            currency: None,
            exchange: Some("Binance".to_string()),
            timestamp: ticker
                .close_time
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or_else(Utc::now),
        }
        .with_derived_change())
    }

    pub async fn get_candles(&self, pair: &str, interval: Interval, limit: u32) -> Result<Vec<Candle>, AnalysisError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let interval = match interval {
            Interval::Hourly => "1h",
            Interval::Daily => "1d",
            Interval::Weekly => "1w",
        };
        let limit = limit.clamp(1, 1000).to_string();
        let rows: Vec<Vec<Value>> = self
            .transport
            .get_json(self.transport.get(&url).query(&[
                ("symbol", pair),
                ("interval", interval),
                ("limit", limit.as_str()),
            ]))
            .await?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }
}

fn parse_decimal(raw: &str, field: &str) -> Result<f64, AnalysisError> {
    raw.parse()
        .map_err(|_| AnalysisError::InvalidData(format!("{} is not a number: {:?}", field, raw)))
}

/// `[open_time, open, high, low, close, volume, close_time, ...]` with prices as strings.
fn parse_kline(row: &[Value]) -> Result<Candle, AnalysisError> {
    let number = |i: usize, field: &str| -> Result<f64, AnalysisError> {
        match row.get(i) {
            Some(Value::String(s)) => parse_decimal(s, field),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| AnalysisError::InvalidData(format!("{} out of range", field))),
            _ => Err(AnalysisError::InvalidData(format!("kline missing {}", field))),
        }
    };

    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| AnalysisError::InvalidData("kline missing open time".to_string()))?;

    Ok(Candle {
        timestamp: open_time,
        open: number(1, "open")?,
        high: number(2, "high")?,
        low: number(3, "low")?,
        close: number(4, "close")?,
        volume: number(5, "volume")?,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    symbol: String,
    last_price: String,
    prev_close_price: Option<String>,
    price_change: Option<String>,
    price_change_percent: Option<String>,
    close_time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kline_strings_are_parsed() {
        let row = json!([1714521600000i64, "60000.01", "61000.5", "59000", "60500.25", "1234.5", 1714607999999i64, "0", 100]);
        let candle = parse_kline(row.as_array().unwrap()).unwrap();
        assert_eq!(candle.open, 60000.01);
        assert_eq!(candle.close, 60500.25);
        assert_eq!(candle.volume, 1234.5);
        assert_eq!(candle.timestamp.timestamp_millis(), 1714521600000);
    }

    #[test]
    fn malformed_kline_is_rejected() {
        let row = json!([1714521600000i64, "abc", "1", "1", "1", "1"]);
        assert!(matches!(
            parse_kline(row.as_array().unwrap()),
            Err(AnalysisError::InvalidData(_))
        ));
        assert!(parse_kline(&[]).is_err());
    }
}
