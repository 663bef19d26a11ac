use analysis_core::{AnalysisError, Candle, Fundamentals, Interval, Quote};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::http::HttpTransport;

pub const DEFAULT_SUMMARY_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_CHART_URL: &str = "https://query1.finance.yahoo.com";

const SUMMARY_MODULES: &str = "financialData,defaultKeyStatistics,summaryDetail,price";

/// Fundamentals fields that hold text rather than numbers.
const STRING_FIELDS: &[&str] = &["symbol", "longName", "recommendationKey"];

/// Quotes, historical candles and fundamentals from the quote provider.
#[derive(Clone)]
pub struct YahooClient {
    transport: HttpTransport,
    summary_url: String,
    chart_url: String,
}

impl YahooClient {
    pub fn new(summary_url: impl Into<String>, chart_url: impl Into<String>, requests_per_minute: usize) -> Self {
        Self {
            transport: HttpTransport::new("Yahoo", requests_per_minute),
            summary_url: summary_url.into().trim_end_matches('/').to_string(),
            chart_url: chart_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_transport(mut self, transport: HttpTransport) -> Self {
        self.transport = transport;
        self
    }

    async fn chart(&self, symbol: &str, interval: &str, range: &str) -> Result<ChartResult, AnalysisError> {
        let url = format!("{}/v8/finance/chart/{}", self.chart_url, symbol);
        let response: ChartResponse = self
            .transport
            .get_json(self.transport.get(&url).query(&[("interval", interval), ("range", range)]))
            .await?;

        if let Some(err) = response.chart.error {
            return Err(AnalysisError::ApiError(format!("{}: {}", symbol, err.description)));
        }
        response
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| AnalysisError::InvalidData(format!("empty chart response for {}", symbol)))
    }

    /// Latest price from the chart metadata.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, AnalysisError> {
        let meta = self.chart(symbol, "1d", "1d").await?.meta;
        let price = meta
            .regular_market_price
            .ok_or_else(|| AnalysisError::InvalidData(format!("no market price for {}", symbol)))?;

        Ok(Quote {
            symbol: meta.symbol.unwrap_or_else(|| symbol.to_string()),
            price,
            previous_close: meta.chart_previous_close.or(meta.previous_close),
            change: None,
            change_percent: None,
            currency: meta.currency,
            exchange: meta.exchange_name,
            timestamp: meta
                .regular_market_time
                .and_then(|t| DateTime::from_timestamp(t, 0))
                .unwrap_or_else(Utc::now),
        }
        .with_derived_change())
    }

    /// Historical candles; rows with a missing open, high, low or close are skipped.
    pub async fn get_candles(&self, symbol: &str, interval: Interval, range: &str) -> Result<Vec<Candle>, AnalysisError> {
        let interval = match interval {
            Interval::Hourly => "1h",
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
        };
        let result = self.chart(symbol, interval, range).await?;
        let timestamps = result.timestamp.unwrap_or_default();
        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return Ok(Vec::new());
        };

        let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();
        let candles = timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                Some(Candle {
                    timestamp: DateTime::from_timestamp(ts, 0)?,
                    open: at(&quote.open, i)?,
                    high: at(&quote.high, i)?,
                    low: at(&quote.low, i)?,
                    close: at(&quote.close, i)?,
                    volume: at(&quote.volume, i).unwrap_or(0.0),
                })
            })
            .collect();
        Ok(candles)
    }

    pub async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals, AnalysisError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.summary_url, symbol);
        let response: SummaryResponse = self
            .transport
            .get_json(self.transport.get(&url).query(&[("modules", SUMMARY_MODULES)]))
            .await?;

        if let Some(err) = response.quote_summary.error {
            return Err(AnalysisError::ApiError(format!("{}: {}", symbol, err.description)));
        }
        let modules = response
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| AnalysisError::InvalidData(format!("empty quoteSummary for {}", symbol)))?;

        let mut fundamentals = flatten_summary(&modules)?;
        fundamentals.symbol = symbol.to_string();
        Ok(fundamentals)
    }
}

/// Merge the summary modules into one flat object, unwrapping `{raw, fmt}` values.
///
/// Later modules win, so `financialData` overrides `summaryDetail` for shared keys.
pub fn flatten_summary(modules: &Value) -> Result<Fundamentals, AnalysisError> {
    let mut flat = Map::new();

    for module in ["price", "summaryDetail", "defaultKeyStatistics", "financialData"] {
        let Some(fields) = modules.get(module).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in fields {
            if let Some(v) = unwrap_value(key, value) {
                flat.insert(key.clone(), v);
            }
        }
    }

    serde_json::from_value(Value::Object(flat)).map_err(|e| AnalysisError::InvalidData(e.to_string()))
}

fn unwrap_value(key: &str, value: &Value) -> Option<Value> {
    let inner = match value {
        Value::Object(obj) => obj.get("raw")?,
        other => other,
    };
    match inner {
        Value::Number(_) => Some(inner.clone()),
        Value::String(_) if STRING_FIELDS.contains(&key) => Some(inner.clone()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    currency: Option<String>,
    exchange_name: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChartQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryEnvelope,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    result: Option<Vec<Value>>,
    error: Option<ProviderError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_unwraps_raw_values() {
        let modules = json!({
            "price": { "longName": "Apple Inc.", "regularMarketPrice": { "raw": 190.5, "fmt": "190.50" } },
            "summaryDetail": { "trailingPE": { "raw": 29.4, "fmt": "29.40" }, "beta": { "raw": 1.2, "fmt": "1.20" } },
            "defaultKeyStatistics": { "52WeekChange": { "raw": 0.18, "fmt": "18%" }, "pegRatio": {} },
            "financialData": {
                "currentPrice": { "raw": 191.0, "fmt": "191.00" },
                "recommendationKey": "buy",
                "financialCurrency": "USD",
                "grossMargins": { "raw": 0.45, "fmt": "45%" }
            }
        });

        let f = flatten_summary(&modules).unwrap();
        assert_eq!(f.long_name.as_deref(), Some("Apple Inc."));
        assert_eq!(f.trailing_pe, Some(29.4));
        assert_eq!(f.beta, Some(1.2));
        assert_eq!(f.fifty_two_week_change, Some(0.18));
        assert_eq!(f.peg_ratio, None);
        assert_eq!(f.current_price, Some(191.0));
        assert_eq!(f.recommendation_key.as_deref(), Some("buy"));
        assert_eq!(f.gross_margins, Some(0.45));
    }

    #[test]
    fn flatten_drops_textual_numbers() {
        let modules = json!({
            "summaryDetail": { "trailingPE": { "raw": "Infinity", "fmt": "∞" } }
        });
        let f = flatten_summary(&modules).unwrap();
        assert_eq!(f.trailing_pe, None);
    }
}
