use analysis_core::{AnalysisError, BondYield, YieldCurve};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::http::HttpTransport;

pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org";

/// Treasury constant-maturity series that make up the curve, short end first.
pub const CURVE_SERIES: &[(&str, &str)] = &[
    ("DGS3MO", "3M"),
    ("DGS2", "2Y"),
    ("DGS5", "5Y"),
    ("DGS10", "10Y"),
    ("DGS30", "30Y"),
];

/// Observations to scan for the latest non-missing value.
const OBSERVATION_LIMIT: &str = "10";

#[derive(Clone)]
pub struct FredClient {
    transport: HttpTransport,
    base_url: String,
    api_key: Option<String>,
}

impl FredClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, requests_per_minute: usize) -> Self {
        Self {
            transport: HttpTransport::new("FRED", requests_per_minute),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn with_transport(mut self, transport: HttpTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Latest observation of a series. FRED marks missing days with ".".
    pub async fn get_yield(&self, series_id: &str) -> Result<BondYield, AnalysisError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AnalysisError::Config("FRED_API_KEY is not set".to_string()))?;

        let url = format!("{}/fred/series/observations", self.base_url);
        let response: ObservationsResponse = self
            .transport
            .get_json(self.transport.get(&url).query(&[
                ("series_id", series_id),
                ("api_key", api_key),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", OBSERVATION_LIMIT),
            ]))
            .await?;

        let (date, yield_pct) = response
            .observations
            .iter()
            .find_map(|obs| {
                let value: f64 = obs.value.parse().ok()?;
                let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").ok()?;
                Some((date, value))
            })
            .ok_or_else(|| {
                AnalysisError::InsufficientData(format!("no recent observation for {}", series_id))
            })?;

        Ok(BondYield {
            series_id: series_id.to_string(),
            maturity_label: maturity_label(series_id).to_string(),
            date,
            yield_pct,
        })
    }

    /// The five-point Treasury curve. Points that fail to load are left out.
    pub async fn get_yield_curve(&self) -> Result<YieldCurve, AnalysisError> {
        let (m3, y2, y5, y10, y30) = tokio::join!(
            self.get_yield(CURVE_SERIES[0].0),
            self.get_yield(CURVE_SERIES[1].0),
            self.get_yield(CURVE_SERIES[2].0),
            self.get_yield(CURVE_SERIES[3].0),
            self.get_yield(CURVE_SERIES[4].0),
        );

        let mut points = Vec::with_capacity(CURVE_SERIES.len());
        let mut last_error = None;
        for result in [m3, y2, y5, y10, y30] {
            match result {
                Ok(point) => points.push(point),
                Err(e) => {
                    tracing::warn!("Yield curve point unavailable: {}", e);
                    last_error = Some(e);
                }
            }
        }

        match (points.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(YieldCurve { points }),
        }
    }
}

pub fn maturity_label(series_id: &str) -> &str {
    CURVE_SERIES
        .iter()
        .find(|(id, _)| *id == series_id)
        .map(|(_, label)| *label)
        .unwrap_or(series_id)
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}
