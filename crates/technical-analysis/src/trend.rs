use analysis_core::Candle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl Trend {
    pub fn describe(&self) -> &'static str {
        match self {
            Trend::Uptrend => "an uptrend",
            Trend::Downtrend => "a downtrend",
            Trend::Sideways => "a sideways range",
        }
    }
}

/// Least-squares slope of `values` against their index.
fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let x_sum: f64 = (0..values.len()).map(|i| i as f64).sum();
    let y_sum: f64 = values.iter().sum();
    let xy_sum: f64 = values.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();
    let x_squared_sum: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();

    let denominator = n * x_squared_sum - x_sum.powi(2);
    if denominator == 0.0 {
        return 0.0;
    }
    (n * xy_sum - x_sum * y_sum) / denominator
}

/// Classify the last `lookback` candles by the regression slope of highs and lows.
///
/// The average slope must exceed `min_slope` times the average candle range to
/// count as a trend.
pub fn detect_trend(candles: &[Candle], lookback: usize, min_slope: f64) -> Trend {
    if lookback < 2 || candles.len() < lookback {
        return Trend::Sideways;
    }

    let recent = &candles[candles.len() - lookback..];
    let highs: Vec<f64> = recent.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = recent.iter().map(|c| c.low).collect();

    let avg_slope = (slope(&highs) + slope(&lows)) / 2.0;
    let price_range = recent.iter().map(|c| c.high - c.low).sum::<f64>() / lookback as f64;

    if avg_slope > price_range * min_slope {
        Trend::Uptrend
    } else if avg_slope < -price_range * min_slope {
        Trend::Downtrend
    } else {
        Trend::Sideways
    }
}
