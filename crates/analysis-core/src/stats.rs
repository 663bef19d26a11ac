//! Small statistics helpers shared by the analyzers.

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Compute sample standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Period-over-period simple returns. Pairs with a non-positive base are skipped.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Where `value` sits between `low` and `high`, clamped to 0..=1.
pub fn range_position(value: f64, low: f64, high: f64) -> Option<f64> {
    if high <= low {
        return None;
    }
    Some(((value - low) / (high - low)).clamp(0.0, 1.0))
}
