use analysis_core::stats::simple_returns;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Sortino reported when no return fell below the risk-free rate.
const NO_DOWNSIDE_SORTINO: f64 = 3.0;

/// Return-based risk statistics for one price series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRiskMetrics {
    pub bars: usize,
    pub annualized_return_pct: f64,
    pub volatility_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Historical one-period VaR at 95%, as a positive loss percentage
    pub var_95_pct: f64,
    pub cvar_95_pct: f64,
    /// Beta against the benchmark series, when one was supplied
    pub beta: Option<f64>,
}

impl PriceRiskMetrics {
    /// Returns `None` when fewer than two usable returns exist.
    pub fn compute(
        closes: &[f64],
        benchmark_closes: Option<&[f64]>,
        risk_free_rate: f64,
        periods_per_year: f64,
    ) -> Option<Self> {
        let returns = simple_returns(closes);
        if returns.len() < 2 {
            return None;
        }

        let beta = benchmark_closes
            .map(simple_returns)
            .and_then(|bench| beta(&returns, &bench));

        Some(Self {
            bars: closes.len(),
            annualized_return_pct: returns.as_slice().mean() * periods_per_year * 100.0,
            volatility_pct: volatility(&returns, periods_per_year),
            max_drawdown_pct: max_drawdown(closes),
            sharpe: sharpe_ratio(&returns, risk_free_rate, periods_per_year),
            sortino: sortino_ratio(&returns, risk_free_rate, periods_per_year),
            var_95_pct: value_at_risk(&returns),
            cvar_95_pct: conditional_value_at_risk(&returns),
            beta,
        })
    }
}

/// Annualized standard deviation of returns, as a percentage.
pub fn volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    returns.std_dev() * periods_per_year.sqrt() * 100.0
}

/// Largest peak-to-trough decline, as a percentage.
pub fn max_drawdown(prices: &[f64]) -> f64 {
    let mut peak = match prices.first() {
        Some(&p) => p,
        None => return 0.0,
    };
    let mut max_dd = 0.0;

    for &price in prices {
        if price > peak {
            peak = price;
        }
        if peak > 0.0 {
            let drawdown = (peak - price) / peak;
            if drawdown > max_dd {
                max_dd = drawdown;
            }
        }
    }

    max_dd * 100.0
}

pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std_dev = returns.std_dev();
    if std_dev == 0.0 {
        return 0.0;
    }

    let annualized_return = returns.mean() * periods_per_year;
    let annualized_volatility = std_dev * periods_per_year.sqrt();
    (annualized_return - risk_free_rate) / annualized_volatility
}

/// Like Sharpe, but only returns below the per-period risk-free rate count as risk.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }

    let annualized_return = returns.mean() * periods_per_year;
    let period_rf = risk_free_rate / periods_per_year;
    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < period_rf)
        .map(|&r| (r - period_rf).powi(2))
        .sum();

    if downside_sq == 0.0 {
        return NO_DOWNSIDE_SORTINO;
    }

    let downside_dev = (downside_sq / returns.len() as f64).sqrt() * periods_per_year.sqrt();
    (annualized_return - risk_free_rate) / downside_dev
}

fn sorted(returns: &[f64]) -> Vec<f64> {
    let mut sorted = returns.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// 5th-percentile return, reported as a positive loss percentage.
pub fn value_at_risk(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let sorted = sorted(returns);
    let index = ((returns.len() as f64 * 0.05) as usize).min(sorted.len() - 1);
    (-sorted[index]).max(0.0) * 100.0
}

/// Mean of the worst 5% of returns, as a positive loss percentage.
pub fn conditional_value_at_risk(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let sorted = sorted(returns);
    let cutoff = ((returns.len() as f64 * 0.05).ceil() as usize).max(1);
    let tail = &sorted[..cutoff];
    (-(tail.iter().sum::<f64>() / tail.len() as f64)).max(0.0) * 100.0
}

/// Covariance over benchmark variance, using the overlapping tail of both series.
pub fn beta(returns: &[f64], benchmark_returns: &[f64]) -> Option<f64> {
    let n = returns.len().min(benchmark_returns.len());
    if n < 2 {
        return None;
    }

    let asset = &returns[returns.len() - n..];
    let bench = &benchmark_returns[benchmark_returns.len() - n..];
    let asset_mean = asset.mean();
    let bench_mean = bench.mean();

    let mut covariance = 0.0;
    let mut bench_variance = 0.0;
    for (a, b) in asset.iter().zip(bench) {
        let bench_diff = b - bench_mean;
        covariance += (a - asset_mean) * bench_diff;
        bench_variance += bench_diff * bench_diff;
    }

    if bench_variance == 0.0 {
        return None;
    }
    Some(covariance / bench_variance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawdown_tracks_running_peak() {
        let prices = [100.0, 120.0, 90.0, 110.0, 60.0, 130.0];
        assert!((max_drawdown(&prices) - 50.0).abs() < 1e-9);
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn beta_of_scaled_series() {
        let bench = [0.01, -0.02, 0.015, 0.005, -0.01, 0.02];
        let asset: Vec<f64> = bench.iter().map(|r| r * 2.0).collect();
        assert!((beta(&asset, &bench).unwrap() - 2.0).abs() < 1e-9);
        assert!(beta(&asset, &[0.01, 0.01, 0.01]).is_none());
    }

    #[test]
    fn beta_aligns_tails() {
        let bench = [0.01, -0.02, 0.015, 0.005];
        let asset = [0.5, 0.5, 0.01, -0.02, 0.015, 0.005];
        assert!((beta(&asset, &bench).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tail_risk_uses_worst_returns() {
        let mut returns: Vec<f64> = vec![0.01; 19];
        returns.push(-0.05);
        // index 1 of the sorted returns is a gain
        assert_eq!(value_at_risk(&returns), 0.0);
        assert!((conditional_value_at_risk(&returns) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn sortino_without_downside() {
        let returns = [0.01, 0.02, 0.015];
        assert_eq!(sortino_ratio(&returns, 0.0, 252.0), NO_DOWNSIDE_SORTINO);
    }

    #[test]
    fn flat_series_has_no_volatility() {
        let closes = [100.0; 40];
        let m = PriceRiskMetrics::compute(&closes, None, 0.04, 252.0).unwrap();
        assert_eq!(m.volatility_pct, 0.0);
        assert_eq!(m.sharpe, 0.0);
        assert_eq!(m.max_drawdown_pct, 0.0);
        assert!(m.beta.is_none());
        assert!(PriceRiskMetrics::compute(&[100.0, 101.0], None, 0.04, 252.0).is_none());
    }
}
