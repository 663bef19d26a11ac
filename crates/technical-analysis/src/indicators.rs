use analysis_core::Candle;

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    let mut sum: f64 = data[..period].iter().sum();
    result.push(sum / period as f64);

    for i in period..data.len() {
        sum += data[i] - data[i - period];
        result.push(sum / period as f64);
    }
    result
}

/// Exponential Moving Average, seeded with the SMA of the first `period` values.
///
/// Output is aligned to the end of `data`: `result[i]` belongs to `data[i + period - 1]`.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len() - period + 1);

    let seed = data[..period].iter().sum::<f64>() / period as f64;
    result.push(seed);

    for &value in &data[period..] {
        let prev = *result.last().unwrap_or(&seed);
        result.push((value - prev) * multiplier + prev);
    }

    result
}

/// Relative Strength Index (Wilder smoothing)
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let to_rsi = |avg_gain: f64, avg_loss: f64| {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        }
    };

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let mut rsi_values = Vec::with_capacity(data.len() - period);
    rsi_values.push(to_rsi(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        rsi_values.push(to_rsi(avg_gain, avg_loss));
    }

    rsi_values
}

/// MACD (Moving Average Convergence Divergence)
#[derive(Debug, Clone, Default)]
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdResult {
    if fast_period == 0 || signal_period == 0 || slow_period <= fast_period {
        return MacdResult::default();
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);
    if ema_slow.is_empty() {
        return MacdResult::default();
    }

    // Both series end on the last close; the fast one starts earlier.
    let offset = slow_period - fast_period;
    let macd_line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, slow)| ema_fast[i + offset] - slow)
        .collect();

    let signal_line = ema(&macd_line, signal_period);

    let hist_offset = macd_line.len() - signal_line.len();
    let histogram = signal_line
        .iter()
        .enumerate()
        .map(|(i, signal)| macd_line[i + hist_offset] - signal)
        .collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
#[derive(Debug, Clone, Default)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerBands {
    /// Position of `price` inside the latest band: 0 at the lower band, 1 at the upper.
    pub fn percent_b(&self, price: f64) -> Option<f64> {
        let upper = *self.upper.last()?;
        let lower = *self.lower.last()?;
        if upper - lower == 0.0 {
            return Some(0.5);
        }
        Some((price - lower) / (upper - lower))
    }

    /// Latest band width relative to the middle band.
    pub fn bandwidth(&self) -> Option<f64> {
        let upper = *self.upper.last()?;
        let lower = *self.lower.last()?;
        let middle = *self.middle.last()?;
        if middle == 0.0 {
            return None;
        }
        Some((upper - lower) / middle)
    }
}

pub fn bollinger_bands(data: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    if period == 0 || data.len() < period {
        return BollingerBands::default();
    }

    let middle = sma(data, period);
    let mut upper = Vec::with_capacity(middle.len());
    let mut lower = Vec::with_capacity(middle.len());

    for i in period - 1..data.len() {
        let slice = &data[i + 1 - period..=i];
        let mean = middle[i + 1 - period];
        let variance: f64 = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let std = variance.sqrt();

        upper.push(mean + std_dev * std);
        lower.push(mean - std_dev * std);
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let high_low = cur.high - cur.low;
            let high_close = (cur.high - prev.close).abs();
            let low_close = (cur.low - prev.close).abs();
            high_low.max(high_close).max(low_close)
        })
        .collect()
}

/// Average True Range
pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period + 1 {
        return vec![];
    }

    let true_ranges = true_ranges(candles);

    let mut atr_values = Vec::with_capacity(true_ranges.len() - period + 1);
    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    atr_values.push(atr);

    for tr in &true_ranges[period..] {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
        atr_values.push(atr);
    }

    atr_values
}

/// Stochastic Oscillator
#[derive(Debug, Clone, Default)]
pub struct StochasticResult {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> StochasticResult {
    if k_period == 0 || candles.len() < k_period {
        return StochasticResult::default();
    }

    let mut k_values = Vec::with_capacity(candles.len() - k_period + 1);

    for i in k_period - 1..candles.len() {
        let slice = &candles[i + 1 - k_period..=i];
        let highest = slice.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let lowest = slice.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

        let k = if highest == lowest {
            50.0
        } else {
            100.0 * (candles[i].close - lowest) / (highest - lowest)
        };

        k_values.push(k);
    }

    let d_values = sma(&k_values, d_period);

    StochasticResult {
        k: k_values,
        d: d_values,
    }
}

/// On-Balance Volume
pub fn obv(candles: &[Candle]) -> Vec<f64> {
    let Some(first) = candles.first() else {
        return vec![];
    };

    let mut obv_values = Vec::with_capacity(candles.len());
    obv_values.push(first.volume);

    for w in candles.windows(2) {
        let prev_obv = *obv_values.last().unwrap_or(&0.0);
        let next = if w[1].close > w[0].close {
            prev_obv + w[1].volume
        } else if w[1].close < w[0].close {
            prev_obv - w[1].volume
        } else {
            prev_obv
        };
        obv_values.push(next);
    }

    obv_values
}

/// Percentage change over `period` bars
pub fn rate_of_change(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() <= period {
        return vec![];
    }
    (period..data.len())
        .filter(|&i| data[i - period] != 0.0)
        .map(|i| (data[i] - data[i - period]) / data[i - period] * 100.0)
        .collect()
}

/// Support and resistance levels from recent pivot points
#[derive(Debug, Clone, Default)]
pub struct SupportResistance {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

pub fn support_resistance(candles: &[Candle], lookback: usize) -> SupportResistance {
    if lookback < 5 || candles.len() < lookback {
        return SupportResistance::default();
    }

    let recent = &candles[candles.len() - lookback..];
    let mut swing_highs: Vec<f64> = Vec::new();
    let mut swing_lows: Vec<f64> = Vec::new();

    // Local extremes with 2-bar confirmation on each side
    for i in 2..recent.len() - 2 {
        let neighbours = [i - 2, i - 1, i + 1, i + 2];
        if neighbours.iter().all(|&j| recent[i].high > recent[j].high) {
            swing_highs.push(recent[i].high);
        }
        if neighbours.iter().all(|&j| recent[i].low < recent[j].low) {
            swing_lows.push(recent[i].low);
        }
    }

    let current_price = recent[recent.len() - 1].close;

    // Nearest resistance = lowest swing high above current price
    let resistance = swing_highs
        .iter()
        .filter(|&&h| h > current_price)
        .copied()
        .reduce(f64::min);

    // Nearest support = highest swing low below current price
    let support = swing_lows
        .iter()
        .filter(|&&l| l < current_price)
        .copied()
        .reduce(f64::max);

    SupportResistance { support, resistance }
}

/// Volume-Weighted Average Price
pub fn vwap(candles: &[Candle]) -> Vec<f64> {
    let mut vwap_values = Vec::with_capacity(candles.len());
    let mut cumulative_tpv = 0.0;
    let mut cumulative_volume = 0.0;

    for candle in candles {
        let typical_price = (candle.high + candle.low + candle.close) / 3.0;
        cumulative_tpv += typical_price * candle.volume;
        cumulative_volume += candle.volume;

        let vwap = if cumulative_volume > 0.0 {
            cumulative_tpv / cumulative_volume
        } else {
            typical_price
        };

        vwap_values.push(vwap);
    }

    vwap_values
}
