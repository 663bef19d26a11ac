use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal strength
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalStrength {
    StrongBuy,
    Buy,
    WeakBuy,
    Neutral,
    WeakSell,
    Sell,
    StrongSell,
}

impl SignalStrength {
    /// Convert to numeric score (-100 to 100)
    pub fn to_score(&self) -> i32 {
        match self {
            SignalStrength::StrongBuy => 100,
            SignalStrength::Buy => 60,
            SignalStrength::WeakBuy => 30,
            SignalStrength::Neutral => 0,
            SignalStrength::WeakSell => -30,
            SignalStrength::Sell => -60,
            SignalStrength::StrongSell => -100,
        }
    }

    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 70 => SignalStrength::StrongBuy,
            s if s >= 30 => SignalStrength::Buy,
            s if s >= 5 => SignalStrength::WeakBuy,
            s if s >= -5 => SignalStrength::Neutral,
            s if s >= -30 => SignalStrength::WeakSell,
            s if s >= -70 => SignalStrength::Sell,
            _ => SignalStrength::StrongSell,
        }
    }

    /// Human-readable label for the signal
    pub fn to_label(&self) -> &'static str {
        match self {
            SignalStrength::StrongBuy => "Strong Buy",
            SignalStrength::Buy => "Buy",
            SignalStrength::WeakBuy => "Weak Buy",
            SignalStrength::Neutral => "Neutral",
            SignalStrength::WeakSell => "Weak Sell",
            SignalStrength::Sell => "Sell",
            SignalStrength::StrongSell => "Strong Sell",
        }
    }
}

/// Qualitative label attached to every report section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Strong,
    Moderate,
    Caution,
}

impl Rating {
    /// Classify a normalized score in [-100, 100].
    pub fn from_score(score: f64) -> Self {
        if score >= 30.0 {
            Rating::Strong
        } else if score >= -15.0 {
            Rating::Moderate
        } else {
            Rating::Caution
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Strong => "Strong",
            Rating::Moderate => "Moderate",
            Rating::Caution => "Caution",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A weighted bullish/bearish observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub weight: i32,
    pub bullish: bool,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", if self.bullish { "+" } else { "-" }, self.name)
    }
}

/// Comma-separated `+ name` / `- name` list.
pub fn describe(signals: &[Signal]) -> String {
    signals
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Accumulates signals and turns them into a normalized score.
#[derive(Debug, Clone, Default)]
pub struct SignalSet {
    signals: Vec<Signal>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, weight: i32, bullish: bool) {
        self.signals.push(Signal {
            name: name.into(),
            weight,
            bullish,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signals.iter().any(|s| s.name == name)
    }

    pub fn total_weight(&self) -> i32 {
        self.signals.iter().map(|s| s.weight).sum()
    }

    /// Net weight over total weight, scaled to -100..100.
    pub fn normalized_score(&self) -> f64 {
        let mut total_score = 0;
        let mut total_weight = 0;
        for s in &self.signals {
            total_weight += s.weight;
            total_score += if s.bullish { s.weight } else { -s.weight };
        }

        if total_weight > 0 {
            (total_score as f64 / total_weight as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Share of signals on the dominant side (0.5 when empty).
    pub fn agreement(&self) -> f64 {
        let bullish = self.signals.iter().filter(|s| s.bullish).count();
        let bearish = self.signals.len() - bullish;
        if self.signals.is_empty() {
            0.5
        } else {
            bullish.max(bearish) as f64 / self.signals.len() as f64
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signal> {
        self.signals.iter()
    }

    pub fn into_vec(self) -> Vec<Signal> {
        self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_is_neutral() {
        let set = SignalSet::new();
        assert_eq!(set.normalized_score(), 0.0);
        assert_eq!(set.agreement(), 0.5);
        assert_eq!(describe(set.iter().as_slice()), "");
    }

    #[test]
    fn normalized_score_weights_signals() {
        let mut set = SignalSet::new();
        set.push("Low P/E", 3, true);
        set.push("High Debt", 1, false);

        assert_eq!(set.total_weight(), 4);
        assert!((set.normalized_score() - 50.0).abs() < 1e-9);
        assert_eq!(describe(set.iter().as_slice()), "+ Low P/E, - High Debt");
        assert!((set.agreement() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rating_thresholds() {
        assert_eq!(Rating::from_score(30.0), Rating::Strong);
        assert_eq!(Rating::from_score(0.0), Rating::Moderate);
        assert_eq!(Rating::from_score(-15.0), Rating::Moderate);
        assert_eq!(Rating::from_score(-15.1), Rating::Caution);
        assert_eq!(Rating::Caution.to_string(), "Caution");
    }

    #[test]
    fn signal_strength_round_trip_labels() {
        assert_eq!(SignalStrength::from_score(75), SignalStrength::StrongBuy);
        assert_eq!(SignalStrength::from_score(0), SignalStrength::Neutral);
        assert_eq!(SignalStrength::from_score(-50), SignalStrength::Sell);
        assert_eq!(SignalStrength::Sell.to_label(), "Sell");
    }
}
