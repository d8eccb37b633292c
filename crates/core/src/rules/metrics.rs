use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::errors::ParameterError;

/// Token written in place of an infinite metric value.
pub const INFINITY_TOKEN: &str = "inf";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMetric {
    Support,
    Confidence,
    Lift,
    Leverage,
    Conviction,
}

impl RuleMetric {
    pub const ALL: [RuleMetric; 5] =
        [Self::Support, Self::Confidence, Self::Lift, Self::Leverage, Self::Conviction];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Confidence => "confidence",
            Self::Lift => "lift",
            Self::Leverage => "leverage",
            Self::Conviction => "conviction",
        }
    }

    /// Rejects thresholds no rule could ever meet or fail.
    pub fn validate_threshold(self, value: f64) -> Result<(), ParameterError> {
        let (valid, range) = match self {
            Self::Support | Self::Confidence => ((0.0..=1.0).contains(&value), "[0, 1]"),
            Self::Lift | Self::Conviction => (value >= 0.0, "[0, inf)"),
            Self::Leverage => ((-0.25..=0.25).contains(&value), "[-0.25, 0.25]"),
        };
        if valid {
            Ok(())
        } else {
            Err(ParameterError::ThresholdOutOfRange { metric: self.as_str(), range, value })
        }
    }
}

impl fmt::Display for RuleMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleMetric {
    type Err = ParameterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "support" => Ok(Self::Support),
            "confidence" => Ok(Self::Confidence),
            "lift" => Ok(Self::Lift),
            "leverage" => Ok(Self::Leverage),
            "conviction" => Ok(Self::Conviction),
            other => Err(ParameterError::UnknownMetric(other.to_owned())),
        }
    }
}

/// Interest measures of one rule. `conviction` is `f64::INFINITY` when the
/// rule never fails (confidence of exactly 1).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RuleMetrics {
    pub antecedent_support: f64,
    pub consequent_support: f64,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub leverage: f64,
    #[serde(serialize_with = "serialize_metric")]
    pub conviction: f64,
}

impl RuleMetrics {
    /// Derives every metric from support counts. `antecedent_count` must be
    /// positive, which holds for any subset of a frequent itemset.
    pub fn from_counts(
        joint_count: usize,
        antecedent_count: usize,
        consequent_count: usize,
        total: usize,
    ) -> Self {
        let total = total as f64;
        let support = joint_count as f64 / total;
        let antecedent_support = antecedent_count as f64 / total;
        let consequent_support = consequent_count as f64 / total;
        let confidence = joint_count as f64 / antecedent_count as f64;
        // Both counts are multiplied first so that lift(A => C) == lift(C => A)
        // bit for bit.
        let lift = (joint_count as f64 * total)
            / (antecedent_count as f64 * consequent_count as f64);
        let leverage = support - antecedent_support * consequent_support;
        let conviction = if joint_count >= antecedent_count {
            f64::INFINITY
        } else {
            (1.0 - consequent_support) / (1.0 - confidence)
        };

        Self { antecedent_support, consequent_support, support, confidence, lift, leverage, conviction }
    }

    pub fn get(&self, metric: RuleMetric) -> f64 {
        match metric {
            RuleMetric::Support => self.support,
            RuleMetric::Confidence => self.confidence,
            RuleMetric::Lift => self.lift,
            RuleMetric::Leverage => self.leverage,
            RuleMetric::Conviction => self.conviction,
        }
    }

    pub fn rounded(&self, precision: u32) -> Self {
        Self {
            antecedent_support: round_half_away(self.antecedent_support, precision),
            consequent_support: round_half_away(self.consequent_support, precision),
            support: round_half_away(self.support, precision),
            confidence: round_half_away(self.confidence, precision),
            lift: round_half_away(self.lift, precision),
            leverage: round_half_away(self.leverage, precision),
            conviction: round_half_away(self.conviction, precision),
        }
    }
}

/// Rounds to `precision` decimal places, halves away from zero. Non-finite
/// values pass through unchanged.
pub fn round_half_away(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(precision as i32);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Serializes finite values as numbers and infinities as [`INFINITY_TOKEN`].
pub fn serialize_metric<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_infinite() {
        let token = if value.is_sign_positive() {
            INFINITY_TOKEN.to_owned()
        } else {
            format!("-{INFINITY_TOKEN}")
        };
        serializer.serialize_str(&token)
    } else {
        serializer.serialize_f64(*value)
    }
}
