//! Disease probability → ordinal risk tier.
//!
//! Bands are closed on the low end and open on the high end, except the
//! last band which also includes 1.0. Together they partition [0, 1].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PredictionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::VeryHigh => "very-high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which built-in tier table to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTierVariant {
    #[default]
    FourTier,
    ThreeTier,
}

impl FromStr for RiskTierVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "four" | "4" | "four_tier" => Ok(RiskTierVariant::FourTier),
            "three" | "3" | "three_tier" => Ok(RiskTierVariant::ThreeTier),
            other => Err(format!("unknown risk tier table '{other}'")),
        }
    }
}

/// One band of a policy, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskBand {
    pub tier: RiskTier,
    pub lower: f64,
    pub upper: f64,
    pub upper_inclusive: bool,
}

/// Ordered cut points plus the tier for each resulting band.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskTierPolicy {
    cuts: Vec<f64>,
    tiers: Vec<RiskTier>,
}

impl RiskTierPolicy {
    /// `cuts` are the interior boundaries; `tiers.len()` must be `cuts.len() + 1`.
    pub fn new(cuts: Vec<f64>, tiers: Vec<RiskTier>) -> Result<Self, PredictionError> {
        let invalid = |msg: &str| PredictionError::InvalidArtifact(format!("risk policy: {msg}"));

        if tiers.len() != cuts.len() + 1 {
            return Err(invalid("tier count must be one more than cut count"));
        }
        if cuts.iter().any(|c| !(c.is_finite() && *c > 0.0 && *c < 1.0)) {
            return Err(invalid("cut points must lie strictly inside (0, 1)"));
        }
        if cuts.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("cut points must be strictly increasing"));
        }
        if tiers.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("tiers must be strictly ascending"));
        }
        Ok(Self { cuts, tiers })
    }

    /// Canonical table: low / medium / high / very-high at 0.3, 0.6, 0.8.
    pub fn four_tier() -> Self {
        Self {
            cuts: vec![0.3, 0.6, 0.8],
            tiers: vec![
                RiskTier::Low,
                RiskTier::Medium,
                RiskTier::High,
                RiskTier::VeryHigh,
            ],
        }
    }

    /// Alternate table: low / medium / high at 0.3, 0.6.
    pub fn three_tier() -> Self {
        Self {
            cuts: vec![0.3, 0.6],
            tiers: vec![RiskTier::Low, RiskTier::Medium, RiskTier::High],
        }
    }

    pub fn from_variant(variant: RiskTierVariant) -> Self {
        match variant {
            RiskTierVariant::FourTier => Self::four_tier(),
            RiskTierVariant::ThreeTier => Self::three_tier(),
        }
    }

    /// Map a disease probability to its tier.
    pub fn apply(&self, p_positive: f64) -> Result<RiskTier, PredictionError> {
        if !(0.0..=1.0).contains(&p_positive) {
            return Err(PredictionError::InvalidProbability(p_positive));
        }
        let band = self
            .cuts
            .iter()
            .position(|cut| p_positive < *cut)
            .unwrap_or(self.cuts.len());
        Ok(self.tiers[band])
    }

    pub fn bands(&self) -> Vec<RiskBand> {
        let mut bounds = Vec::with_capacity(self.cuts.len() + 2);
        bounds.push(0.0);
        bounds.extend_from_slice(&self.cuts);
        bounds.push(1.0);

        self.tiers
            .iter()
            .enumerate()
            .map(|(i, tier)| RiskBand {
                tier: *tier,
                lower: bounds[i],
                upper: bounds[i + 1],
                upper_inclusive: i == self.tiers.len() - 1,
            })
            .collect()
    }
}

impl Default for RiskTierPolicy {
    fn default() -> Self {
        Self::four_tier()
    }
}
