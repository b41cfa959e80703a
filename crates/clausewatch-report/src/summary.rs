use serde::{Deserialize, Serialize};

/// Tier reported before any analysis has run.
pub const DEFAULT_RISK_TIER: &str = "unevaluated";

/// A risk score, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    pub const MAX: Score = Score(100);

    /// Clamp `value` into range.
    #[must_use]
    pub fn saturating(value: u64) -> Self {
        Self(value.min(100) as u8)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Headline figures of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub score: Score,
    /// Coarse label chosen by the model, e.g. 高 / 中 / 低
    pub risk_tier: String,
    pub trap_count: u32,
}

impl Default for RiskSummary {
    fn default() -> Self {
        Self {
            score: Score::default(),
            risk_tier: DEFAULT_RISK_TIER.to_string(),
            trap_count: 0,
        }
    }
}
