use clausewatch_report::RiskSummary;
use serde::Serialize;

/// Ordered sub-steps of the result view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStep {
    #[default]
    Overview,
    Detail,
    Negotiation,
}

impl ResultStep {
    pub const ALL: [ResultStep; 3] = [Self::Overview, Self::Detail, Self::Negotiation];

    /// The following step; stays on the last one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Overview => Self::Detail,
            Self::Detail | Self::Negotiation => Self::Negotiation,
        }
    }

    /// The preceding step; stays on the first one.
    #[must_use]
    pub const fn previous(self) -> Self {
        match self {
            Self::Overview | Self::Detail => Self::Overview,
            Self::Negotiation => Self::Detail,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Detail => "Detailed analysis",
            Self::Negotiation => "Negotiation script",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "view", content = "step", rename_all = "snake_case")]
pub enum View {
    #[default]
    Input,
    Result(ResultStep),
}

/// Everything a session holds. Private to one user; lives in memory only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub current_view: View,
    pub contract_text: String,
    pub analysis_report: String,
    pub negotiation_script: String,
    pub risk_summary: RiskSummary,
    /// Empty until the first analysis picks a model
    pub selected_model_id: String,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Revert every field to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn has_result(&self) -> bool {
        matches!(self.current_view, View::Result(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clausewatch_report::Score;

    #[test]
    fn test_steps_saturate() {
        assert_eq!(ResultStep::Overview.previous(), ResultStep::Overview);
        assert_eq!(ResultStep::Overview.next(), ResultStep::Detail);
        assert_eq!(ResultStep::Detail.next(), ResultStep::Negotiation);
        assert_eq!(ResultStep::Negotiation.next(), ResultStep::Negotiation);
        assert_eq!(ResultStep::Negotiation.previous(), ResultStep::Detail);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut session = Session {
            current_view: View::Result(ResultStep::Detail),
            contract_text: "租賃契約".into(),
            analysis_report: "report".into(),
            negotiation_script: "tips".into(),
            risk_summary: RiskSummary {
                score: Score::saturating(88),
                risk_tier: "高".into(),
                trap_count: 4,
            },
            selected_model_id: "gemini-1.5-flash".into(),
        };

        session.reset();

        assert_eq!(session, Session::default());
        assert_eq!(session.current_view, View::Input);
        assert_eq!(session.risk_summary.risk_tier, "unevaluated");
    }
}
