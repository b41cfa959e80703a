use clausewatch_prompt_template::{MarkerBlock, PromptTemplate};
use serde::Serialize;

use crate::normalize::{normalize_count, normalize_score_in};
use crate::summary::{DEFAULT_RISK_TIER, RiskSummary};

/// Shown in place of the negotiation script when the answer has none.
pub const MISSING_TIPS_PLACEHOLDER: &str =
    PromptTemplate::TraditionalChinese.missing_tips_placeholder();

/// The three sections recovered from a model answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedResponse {
    /// `None` when the answer has no data block; the caller keeps its
    /// previous summary.
    pub data: Option<RiskSummary>,
    pub report: String,
    pub tips: String,
}

impl ParsedResponse {
    /// The parsed summary, or `previous` when there was no data block.
    #[must_use]
    pub fn summary_or(&self, previous: &RiskSummary) -> RiskSummary {
        self.data.clone().unwrap_or_else(|| previous.clone())
    }
}

/// Parse a raw answer using the default tips placeholder.
#[must_use]
pub fn parse(raw: &str) -> ParsedResponse {
    parse_with_placeholder(raw, MISSING_TIPS_PLACEHOLDER)
}

/// Parse a raw answer into its data line, report and negotiation tips.
///
/// Blocks are located independently, so their order in the answer does not
/// matter. Never fails:
/// - no report block: the whole raw text is the report
/// - no tips block: `tips_placeholder`
/// - no data block: `data` is `None`
#[must_use]
pub fn parse_with_placeholder(raw: &str, tips_placeholder: &str) -> ParsedResponse {
    let data = extract_block(raw, MarkerBlock::Data).map(parse_data_line);

    let report = match extract_block(raw, MarkerBlock::Report) {
        Some(body) => body.to_string(),
        None => {
            tracing::debug!("answer has no report block; using the whole text");
            raw.to_string()
        }
    };

    let tips = match extract_block(raw, MarkerBlock::Tips) {
        Some(body) => body.to_string(),
        None => tips_placeholder.to_string(),
    };

    ParsedResponse { data, report, tips }
}

/// Content of the innermost `block` pair: the first close tag that has an open
/// tag before it, paired with the nearest such open tag. Trimmed.
fn extract_block(raw: &str, block: MarkerBlock) -> Option<&str> {
    let open = block.open_tag();
    let close = block.close_tag();

    let mut search_from = 0;
    while let Some(rel) = raw[search_from..].find(close) {
        let close_at = search_from + rel;
        if let Some(open_at) = raw[..close_at].rfind(open) {
            return Some(raw[open_at + open.len()..close_at].trim());
        }
        search_from = close_at + close.len();
    }
    None
}

/// Split on ASCII, full-width or ideographic commas.
fn split_fields(line: &str) -> Vec<&str> {
    line.split([',', '，', '、']).map(str::trim).collect()
}

fn parse_data_line(line: &str) -> RiskSummary {
    let fields = split_fields(line);
    let field = |i: usize| fields.get(i).copied().unwrap_or_default();

    let tier = field(1);
    RiskSummary {
        score: normalize_score_in(field(0), line),
        risk_tier: if tier.is_empty() {
            DEFAULT_RISK_TIER.to_string()
        } else {
            tier.to_string()
        },
        trap_count: normalize_count(field(2)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_answer() {
        let raw = "前言\n[BLOCK_DATA]85, 高, 4[/BLOCK_DATA]\n[BLOCK_REPORT]\n第一條過苛\n[/BLOCK_REPORT]\n[BLOCK_TIPS]請求刪除第一條[/BLOCK_TIPS]";
        let parsed = parse(raw);

        let data = parsed.data.unwrap();
        assert_eq!(data.score.get(), 85);
        assert_eq!(data.risk_tier, "高");
        assert_eq!(data.trap_count, 4);
        assert_eq!(parsed.report, "第一條過苛");
        assert_eq!(parsed.tips, "請求刪除第一條");
    }

    #[test]
    fn test_blocks_in_any_order() {
        let raw = "[BLOCK_TIPS]T[/BLOCK_TIPS][BLOCK_REPORT]R[/BLOCK_REPORT][BLOCK_DATA]3/10，中，1[/BLOCK_DATA]";
        let parsed = parse(raw);
        assert_eq!(parsed.report, "R");
        assert_eq!(parsed.tips, "T");
        let data = parsed.data.unwrap();
        assert_eq!(data.score.get(), 30);
        assert_eq!(data.risk_tier, "中");
    }

    #[test]
    fn test_no_markers_degrades() {
        let raw = "The model ignored the format.";
        let parsed = parse(raw);
        assert_eq!(parsed.data, None);
        assert_eq!(parsed.report, raw);
        assert_eq!(parsed.tips, MISSING_TIPS_PLACEHOLDER);
    }

    #[test]
    fn test_default_placeholder_matches_default_template() {
        assert_eq!(
            MISSING_TIPS_PLACEHOLDER,
            PromptTemplate::default().missing_tips_placeholder()
        );
        assert_eq!(parse("no blocks").tips, MISSING_TIPS_PLACEHOLDER);
    }

    #[test]
    fn test_custom_placeholder() {
        let parsed = parse_with_placeholder("[BLOCK_REPORT]R[/BLOCK_REPORT]", "none");
        assert_eq!(parsed.tips, "none");
    }

    #[test]
    fn test_innermost_pair_wins() {
        let raw = "[BLOCK_REPORT] outer [BLOCK_REPORT]inner[/BLOCK_REPORT] tail [/BLOCK_REPORT]";
        assert_eq!(parse(raw).report, "inner");
    }

    #[test]
    fn test_stray_close_tag_skipped() {
        let raw = "[/BLOCK_TIPS] noise [BLOCK_TIPS]real[/BLOCK_TIPS]";
        assert_eq!(parse(raw).tips, "real");
    }

    #[test]
    fn test_unclosed_block_is_missing() {
        let raw = "[BLOCK_TIPS]never closed";
        assert_eq!(parse(raw).tips, MISSING_TIPS_PLACEHOLDER);
    }

    #[test]
    fn test_partial_data_line() {
        let data = parse("[BLOCK_DATA]60[/BLOCK_DATA]").data.unwrap();
        assert_eq!(data.score.get(), 60);
        assert_eq!(data.risk_tier, DEFAULT_RISK_TIER);
        assert_eq!(data.trap_count, 0);
    }

    #[test]
    fn test_ideographic_comma_and_ten_point_context() {
        let data = parse("[BLOCK_DATA]7 (out of 10)、低、2 個[/BLOCK_DATA]").data.unwrap();
        assert_eq!(data.score.get(), 70);
        assert_eq!(data.risk_tier, "低");
        assert_eq!(data.trap_count, 2);
    }

    #[test]
    fn test_summary_or_keeps_previous() {
        let previous = RiskSummary {
            score: crate::Score::saturating(40),
            risk_tier: "中".to_string(),
            trap_count: 1,
        };
        assert_eq!(parse("plain").summary_or(&previous), previous);
    }
}
