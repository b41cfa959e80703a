//! Response fixtures for tests.

use clausewatch_prompt_template::MarkerBlock;

/// Build a well-formed model answer.
#[must_use]
pub fn build_response_fixture(
    score: u8,
    tier: &str,
    traps: u32,
    report: &str,
    tips: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n",
        MarkerBlock::Data.wrap(&format!("{score}, {tier}, {traps}")),
        MarkerBlock::Report.wrap(report),
        MarkerBlock::Tips.wrap(tips),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_fixture_parses_back() {
        let parsed = parse(&build_response_fixture(42, "中", 2, "X", "Y"));
        let data = parsed.data.unwrap();
        assert_eq!(data.score.get(), 42);
        assert_eq!(data.risk_tier, "中");
        assert_eq!(data.trap_count, 2);
        assert_eq!(parsed.report, "X");
        assert_eq!(parsed.tips, "Y");
    }
}
