//! Property-based tests for the answer parser and normalizers
//!
//! The model's output format is not guaranteed, so every function on the
//! parsing path must be total. These properties feed arbitrary text through it.
//!
//! Case counts respect `PROPTEST_CASES` (default: 64).

use proptest::prelude::*;
use std::env;

use clausewatch::{MarkerBlock, build_prompt, normalize_count, normalize_score, parse};
use clausewatch_prompt_template::PromptTemplate;
use clausewatch_report::fixture::build_response_fixture;

const DEFAULT_PROPTEST_CASES: u32 = 64;

fn proptest_config() -> ProptestConfig {
    let cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);
    ProptestConfig::with_cases(cases)
}

/// Text that never contains a marker tag.
fn plain_text() -> impl Strategy<Value = String> {
    "[^\\[\\]]{0,200}"
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn prop_normalize_score_in_range(field in any::<String>()) {
        prop_assert!(normalize_score(&field).get() <= 100);
    }

    #[test]
    fn prop_normalize_score_on_numeric_shapes(a in 0u64..100_000, b in 0u64..100_000, suffix in "[分點 ]{0,3}") {
        let fraction = format!("{a}/{b}");
        let with_suffix = format!("{a}{suffix}");
        prop_assert!(normalize_score(&fraction).get() <= 100);
        prop_assert!(normalize_score(&with_suffix).get() <= 100);
    }

    #[test]
    fn prop_normalize_count_first_digits(n in 0u32..1_000_000, tail in "[a-z 個處陷阱]{0,10}") {
        let field = format!("{n}{tail}");
        prop_assert_eq!(normalize_count(&field), n);
    }

    #[test]
    fn prop_parse_is_total(raw in any::<String>()) {
        let parsed = parse(&raw);
        if let Some(data) = parsed.data {
            prop_assert!(data.score.get() <= 100);
        }
    }

    #[test]
    fn prop_text_without_markers_is_the_report(raw in plain_text()) {
        let parsed = parse(&raw);
        prop_assert_eq!(parsed.report, raw);
        prop_assert!(parsed.data.is_none());
        prop_assert_eq!(parsed.tips, clausewatch_report::MISSING_TIPS_PLACEHOLDER);
    }

    #[test]
    fn prop_fixture_round_trip(
        score in 0u8..=100,
        tier in "[高中低]",
        traps in 0u32..50,
        report in "[^\\[\\]]{1,80}",
        tips in "[^\\[\\]]{1,80}",
    ) {
        let parsed = parse(&build_response_fixture(score, &tier, traps, &report, &tips));
        let data = parsed.data.unwrap();
        prop_assert_eq!(data.score.get(), score);
        prop_assert_eq!(data.risk_tier, tier);
        prop_assert_eq!(data.trap_count, traps);
        prop_assert_eq!(parsed.report, report.trim());
        prop_assert_eq!(parsed.tips, tips.trim());
    }

    #[test]
    fn prop_block_order_does_not_matter(report in "[^\\[\\]]{1,40}", tips in "[^\\[\\]]{1,40}") {
        let raw = format!(
            "{}{}{}",
            MarkerBlock::Tips.wrap(&tips),
            MarkerBlock::Report.wrap(&report),
            MarkerBlock::Data.wrap("50, 中, 1"),
        );
        let parsed = parse(&raw);
        prop_assert_eq!(parsed.report, report.trim());
        prop_assert_eq!(parsed.tips, tips.trim());
        prop_assert_eq!(parsed.data.unwrap().score.get(), 50);
    }

    #[test]
    fn prop_prompt_embeds_contract_verbatim(contract in any::<String>()) {
        for template in [PromptTemplate::TraditionalChinese, PromptTemplate::English] {
            prop_assert!(build_prompt(template, &contract).contains(&contract));
        }
    }
}
