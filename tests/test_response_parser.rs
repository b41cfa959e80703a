//! Worked examples for answer parsing and score normalization

use clausewatch::{RiskSummary, normalize_count, normalize_score, parse};
use clausewatch_report::{MISSING_TIPS_PLACEHOLDER, fixture::build_response_fixture, normalize_score_in};

#[test]
fn test_score_shapes() {
    assert_eq!(normalize_score("1/10").get(), 10);
    assert_eq!(normalize_score("85分").get(), 85);
    assert_eq!(normalize_score("").get(), 0);
    assert_eq!(normalize_score("abc").get(), 0);
    assert_eq!(normalize_score("７５").get(), 75);
    assert_eq!(normalize_score("3/0").get(), 0);
    assert_eq!(normalize_score("12/10").get(), 100);
}

#[test]
fn test_small_score_needs_ten_point_evidence() {
    assert_eq!(normalize_score("7").get(), 7);
    assert_eq!(normalize_score_in("7", "7, 高, 2 (滿分10)").get(), 70);
    assert_eq!(normalize_score_in("7", "score 7 out of 10, high, 2").get(), 70);
    assert_eq!(normalize_score_in("7", "7, 中, 100").get(), 7);
}

#[test]
fn test_counts() {
    assert_eq!(normalize_count("3 個陷阱"), 3);
    assert_eq!(normalize_count("無"), 0);
    assert_eq!(normalize_count("約 12 處，其中 4 處嚴重"), 12);
}

#[test]
fn test_fixture_round_trip() {
    let parsed = parse(&build_response_fixture(42, "中", 2, "X", "Y"));
    let data = parsed.data.expect("data block");
    assert_eq!(data.score.get(), 42);
    assert_eq!(data.risk_tier, "中");
    assert_eq!(data.trap_count, 2);
    assert_eq!(parsed.report, "X");
    assert_eq!(parsed.tips, "Y");
}

#[test]
fn test_text_without_markers_degrades() {
    let raw = "模型沒有照格式回答，只給了一段評論。";
    let parsed = parse(raw);
    assert!(parsed.data.is_none());
    assert_eq!(parsed.report, raw);
    assert_eq!(parsed.tips, MISSING_TIPS_PLACEHOLDER);

    let previous = RiskSummary::default();
    assert_eq!(parsed.summary_or(&previous), previous);
}

#[test]
fn test_blocks_in_any_order_with_noise() {
    let raw = "前言\n[BLOCK_TIPS]先談違約金[/BLOCK_TIPS]\n\
               [BLOCK_REPORT]第五條對乙方不利[/BLOCK_REPORT]\n\
               [BLOCK_DATA]風險 9/10，高，5 個[/BLOCK_DATA]\n結語";
    let parsed = parse(raw);
    let data = parsed.data.unwrap();
    assert_eq!(data.score.get(), 90);
    assert_eq!(data.risk_tier, "高");
    assert_eq!(data.trap_count, 5);
    assert_eq!(parsed.report, "第五條對乙方不利");
    assert_eq!(parsed.tips, "先談違約金");
}

#[test]
fn test_data_block_missing_fields() {
    let data = parse("[BLOCK_DATA]60[/BLOCK_DATA]").data.unwrap();
    assert_eq!(data.score.get(), 60);
    assert_eq!(data.risk_tier, clausewatch_report::DEFAULT_RISK_TIER);
    assert_eq!(data.trap_count, 0);
}
