//! CLI flag wiring and end-to-end runs of the binary
//!
//! The binary is pointed at an `httpmock` server through a temporary config
//! file, so no real credential or network is involved.

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::PathBuf;
use tempfile::TempDir;

use clausewatch::MarkerBlock;

fn answer(score: &str, tier: &str, traps: &str) -> String {
    format!(
        "{}\n{}\n{}",
        MarkerBlock::Data.wrap(&format!("{score}, {tier}, {traps}")),
        MarkerBlock::Report.wrap("第五條 押金不退還，顯失公平。"),
        MarkerBlock::Tips.wrap("請求刪除第五條或改為依實際損害扣抵。"),
    )
}

/// Temp dir holding `config.toml` that points the backend at `base_url`.
fn config_for(base_url: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        format!("[llm]\nbase_url = \"{base_url}\"\n\n[defaults]\nstream = false\n"),
    )
    .unwrap();
    (dir, path)
}

fn clausewatch(config: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("clausewatch").unwrap();
    cmd.env_remove("GEMINI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("CLAUSEWATCH_MODEL")
        .env_remove("CLAUSEWATCH_BASE_URL")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    cmd
}

fn mock_listing(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/v1beta/models");
        then.status(200).json_body(json!({
            "models": [
                {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]},
                {"name": "models/gemini-1.0-pro", "displayName": "Gemini 1.0 Pro",
                 "supportedGenerationMethods": ["generateContent"]},
                {"name": "models/gemini-1.5-flash", "displayName": "Gemini 1.5 Flash",
                 "supportedGenerationMethods": ["generateContent", "countTokens"]}
            ]
        }));
    })
}

#[test]
fn test_all_global_flags_defined() {
    let cli = clausewatch::cli::build_cli();
    let names: Vec<_> = cli.get_arguments().filter_map(|a| a.get_long()).collect();

    for flag in [
        "config",
        "api-key",
        "model",
        "base-url",
        "template",
        "verbose",
        "stream",
        "no-stream",
        "max-attempts",
        "cooldown-secs",
        "timeout-secs",
    ] {
        assert!(names.contains(&flag), "global flag --{flag} is not defined");
    }
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("clausewatch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("models"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_analyze_without_input_is_usage_error() {
    let (_dir, config) = config_for("http://127.0.0.1:9/v1beta");
    clausewatch(&config)
        .arg("analyze")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_missing_credential_exits_2() {
    let (_dir, config) = config_for("http://127.0.0.1:9/v1beta");
    clausewatch(&config)
        .args(["analyze", "--text", "租賃契約"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn test_empty_contract_exits_2() {
    let (_dir, config) = config_for("http://127.0.0.1:9/v1beta");
    clausewatch(&config)
        .args(["--api-key", "test-key", "analyze", "--text", "   "])
        .assert()
        .code(2);
}

#[test]
fn test_unsupported_document_exits_4() {
    let (dir, config) = config_for("http://127.0.0.1:9/v1beta");
    let sheet = dir.path().join("terms.xlsx");
    std::fs::write(&sheet, b"PK\x03\x04").unwrap();

    clausewatch(&config)
        .args(["--api-key", "test-key", "analyze"])
        .arg(&sheet)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("xlsx"));
}

#[test]
fn test_invalid_config_value_exits_2() {
    let (_dir, config) = config_for("http://127.0.0.1:9/v1beta");
    clausewatch(&config)
        .args(["--max-attempts", "0", "config"])
        .assert()
        .code(2);
}

#[test]
fn test_config_command_reports_sources() {
    let (_dir, config) = config_for("http://127.0.0.1:9/v1beta");
    let output = clausewatch(&config)
        .env("GEMINI_API_KEY", "env-key-value")
        .args(["--cooldown-secs", "5", "config", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["base_url"]["source"], "config");
    assert_eq!(value["cooldown_secs"]["value"], "5");
    assert_eq!(value["cooldown_secs"]["source"], "cli");
    assert_eq!(value["api_key"]["value"], "set");
    assert_eq!(value["api_key"]["source"], "env:GEMINI_API_KEY");
    assert!(!String::from_utf8_lossy(&output).contains("env-key-value"));
}

#[test]
fn test_analyze_json_end_to_end() {
    let server = MockServer::start();
    let listing = mock_listing(&server);
    let generate = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent")
            .header("x-goog-api-key", "test-key")
            .body_includes("押金");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": {"parts": [{"text": answer("7/10", "高", "3 個陷阱")}]},
                "finishReason": "STOP"
            }]
        }));
    });
    let (_dir, config) = config_for(&server.url("/v1beta"));

    let output = clausewatch(&config)
        .args(["--api-key", "test-key", "analyze", "--json", "--text"])
        .arg("第五條 押金於租期屆滿時不予退還。")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    listing.assert();
    generate.assert();
    let value: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["model"], "gemini-1.5-flash");
    assert_eq!(value["risk_summary"]["score"], 70);
    assert_eq!(value["risk_summary"]["risk_tier"], "高");
    assert_eq!(value["risk_summary"]["trap_count"], 3);
    assert_eq!(value["analysis_report"], "第五條 押金不退還，顯失公平。");
    assert_eq!(value["streamed"], false);
}

#[test]
fn test_analyze_text_renders_requested_step() {
    let server = MockServer::start();
    mock_listing(&server);
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": answer("85分", "高", "2")}]}}]
        }));
    });
    let (_dir, config) = config_for(&server.url("/v1beta"));

    clausewatch(&config)
        .args(["--api-key", "test-key", "analyze", "--step", "negotiation", "--text", "契約"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Negotiation script (3/3)"))
        .stdout(predicate::str::contains("請求刪除第五條"))
        .stdout(predicate::str::contains("Risk score").not());
}

#[test]
fn test_listing_failure_falls_back_then_auth_error_exits_5() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1beta/models");
        then.status(403).json_body(json!({
            "error": {"code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED"}
        }));
    });
    let fallback = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(403).json_body(json!({
            "error": {"code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED"}
        }));
    });
    let (_dir, config) = config_for(&server.url("/v1beta"));

    clausewatch(&config)
        .args(["--api-key", "bad-key", "analyze", "--text", "契約"])
        .assert()
        .code(5);
    fallback.assert();
}

#[test]
fn test_rate_limit_retries_then_exits_6() {
    let server = MockServer::start();
    let generate = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-pro:generateContent");
        then.status(429).json_body(json!({
            "error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).",
                      "status": "RESOURCE_EXHAUSTED"}
        }));
    });
    let (_dir, config) = config_for(&server.url("/v1beta"));

    clausewatch(&config)
        .args([
            "--api-key",
            "test-key",
            "--model",
            "gemini-pro",
            "--max-attempts",
            "2",
            "--cooldown-secs",
            "0",
            "analyze",
            "--text",
            "契約",
        ])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Rate limited (attempt 1/2)"));
    generate.assert_calls(2);
}

#[test]
fn test_models_command() {
    let server = MockServer::start();
    mock_listing(&server);
    let (_dir, config) = config_for(&server.url("/v1beta"));

    clausewatch(&config)
        .args(["--api-key", "test-key", "models"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gemini-1.0-pro"))
        .stdout(predicate::str::contains("text-embedding-004").not())
        .stdout(predicate::str::contains("Would select: gemini-1.5-flash"));
}

#[test]
fn test_models_command_empty_listing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1beta/models");
        then.status(200).json_body(json!({"models": []}));
    });
    let (_dir, config) = config_for(&server.url("/v1beta"));

    clausewatch(&config)
        .args(["--api-key", "test-key", "models"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no generation-capable models"));
}
