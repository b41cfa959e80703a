//! End-to-end analysis against a mocked Generative Language API
//!
//! Drives `SessionController` through `ConfiguredConnector`, so the real Gemini
//! backend handles listing pagination, model selection, SSE streaming and the
//! answer parsing.

use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;

use clausewatch::{
    AnalysisPipeline, ApiKey, ClauseWatchError, Config, ConfiguredConnector, LlmError, PromptTemplate,
    ResultStep, SessionController, View,
};

fn controller(server: &MockServer, stream: bool) -> SessionController {
    let config = Config::builder()
        .base_url(server.url("/v1beta"))
        .stream(stream)
        .max_attempts(2)
        .cooldown_secs(0)
        .build()
        .unwrap();
    SessionController::new(
        Arc::new(ConfiguredConnector::new(config.clone())),
        AnalysisPipeline::from_config(&config),
        ApiKey::parse("test-key"),
    )
}

fn sse_event(text: &str) -> String {
    let chunk = json!({
        "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
    });
    format!("data: {chunk}\n\n")
}

fn mock_listing(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/v1beta/models")
            .query_param_missing("pageToken");
        then.status(200).json_body(json!({
            "models": [
                {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]}
            ],
            "nextPageToken": "next"
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/v1beta/models")
            .query_param("pageToken", "next");
        then.status(200).json_body(json!({
            "models": [
                {"name": "models/gemini-1.0-pro", "supportedGenerationMethods": ["generateContent"]},
                {"name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent"]}
            ]
        }));
    });
}

#[tokio::test]
async fn test_streamed_analysis_end_to_end() {
    let server = MockServer::start_async().await;
    mock_listing(&server);
    let body = [
        sse_event("[BLOCK_DATA]風險分數 8/10，高，"),
        sse_event("4 個陷阱[/BLOCK_DATA]\n[BLOCK_REPORT]第三條"),
        sse_event("自動續約[/BLOCK_REPORT]\n[BLOCK_TIPS]要求刪除[/BLOCK_TIPS]"),
    ]
    .concat();
    let generate = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:streamGenerateContent")
            .query_param("alt", "sse")
            .header("x-goog-api-key", "test-key")
            .body_includes("第三條自動續約");
        then.status(200)
            .header("content-type", "text/event-stream")
            .body(body);
    });

    let mut controller = controller(&server, true);
    controller.set_contract_text("第三條自動續約，乙方不得異議").unwrap();

    let mut fragments = Vec::new();
    let analysis = controller
        .submit(&mut |f| fragments.push(f.to_string()))
        .await
        .unwrap();

    generate.assert();
    assert_eq!(fragments.len(), 3);
    assert!(analysis.streamed);
    assert_eq!(analysis.model.model_id, "gemini-1.5-flash");
    assert!(!analysis.model.is_fallback());

    let session = controller.session();
    assert_eq!(session.current_view, View::Result(ResultStep::Overview));
    assert_eq!(session.risk_summary.score.get(), 80);
    assert_eq!(session.risk_summary.risk_tier, "高");
    assert_eq!(session.risk_summary.trap_count, 4);
    assert_eq!(session.analysis_report, "第三條自動續約");
    assert_eq!(session.negotiation_script, "要求刪除");
}

#[tokio::test]
async fn test_missing_tips_block_uses_placeholder() {
    let server = MockServer::start_async().await;
    mock_listing(&server);
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": {"parts": [{"text": "[BLOCK_DATA]30, 低, 1[/BLOCK_DATA]只有報告"}]},
                "finishReason": "STOP"
            }]
        }));
    });

    let mut controller = controller(&server, false);
    controller.set_contract_text("契約").unwrap();
    controller.submit(&mut |_| {}).await.unwrap();

    let session = controller.session();
    assert_eq!(session.risk_summary.score.get(), 30);
    assert_eq!(session.negotiation_script, PromptTemplate::default().missing_tips_placeholder());
}

#[tokio::test]
async fn test_rate_limited_generation_exhausts_attempts() {
    let server = MockServer::start_async().await;
    mock_listing(&server);
    let generate = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(429).json_body(json!({
            "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        }));
    });

    let mut controller = controller(&server, false);
    controller.set_contract_text("契約").unwrap();
    let err = controller.submit(&mut |_| {}).await.unwrap_err();

    generate.assert_calls(2);
    assert!(matches!(
        err,
        ClauseWatchError::Llm(LlmError::RetryExhausted { attempts: 2, .. })
    ));
    assert_eq!(controller.session().current_view, View::Input);
}

#[tokio::test]
async fn test_invalid_key_on_listing_falls_back_then_fails() {
    let server = MockServer::start_async().await;
    let invalid = json!({
        "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1beta/models");
        then.status(400).json_body(invalid.clone());
    });
    let generate = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(400).json_body(invalid.clone());
    });

    let mut controller = controller(&server, false);
    controller.set_contract_text("契約").unwrap();
    let err = controller.submit(&mut |_| {}).await.unwrap_err();

    generate.assert_calls(1);
    assert!(matches!(err, ClauseWatchError::Llm(LlmError::ProviderAuth(_))));
    assert!(!controller.session().has_result());
}
