use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;
use simlab_oracle::{HttpBackend, HttpBackendOptions, OracleClient, OracleError};
use simlab_protocol::{AnalysisResult, ImportedParams, StkType};

const SAMPLE: &str = "079144775810065011000A81100000000040";

fn client_for(server: &MockServer) -> OracleClient {
    let backend = HttpBackend::new(HttpBackendOptions {
        base_url: server.base_url(),
        api_key: "test-key".into(),
        ..Default::default()
    })
    .expect("backend builds");
    OracleClient::new(Arc::new(backend))
}

async fn serve(server: &MockServer, status: u16, body: serde_json::Value) {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(status)
                .header("content-type", "application/json")
                .json_body(body);
        })
        .await;
}

#[tokio::test]
async fn empty_content_resolves_to_fallbacks() {
    let server = MockServer::start_async().await;
    serve(&server, 200, json!({"choices": [{"message": {"content": ""}}]})).await;
    let client = client_for(&server);

    assert_eq!(
        client.analyze_vulnerability(SAMPLE).await,
        Ok(AnalysisResult::parse_failure())
    );
    assert!(client.decode(SAMPLE).await.expect("fallback").components.is_empty());
    assert_eq!(
        client.import_params(SAMPLE).await,
        Ok(ImportedParams::default())
    );
}

#[tokio::test]
async fn envelope_without_content_resolves_to_fallbacks() {
    let server = MockServer::start_async().await;
    serve(&server, 200, json!({"choices": [{"message": {"role": "assistant"}}]})).await;
    let client = client_for(&server);

    assert_eq!(
        client.analyze_vulnerability(SAMPLE).await,
        Ok(AnalysisResult::parse_failure())
    );
    assert!(client.decode(SAMPLE).await.expect("fallback").components.is_empty());
    let err = client
        .generate_command("DISPLAY TEXT", StkType::ProactiveSim, None)
        .await
        .expect_err("commands have no fallback");
    assert!(matches!(err, OracleError::Malformed(_)));
}

#[tokio::test]
async fn error_status_is_a_failure() {
    let server = MockServer::start_async().await;
    serve(&server, 500, json!({"error": "overloaded"})).await;
    let client = client_for(&server);

    let err = client
        .analyze_vulnerability(SAMPLE)
        .await
        .expect_err("status errors propagate");
    assert!(matches!(err, OracleError::Status { status: 500, .. }));
    assert!(err.is_settlement_failure());
    assert!(client.explain_topic("OTA").await.is_err());
}

#[tokio::test]
async fn content_is_parsed_through_the_envelope() {
    let server = MockServer::start_async().await;
    let reply = json!({"components": [{"name": "PID", "value": "7F", "description": "SIM data download"}]});
    serve(
        &server,
        200,
        json!({"choices": [{"message": {"content": reply.to_string()}}]}),
    )
    .await;
    let client = client_for(&server);

    let decoded = client.decode(SAMPLE).await.expect("decoded");
    assert_eq!(decoded.components.len(), 1);
    assert_eq!(decoded.components[0].name, "PID");
}
