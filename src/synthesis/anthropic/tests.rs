use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> GenerationConfig {
    GenerationConfig {
        api_key: "ant-test".to_string(),
        base_url: Url::parse(base_url).expect("mock server url is valid"),
        model: "claude-3-5-sonnet-20240620".to_string(),
        max_tokens: 4096,
    }
}

async fn synthesize_blocking(
    client: AnthropicSynthesizer,
    question: &str,
    context: &str,
) -> Result<String> {
    let question = question.to_string();
    let context = context.to_string();
    tokio::task::spawn_blocking(move || client.synthesize(&question, &context))
        .await
        .expect("synthesis task should not panic")
}

#[test]
fn client_configuration() {
    let config = test_config("http://localhost:9200");
    let client = AnthropicSynthesizer::new(&config).expect("should create client");

    assert_eq!(client.model, "claude-3-5-sonnet-20240620");
    assert_eq!(client.max_tokens, 4096);
    assert_eq!(client.endpoint.path(), "/v1/messages");
}

#[tokio::test(flavor = "multi_thread")]
async fn synthesize_sends_deterministic_sampling_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ant-test"))
        .and(header("anthropic-version", ANTHROPIC_VERSION))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-20240620",
            "temperature": 0.0,
            "system": SYSTEM_INSTRUCTION,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "TimescaleDB is a time-series database."}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        AnthropicSynthesizer::new(&test_config(&server.uri())).expect("should create client");

    let answer = synthesize_blocking(client, "What is TimescaleDB?", "some context")
        .await
        .expect("should synthesize");
    assert_eq!(answer, "TimescaleDB is a time-series database.");
}

#[tokio::test(flavor = "multi_thread")]
async fn text_blocks_are_concatenated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {"type": "text", "text": "part one "},
                {"type": "tool_use", "id": "x", "name": "y", "input": {}},
                {"type": "text", "text": "part two"}
            ]
        })))
        .mount(&server)
        .await;

    let client =
        AnthropicSynthesizer::new(&test_config(&server.uri())).expect("should create client");

    let answer = synthesize_blocking(client, "q", "c")
        .await
        .expect("should synthesize");
    assert_eq!(answer, "part one part two");
}

#[tokio::test(flavor = "multi_thread")]
async fn upstream_failure_is_a_synthesis_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let client =
        AnthropicSynthesizer::new(&test_config(&server.uri())).expect("should create client");

    let err = synthesize_blocking(client, "q", "c")
        .await
        .expect_err("400 must fail");
    assert!(matches!(err, RagError::Synthesis(_)), "got: {:?}", err);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_response_is_not_silently_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
        .mount(&server)
        .await;

    let client =
        AnthropicSynthesizer::new(&test_config(&server.uri())).expect("should create client");

    let err = synthesize_blocking(client, "q", "c")
        .await
        .expect_err("empty content must fail");
    assert!(matches!(err, RagError::Synthesis(_)));
}
