use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str, dimension: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        api_key: "sk-test".to_string(),
        base_url: Url::parse(base_url).expect("mock server url is valid"),
        model: "text-embedding-ada-002".to_string(),
        dimension,
    }
}

async fn embed_blocking(client: OpenAiEmbeddings, text: &str) -> Result<Vec<f32>> {
    let text = text.to_string();
    tokio::task::spawn_blocking(move || client.embed(&text))
        .await
        .expect("embedding task should not panic")
}

#[test]
fn client_configuration() {
    let config = test_config("http://localhost:9100", 1536);
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    assert_eq!(client.model, "text-embedding-ada-002");
    assert_eq!(client.dimension(), 1536);
    assert_eq!(client.endpoint.path(), "/v1/embeddings");
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_parses_response_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "text-embedding-ada-002"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.1, 0.2, 0.3]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), 3);
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    let vector = embed_blocking(client, "hello").await.expect("should embed");
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test(flavor = "multi_thread")]
async fn dimension_mismatch_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [1.0, 2.0]}]
        })))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), 3);
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    let err = embed_blocking(client, "hello")
        .await
        .expect_err("wrong dimension must fail");
    assert!(matches!(err, RagError::Provider(_)), "got: {:?}", err);
}

#[tokio::test(flavor = "multi_thread")]
async fn client_error_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), 3);
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    let err = embed_blocking(client, "hello")
        .await
        .expect_err("401 must fail");
    assert!(matches!(err, RagError::Provider(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [1.0, 0.0, 0.0]}]
        })))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), 3);
    let client = OpenAiEmbeddings::new(&config).expect("should create client");

    let vector = embed_blocking(client, "hello")
        .await
        .expect("retry should succeed");
    assert_eq!(vector.len(), 3);
}
