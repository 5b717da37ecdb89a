//! Provider integration tests with mocked network responses.
//!
//! These tests use wiremock to stand in for the external provider APIs and
//! validate envelope normalization, endpoint fallback, rate-limit routing,
//! and streaming parsing at the HTTP level.

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use portico::llm::chain::ChatChain;
use portico::llm::gemini::GeminiChat;
use portico::llm::openai_compat::OpenAiCompatChat;
use portico::llm::provider::ChatProvider;
use portico::rag::embeddings::{
    EmbeddingChain, EmbeddingProvider, GeminiEmbedding, HuggingFaceEmbedding,
    OpenAiCompatEmbedding,
};
use portico::types::ChatMessage;
use portico::utils::config::{LlmConfig, ProviderEndpoint};

// ============= Helpers =============

fn endpoint(server: &MockServer) -> ProviderEndpoint {
    ProviderEndpoint {
        endpoint: server.uri(),
        api_key: "test-key".to_string(),
        enabled: true,
    }
}

fn llm_config(gemini_models: &[&str]) -> LlmConfig {
    LlmConfig {
        gemini_models: gemini_models.iter().map(|m| m.to_string()).collect(),
        openrouter_models: vec!["openai/gpt-4o-mini".to_string()],
        temperature: 0.7,
    }
}

// ============= Embedding Providers =============

#[tokio::test]
async fn gemini_embedding_is_unit_normalized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:embedContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": { "values": [3.0, 4.0] }
        })))
        .mount(&server)
        .await;

    let provider = GeminiEmbedding::new(&endpoint(&server));
    let values = provider.embed("hello").await.unwrap();

    assert_eq!(values.len(), 2);
    assert!((values[0] - 0.6).abs() < 1e-6);
    assert!((values[1] - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn huggingface_falls_back_to_models_endpoint_when_pipeline_is_gone() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(
            "/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2",
        ))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/sentence-transformers/all-MiniLM-L6-v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[0.1, 0.2, 0.3]])))
        .expect(1)
        .mount(&server)
        .await;

    let provider = HuggingFaceEmbedding::new(&endpoint(&server));
    let values = provider.embed("hello").await.unwrap();

    assert_eq!(values, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn huggingface_accepts_flat_array_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(
            "/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.5, 0.5])))
        .mount(&server)
        .await;

    let provider = HuggingFaceEmbedding::new(&endpoint(&server));
    assert_eq!(provider.embed("hello").await.unwrap(), vec![0.5, 0.5]);
}

#[tokio::test]
async fn openrouter_embedding_reads_openai_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_string_contains("openai/text-embedding-ada-002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.25, 0.75] }]
        })))
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatEmbedding::new("openrouter", &endpoint(&server), "openai/text-embedding-ada-002")
            .with_attribution("http://localhost:3000", "Portfolio Chatbot");
    assert_eq!(provider.embed("hello").await.unwrap(), vec![0.25, 0.75]);
}

#[tokio::test]
async fn embedding_chain_advances_past_server_error() {
    let gemini_server = MockServer::start().await;
    let hf_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:embedContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&gemini_server)
        .await;

    Mock::given(method("POST"))
        .and(path(
            "/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1.0, 0.0])))
        .expect(1)
        .mount(&hf_server)
        .await;

    let chain = EmbeddingChain::new(vec![
        Arc::new(GeminiEmbedding::new(&endpoint(&gemini_server))),
        Arc::new(HuggingFaceEmbedding::new(&endpoint(&hf_server))),
    ]);

    let embedding = chain.embed("hello").await.unwrap();
    assert_eq!(embedding.provider, "huggingface");
    assert_eq!(embedding.values, vec![1.0, 0.0]);
}

#[tokio::test]
async fn embedding_chain_does_not_retry_a_rate_limited_provider() {
    let gemini_server = MockServer::start().await;
    let hf_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:embedContent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
        .expect(1)
        .mount(&gemini_server)
        .await;

    Mock::given(method("POST"))
        .and(path(
            "/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.0, 1.0])))
        .mount(&hf_server)
        .await;

    let chain = EmbeddingChain::new(vec![
        Arc::new(GeminiEmbedding::new(&endpoint(&gemini_server))),
        Arc::new(HuggingFaceEmbedding::new(&endpoint(&hf_server))),
    ]);

    let embedding = chain.embed("hello").await.unwrap();
    assert_eq!(embedding.provider, "huggingface");
}

// ============= Chat Providers =============

#[tokio::test]
async fn gemini_chat_returns_complete_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(body_string_contains("Where is Arnob located?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "Arnob is based in Frankfurt, Germany." }]
                }
            }]
        })))
        .mount(&server)
        .await;

    let provider = GeminiChat::new(&endpoint(&server), &llm_config(&["gemini-1.5-flash"]));
    let reply = provider
        .chat(
            "gemini-1.5-flash",
            &[ChatMessage::user("Where is Arnob located?")],
            false,
        )
        .await
        .unwrap();

    assert!(reply.into_text().await.unwrap().contains("Frankfurt"));
}

#[tokio::test]
async fn openai_compat_streaming_parses_sse_deltas() {
    let server = MockServer::start().await;

    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Frank\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"furt\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{}}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let provider = OpenAiCompatChat::new(
        "openrouter",
        &endpoint(&server),
        vec!["openai/gpt-4o-mini".to_string()],
        0.7,
    );
    let reply = provider
        .chat("openai/gpt-4o-mini", &[ChatMessage::user("hi")], true)
        .await
        .unwrap();

    assert_eq!(reply.into_text().await.unwrap(), "Frankfurt");
}

#[tokio::test]
async fn chat_chain_rate_limited_gemini_falls_through_to_openrouter() {
    let gemini_server = MockServer::start().await;
    let openrouter_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
        .expect(1)
        .mount(&gemini_server)
        .await;

    // the rate limit must skip gemini's second variant entirely
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&gemini_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("FAQ Context"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "Frankfurt, Germany." }
            }]
        })))
        .expect(1)
        .mount(&openrouter_server)
        .await;

    let config = llm_config(&["gemini-1.5-flash", "gemini-1.5-pro"]);
    let chain = ChatChain::new(vec![
        Arc::new(GeminiChat::new(&endpoint(&gemini_server), &config)),
        Arc::new(OpenAiCompatChat::new(
            "openrouter",
            &endpoint(&openrouter_server),
            config.openrouter_models.clone(),
            config.temperature,
        )),
    ]);

    let text = chain
        .respond_text(
            &[ChatMessage::user("Where is Arnob located?")],
            Some("Q: Where is Arnob located?\nA: Frankfurt, Germany."),
        )
        .await
        .unwrap();

    assert!(text.contains("Frankfurt"));
}

#[tokio::test]
async fn chat_chain_exhaustion_is_a_terminal_error() {
    let gemini_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&gemini_server)
        .await;

    let chain = ChatChain::new(vec![Arc::new(GeminiChat::new(
        &endpoint(&gemini_server),
        &llm_config(&["gemini-1.5-flash"]),
    ))]);

    let err = chain
        .respond_text(&[ChatMessage::user("hello")], None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("all chat providers failed"));
}
