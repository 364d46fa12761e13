//! End-to-end tests against mocked vendor endpoints.

mod providers;

use futures_util::StreamExt;
use multi_ai_handler::{
    Attachment, Conversation, ContentDelivery, Error, FinishReason, GenerationRequest,
    HttpExtractor, OllamaProvider, OpenAICompatProvider, Provider,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use providers::{
    anthropic::AnthropicTestSetup, google::GoogleTestSetup, load_fixture,
    ollama::OllamaTestSetup, openai::OpenAITestSetup, ProviderTestSetup, FIRST_ANSWER,
    FIRST_QUESTION, FOLLOWUP_ANSWER, FOLLOWUP_QUESTION, MAX_TOKENS, SYSTEM_PROMPT, TEMPERATURE,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("multi_ai_handler=debug")
        .with_test_writer()
        .try_init();
}

/// Two turns through the same adapter; the second must carry the first as history.
async fn run_conversation_test<T: ProviderTestSetup>() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = T::get_config();

    let mock_server = MockServer::start().await;
    T::mount_conversation_mocks(&mock_server).await?;
    let provider = T::create_provider(&mock_server.uri());

    let request = GenerationRequest::new(config.model)
        .system(SYSTEM_PROMPT)
        .input(FIRST_QUESTION)
        .temperature(TEMPERATURE)
        .max_tokens(MAX_TOKENS);

    let response = provider.generate(&request).await?;
    assert_eq!(
        response.content.as_text(),
        Some(FIRST_ANSWER),
        "{}: first reply",
        config.name
    );
    assert_eq!(response.finish_reason, FinishReason::Stop, "{}", config.name);
    assert_eq!(response.usage.input_tokens, 24, "{}: input tokens", config.name);
    assert_eq!(response.usage.output_tokens, 7, "{}: output tokens", config.name);
    assert_eq!(response.history.len(), 2, "{}: history length", config.name);

    let followup = GenerationRequest::new(config.model)
        .system(SYSTEM_PROMPT)
        .input(FOLLOWUP_QUESTION)
        .history(response.history)
        .temperature(TEMPERATURE)
        .max_tokens(MAX_TOKENS);

    let response = provider.generate(&followup).await?;
    assert_eq!(
        response.content.as_text(),
        Some(FOLLOWUP_ANSWER),
        "{}: follow-up reply",
        config.name
    );
    assert_eq!(response.history.len(), 4, "{}: history length", config.name);
    assert_eq!(response.history[0].text_content(), FIRST_QUESTION);
    assert_eq!(response.history[3].text_content(), FOLLOWUP_ANSWER);

    Ok(())
}

#[tokio::test]
async fn test_openai_conversation_e2e() {
    run_conversation_test::<OpenAITestSetup>()
        .await
        .expect("OpenAI conversation test failed");
}

#[tokio::test]
async fn test_anthropic_conversation_e2e() {
    run_conversation_test::<AnthropicTestSetup>()
        .await
        .expect("Anthropic conversation test failed");
}

#[tokio::test]
async fn test_google_conversation_e2e() {
    run_conversation_test::<GoogleTestSetup>()
        .await
        .expect("Google conversation test failed");
}

#[tokio::test]
async fn test_ollama_conversation_e2e() {
    run_conversation_test::<OllamaTestSetup>()
        .await
        .expect("Ollama conversation test failed");
}

#[tokio::test]
async fn test_conversation_object_e2e() {
    init_tracing();
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(load_fixture("openai/weather_response.sse"))
                .insert_header("content-type", "text/event-stream"),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let provider = OpenAITestSetup::create_provider(&mock_server.uri());
    let mut chat = Conversation::new(provider, "gpt-4o-mini")
        .system(SYSTEM_PROMPT)
        .temperature(TEMPERATURE);

    chat.send(FIRST_QUESTION).await.unwrap();
    chat.send(FOLLOWUP_QUESTION).await.unwrap();
    assert_eq!(chat.history().len(), 4);

    let requests = mock_server.received_requests().await.unwrap();
    let last: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let messages = last["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[2]["content"], FIRST_ANSWER);
    assert_eq!(messages[3]["content"], FOLLOWUP_QUESTION);
}

#[tokio::test]
async fn test_streaming_text_chunks() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(load_fixture("anthropic/weather_response.sse"))
                .insert_header("content-type", "text/event-stream"),
        )
        .mount(&mock_server)
        .await;

    let provider = AnthropicTestSetup::create_provider(&mock_server.uri());
    let request = GenerationRequest::new("claude-sonnet-4-20250514").input(FIRST_QUESTION);

    let chunks: Vec<String> = provider
        .stream(&request)
        .await
        .unwrap()
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;

    assert_eq!(chunks, vec!["It is sunny", " in Paris today."]);
}

#[tokio::test]
async fn test_json_output_from_fenced_reply() {
    let mock_server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"```json\\n{\\\"total\\\": 42,\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\" \\\"currency\\\": \\\"USD\\\"}\\n```\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/event-stream"),
        )
        .mount(&mock_server)
        .await;

    let provider = OpenAITestSetup::create_provider(&mock_server.uri());
    let request = GenerationRequest::new("gpt-4o-mini")
        .input("Extract the invoice total")
        .json_output(true);

    let response = provider.generate(&request).await.unwrap();
    assert_eq!(
        response.content.as_json(),
        Some(&json!({"total": 42, "currency": "USD"}))
    );
}

#[tokio::test]
async fn test_status_errors_are_classified() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "bad key"}})),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let provider = OpenAITestSetup::create_provider(&mock_server.uri());
    let request = GenerationRequest::new("gpt-4o-mini").input("Hi");

    assert!(matches!(provider.generate(&request).await, Err(Error::Auth(_))));
    assert!(matches!(provider.generate(&request).await, Err(Error::RateLimit)));
    match provider.generate(&request).await {
        Err(Error::Provider { provider, message }) => {
            assert_eq!(provider, "openai");
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_extracted_text_delivery() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/convert/source"))
        .and(body_partial_json(json!({
            "sources": [{"kind": "file", "filename": "invoice.pdf", "base64_string": "JVBERi0xLjQ="}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document": {"filename": "invoice.pdf", "md_content": "Total: $42"},
            "status": "success",
            "errors": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{
                "role": "user",
                "content": "Summarize this\n\n# File: invoice.pdf\n\nTotal: $42"
            }],
            "max_completion_tokens": 20000
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(load_fixture("openai/weather_response.sse"))
                .insert_header("content-type", "text/event-stream"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let extractor = Arc::new(HttpExtractor::new(mock_server.uri()).unwrap());
    let provider = OpenAICompatProvider::cerebras("test-api-key")
        .unwrap()
        .with_base_url(mock_server.uri())
        .with_extractor(Some(extractor));

    let request = GenerationRequest::new("llama-3.3-70b")
        .text("Summarize this")
        .attachment(Attachment::from_encoded("invoice.pdf", "JVBERi0xLjQ="));

    let response = provider.generate(&request).await.unwrap();
    assert_eq!(response.history.len(), 2);
    assert!(response.history[0]
        .text_content()
        .ends_with("# File: invoice.pdf\n\nTotal: $42"));
    assert_eq!(response.history[0].attachments().count(), 0);
}

#[tokio::test]
async fn test_native_delivery_override() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is this?"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBORw0KGgo="}}
                ]
            }]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(load_fixture("openai/weather_response.sse"))
                .insert_header("content-type", "text/event-stream"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    // No extractor configured: the request-level override must skip extraction.
    let provider = OpenAICompatProvider::cerebras("test-api-key")
        .unwrap()
        .with_base_url(mock_server.uri());
    let request = GenerationRequest::new("llama-3.3-70b")
        .text("What is this?")
        .attachment(Attachment::from_encoded("photo.png", "iVBORw0KGgo="))
        .delivery(ContentDelivery::NativeMultimodal);

    provider.generate(&request).await.unwrap();
}

#[tokio::test]
async fn test_ollama_unreachable_server() {
    let provider = OllamaProvider::new("http://127.0.0.1:9").unwrap();
    let request = GenerationRequest::new("llama3.2").input("Hi");

    match provider.generate(&request).await {
        Err(Error::ServerUnavailable { location, hint, .. }) => {
            assert_eq!(location, "http://127.0.0.1:9");
            assert!(hint.contains("ollama serve"));
        }
        other => panic!("expected ServerUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ollama_unreachable_server_on_model_queries() {
    let provider = OllamaProvider::new("http://127.0.0.1:9").unwrap();

    assert!(matches!(
        provider.list_models().await,
        Err(Error::ServerUnavailable { .. })
    ));
    assert!(matches!(
        provider.model_info("llama3.2").await,
        Err(Error::ServerUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_ollama_failing_server() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let provider = OllamaTestSetup::create_provider(&mock_server.uri());
    let request = GenerationRequest::new("llama3.2").input("Hi");

    assert!(matches!(
        provider.stream(&request).await,
        Err(Error::ServerUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_model_listing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3.2:latest", "modified_at": "2025-01-10T12:00:00Z", "size": 2019393189,
                 "details": {"family": "llama", "parameter_size": "3.2B"}},
                {"name": "qwen2.5:7b", "size": 4683087332u64}
            ]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .and(body_partial_json(json!({"model": "llama3.2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "modified_at": "2025-01-10T12:00:00Z",
            "details": {"family": "llama", "parameter_size": "3.2B"},
            "model_info": {"general.architecture": "llama", "llama.context_length": 131072}
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .and(body_partial_json(json!({"model": "missing"})))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let provider = OllamaTestSetup::create_provider(&mock_server.uri());

    assert_eq!(
        provider.list_models().await.unwrap(),
        vec!["llama3.2:latest", "qwen2.5:7b"]
    );

    let info = provider.model_info("llama3.2").await.unwrap();
    assert_eq!(info.size, Some(2019393189));
    assert_eq!(info.parameters.as_deref(), Some("3.2B"));
    assert_eq!(info.input_token_limit, Some(131072));

    assert!(matches!(
        provider.model_info("missing").await,
        Err(Error::ModelNotAvailable(_))
    ));
}

#[tokio::test]
async fn test_provider_trait_object_name() {
    let provider: Arc<dyn Provider> = GoogleTestSetup::create_provider("http://localhost");
    assert_eq!(provider.name(), "google");
}
