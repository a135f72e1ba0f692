//! Chat-completion family fixtures
//!
//! OpenRouter and Gemini front vision models through conversational
//! APIs that return text, never edited image bytes. Whatever the model
//! says, these adapters must terminate in the capability-unsupported
//! error and never report success.

use unmark::providers::{GeminiRemover, OpenRouterRemover};
use unmark::{
    CancelHandle, DispatchRequest, ImagePayload, ProviderConfig, ProviderId, UnmarkError,
    WatermarkRemover,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn request_for(provider: ProviderId, key: &str) -> DispatchRequest {
    DispatchRequest::new(
        ImagePayload::new(vec![0x89, 0x50, 0x4E, 0x47, 7, 7, 7], "image/png"),
        ProviderConfig::new(provider, key),
    )
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn gemini_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    }))
}

#[tokio::test]
async fn openrouter_always_reports_capability_unsupported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(|req: &Request| {
            let Ok(v) = serde_json::from_slice::<serde_json::Value>(&req.body) else {
                return false;
            };
            let prompt_ok = v
                .pointer("/messages/0/content/0/text")
                .and_then(|t| t.as_str())
                .is_some_and(|t| t.contains("Remove any watermarks"));
            let image_ok = v
                .pointer("/messages/0/content/1/image_url/url")
                .and_then(|u| u.as_str())
                .is_some_and(|u| u.starts_with("data:image/png;base64,"));
            prompt_ok && image_ok
        })
        .respond_with(chat_reply("I can see a watermark in the lower right corner."))
        .expect(1)
        .mount(&server)
        .await;

    let err = OpenRouterRemover::new()
        .with_base_url(server.uri())
        .remove_watermark(
            &request_for(ProviderId::Openrouter, "test-key"),
            &CancelHandle::new(),
        )
        .await
        .unwrap_err();

    match err {
        UnmarkError::UnsupportedOperation(message) => {
            assert!(message.contains("OpenRouter"));
            assert!(message.contains("picwish"));
            assert!(message.contains("lower right corner"));
        }
        other => panic!("expected UnsupportedOperation, got {other:?}"),
    }
}

#[tokio::test]
async fn openrouter_never_succeeds_regardless_of_reply_shape() {
    for content in ["", "Done! Here is the edited image.", "cannot help"] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(chat_reply(content))
            .mount(&server)
            .await;

        let result = OpenRouterRemover::new()
            .with_base_url(server.uri())
            .remove_watermark(
                &request_for(ProviderId::Openrouter, "test-key"),
                &CancelHandle::new(),
            )
            .await;
        assert!(
            matches!(result, Err(UnmarkError::UnsupportedOperation(_))),
            "reply {content:?} must not produce success"
        );
    }
}

#[tokio::test]
async fn openrouter_sends_attribution_headers_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("http-referer", "https://app.example"))
        .and(header("x-title", "Example App"))
        .respond_with(chat_reply("text"))
        .expect(1)
        .mount(&server)
        .await;

    let _ = OpenRouterRemover::new()
        .with_base_url(server.uri())
        .with_referer("https://app.example")
        .with_title("Example App")
        .remove_watermark(
            &request_for(ProviderId::Openrouter, "test-key"),
            &CancelHandle::new(),
        )
        .await;
}

#[tokio::test]
async fn gemini_walks_the_candidate_list_and_reports_the_last_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "message": "model not found" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(gemini_reply("I can describe the image but not edit it."))
        .expect(1)
        .mount(&server)
        .await;

    let err = GeminiRemover::new()
        .with_base_url(server.uri())
        .remove_watermark(
            &request_for(ProviderId::Gemini, "test-key"),
            &CancelHandle::new(),
        )
        .await
        .unwrap_err();

    match err {
        UnmarkError::UnsupportedOperation(message) => {
            assert!(message.contains("gemini-2.0-flash"));
            assert!(message.contains("describe the image"));
        }
        other => panic!("expected UnsupportedOperation, got {other:?}"),
    }
}

#[tokio::test]
async fn gemini_sends_the_inline_image_with_its_declared_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
        .and(|req: &Request| {
            let Ok(v) = serde_json::from_slice::<serde_json::Value>(&req.body) else {
                return false;
            };
            v.pointer("/contents/parts/1/inline_data/mime_type")
                .and_then(|m| m.as_str())
                == Some("image/png")
        })
        .respond_with(gemini_reply("noted"))
        .expect(1)
        .mount(&server)
        .await;

    let result = GeminiRemover::new()
        .with_base_url(server.uri())
        .remove_watermark(
            &request_for(ProviderId::Gemini, "test-key"),
            &CancelHandle::new(),
        )
        .await;
    assert!(matches!(result, Err(UnmarkError::UnsupportedOperation(_))));
}

#[tokio::test]
async fn gemini_rejected_key_is_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "message": "API key not valid. Please pass a valid API key." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = GeminiRemover::new()
        .with_base_url(server.uri())
        .remove_watermark(
            &request_for(ProviderId::Gemini, "bad-key"),
            &CancelHandle::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UnmarkError::AuthenticationError(_)));
}

#[tokio::test]
async fn missing_api_keys_never_touch_the_network() {
    let server = MockServer::start().await;

    let openrouter = OpenRouterRemover::new().with_base_url(server.uri());
    let gemini = GeminiRemover::new().with_base_url(server.uri());

    let err = openrouter
        .remove_watermark(
            &request_for(ProviderId::Openrouter, ""),
            &CancelHandle::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UnmarkError::MissingApiKey(_)));

    let err = gemini
        .remove_watermark(&request_for(ProviderId::Gemini, ""), &CancelHandle::new())
        .await
        .unwrap_err();
    assert!(matches!(err, UnmarkError::MissingApiKey(_)));

    assert!(server.received_requests().await.unwrap().is_empty());
}
