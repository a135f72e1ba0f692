//! Registry-level dispatch behavior
//!
//! Routing, missing-credential short-circuits, and cooperative
//! cancellation, exercised end to end through [`ProviderRegistry`].

use std::sync::Arc;
use std::time::Duration;

use unmark::poller::PollPolicy;
use unmark::providers::{
    GeminiRemover, OpenRouterRemover, PicwishRemover, PixelbinRemover, ReplicateRemover,
    SegmindRemover,
};
use unmark::{
    CancelHandle, DispatchRequest, ImagePayload, ProviderConfig, ProviderId, ProviderRegistry,
    UnmarkError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TASK_PATH: &str = "/api/tasks/visual/external/watermark-remove";

fn request_for(provider: ProviderId, key: &str) -> DispatchRequest {
    DispatchRequest::new(
        ImagePayload::new(vec![0x89, 0x50, 0x4E, 0x47, 1, 2, 3], "image/png"),
        ProviderConfig::new(provider, key),
    )
}

/// Every built-in adapter, all pointed at the same mock origin.
fn mock_registry(server: &MockServer) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(
        PicwishRemover::new()
            .with_base_url(server.uri())
            .with_poll_policy(PollPolicy::new(Duration::from_millis(10), 30)),
    ));
    registry.register(Arc::new(
        SegmindRemover::new()
            .with_base_url(server.uri())
            .with_poll_policy(PollPolicy::new(Duration::from_millis(10), 43)),
    ));
    registry.register(Arc::new(
        ReplicateRemover::new()
            .with_base_url(server.uri())
            .with_poll_policy(PollPolicy::new(Duration::from_millis(10), 60)),
    ));
    registry.register(Arc::new(OpenRouterRemover::new().with_base_url(server.uri())));
    registry.register(Arc::new(GeminiRemover::new().with_base_url(server.uri())));
    registry.register(Arc::new(PixelbinRemover::new()));
    registry
}

#[tokio::test]
async fn every_provider_short_circuits_on_a_missing_credential() {
    let server = MockServer::start().await;
    let registry = mock_registry(&server);

    for provider in ProviderId::all() {
        let err = registry
            .dispatch(request_for(provider, ""))
            .await
            .unwrap_err();
        assert!(
            matches!(err, UnmarkError::MissingApiKey(_)),
            "{provider} did not short-circuit"
        );
    }

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_provider_key_makes_no_network_calls() {
    let server = MockServer::start().await;
    let registry = ProviderRegistry::new();

    let err = registry
        .dispatch(request_for(ProviderId::Replicate, "key"))
        .await
        .unwrap_err();

    assert!(matches!(err, UnmarkError::UnsupportedProvider(p) if p == "replicate"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn dispatch_routes_to_the_selected_adapter() {
    let server = MockServer::start().await;
    let result_bytes = b"routed-result".to_vec();

    Mock::given(method("POST"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 200,
            "data": { "task_id": "route-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{TASK_PATH}/route-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "state": 1, "file": format!("{}/r.png", server.uri()) }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(result_bytes.clone(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let registry = mock_registry(&server);
    let payload = registry
        .dispatch(request_for(ProviderId::Picwish, "test-key"))
        .await
        .expect("dispatch ok");

    assert_eq!(payload.bytes, result_bytes);
    assert_eq!(payload.content_type, "image/png");
}

#[tokio::test]
async fn concurrent_dispatches_do_not_interfere() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 200,
            "data": { "task_id": "shared" }
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{TASK_PATH}/shared")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "state": 1, "file": format!("{}/c.png", server.uri()) }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"parallel".to_vec(), "image/png"))
        .mount(&server)
        .await;

    let registry = Arc::new(mock_registry(&server));
    let a = {
        let registry = registry.clone();
        tokio::spawn(
            async move { registry.dispatch(request_for(ProviderId::Picwish, "k1")).await },
        )
    };
    let b = {
        let registry = registry.clone();
        tokio::spawn(
            async move { registry.dispatch(request_for(ProviderId::Picwish, "k2")).await },
        )
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(a.unwrap().bytes, b"parallel".to_vec());
    assert_eq!(b.unwrap().bytes, b"parallel".to_vec());
}

#[tokio::test]
async fn cancellation_stops_polling_without_further_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 200,
            "data": { "task_id": "slow-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Long interval keeps the dispatch parked in its first poll wait.
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(
        PicwishRemover::new()
            .with_base_url(server.uri())
            .with_poll_policy(PollPolicy::new(Duration::from_secs(60), 30)),
    ));
    let registry = Arc::new(registry);

    let cancel = CancelHandle::new();
    let task = {
        let registry = registry.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            registry
                .dispatch_with_cancel(request_for(ProviderId::Picwish, "test-key"), &cancel)
                .await
        })
    };

    // Give the submit request time to land, then abandon the call.
    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(UnmarkError::Cancelled)));
    // Only the submit went out; no status check ever did.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
