//! End-to-end lifecycle tests for the request controller.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::StreamExt;
use refetch_core::error::{FetchError, TransportError};
use refetch_core::request::{Method, RequestConfig, RequestDescriptor};
use refetch_core::state::RequestState;
use refetch_runtime::{ControllerConfig, RequestController};
use refetch_testing::{ManualTransport, MockTransport, init_tracing, json_response};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Wait until the controller's state satisfies `predicate`, with a timeout.
async fn wait_until(
    controller: &RequestController<Value>,
    predicate: impl FnMut(&RequestState<Value>) -> bool,
) -> RequestState<Value> {
    let mut subscription = controller.subscribe();
    tokio::time::timeout(Duration::from_secs(1), subscription.wait_for(predicate))
        .await
        .expect("state did not reach the expected shape in time")
        .expect("controller dropped")
}

/// Wait until `count` requests are parked on the manual transport for `url`.
async fn wait_for_parked(transport: &ManualTransport, url: &str, count: usize) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while transport.pending_count(url) < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("request never reached the transport");
}

#[tokio::test]
async fn initial_activation_is_pending_until_first_resolution() {
    init_tracing();
    let transport = Arc::new(ManualTransport::new());
    let controller = RequestController::<Value>::get(transport.clone(), "https://x/1");

    let state = controller.state();
    assert!(state.loading);
    assert!(state.data.is_none());
    assert!(state.error.is_none());

    wait_for_parked(&transport, "https://x/1", 1).await;
    transport.resolve("https://x/1", json_response(200, r#"{"v":1}"#));

    let settled = wait_until(&controller, RequestState::is_settled).await;
    assert_eq!(settled.data, Some(json!({"v": 1})));
}

#[tokio::test]
async fn successful_attempt_publishes_data() {
    let transport = Arc::new(MockTransport::new());
    transport.stub("https://x/1", Ok(json_response(200, r#"{"v":1}"#)));

    let controller = RequestController::<Value>::get(transport, "https://x/1");
    let settled = wait_until(&controller, RequestState::is_settled).await;

    assert_eq!(settled.data, Some(json!({"v": 1})));
    assert!(settled.error.is_none());
    assert!(!settled.loading);
}

#[tokio::test]
async fn non_success_status_publishes_a_generic_failure() {
    let transport = Arc::new(MockTransport::new());
    transport.stub("https://x/err", Ok(json_response(500, "oops")));

    let controller = RequestController::<Value>::get(transport, "https://x/err");
    let settled = wait_until(&controller, RequestState::is_settled).await;

    assert_eq!(settled.error, Some(FetchError::RequestFailed));
    assert!(settled.data.is_none());
    assert!(!settled.loading);
}

#[tokio::test]
async fn transport_errors_are_surfaced_as_committed_errors() {
    let transport = Arc::new(MockTransport::new());
    transport.stub(
        "https://x/1",
        Err(TransportError::Timeout("deadline elapsed".to_string())),
    );

    let controller = RequestController::<Value>::get(transport, "https://x/1");
    let settled = wait_until(&controller, RequestState::is_settled).await;

    assert!(matches!(
        settled.error,
        Some(FetchError::Transport(TransportError::Timeout(_)))
    ));
}

#[tokio::test]
async fn failed_attempt_keeps_data_from_the_prior_success() {
    let transport = Arc::new(MockTransport::new());
    transport.stub("https://x/ok", Ok(json_response(200, r#"{"v":1}"#)));
    transport.stub("https://x/err", Ok(json_response(500, "oops")));

    let controller = RequestController::<Value>::get(transport.clone(), "https://x/ok");
    wait_until(&controller, |state| state.data.is_some()).await;

    controller.set_request("https://x/err", RequestConfig::default());
    let failed = wait_until(&controller, |state| state.error.is_some()).await;

    assert_eq!(failed.data, Some(json!({"v": 1})));
    assert!(!failed.loading);
}

#[tokio::test]
async fn descriptor_change_starts_exactly_one_attempt_on_the_new_locator() {
    let transport = Arc::new(MockTransport::new());
    transport.stub("https://x/1", Ok(json_response(200, r#"{"v":1}"#)));
    transport.stub("https://x/2", Ok(json_response(200, r#"{"v":2}"#)));

    let controller = RequestController::<Value>::get(transport.clone(), "https://x/1");
    wait_until(&controller, RequestState::is_settled).await;
    assert_eq!(transport.request_count("https://x/1"), 1);

    // Re-submitting the identical descriptor is not a change.
    controller.set_request("https://x/1", RequestConfig::default());
    assert_eq!(transport.request_count("https://x/1"), 1);

    controller.set_request("https://x/2", RequestConfig::default());
    let settled = wait_until(&controller, |state| state.data == Some(json!({"v": 2}))).await;

    assert!(settled.error.is_none());
    assert_eq!(transport.request_count("https://x/2"), 1);
    assert_eq!(transport.request_count("https://x/1"), 1);
}

#[tokio::test]
async fn configuration_changes_also_retrigger() {
    let transport = Arc::new(MockTransport::new());
    transport.stub("https://x/1", Ok(json_response(200, r#"{"v":1}"#)));

    let controller = RequestController::<Value>::get(transport.clone(), "https://x/1");
    wait_until(&controller, RequestState::is_settled).await;

    controller.set_request(
        "https://x/1",
        RequestConfig::new().with_header("authorization", "Bearer token"),
    );
    wait_until(&controller, RequestState::is_settled).await;

    assert_eq!(transport.request_count("https://x/1"), 2);
    let last = transport.requests().pop().unwrap();
    assert_eq!(
        last.config.headers.get("authorization").map(String::as_str),
        Some("Bearer token")
    );
}

#[tokio::test]
async fn manual_refetch_reruns_the_active_descriptor() {
    let transport = Arc::new(MockTransport::new());
    transport.stub("https://x/1", Ok(json_response(200, r#"{"v":1}"#)));

    let controller = RequestController::<Value>::get(transport.clone(), "https://x/1");
    wait_until(&controller, RequestState::is_settled).await;

    controller.refetch(None, None);
    wait_until(&controller, RequestState::is_settled).await;

    assert_eq!(transport.request_count("https://x/1"), 2);
}

#[tokio::test]
async fn refetch_overrides_are_one_shot() {
    let transport = Arc::new(MockTransport::new());
    transport.stub("https://x/a", Ok(json_response(200, r#"{"v":"a"}"#)));
    transport.stub("https://x/b", Ok(json_response(200, r#"{"v":"b"}"#)));

    let controller = RequestController::<Value>::get(transport.clone(), "https://x/a");
    wait_until(&controller, |state| state.data == Some(json!({"v": "a"}))).await;

    // The override attempt runs against the override locator...
    controller.refetch(Some("https://x/b".to_string()), None);
    wait_until(&controller, |state| state.data == Some(json!({"v": "b"}))).await;
    assert_eq!(transport.request_count("https://x/b"), 1);

    // ...but the active descriptor is not rebound by it.
    assert_eq!(controller.descriptor(), RequestDescriptor::get("https://x/a"));
    controller.set_request("https://x/a", RequestConfig::default());
    assert_eq!(transport.request_count("https://x/a"), 1);

    // An override-free refetch still targets the active descriptor.
    controller.refetch(None, None);
    wait_until(&controller, |state| state.data == Some(json!({"v": "a"}))).await;
    assert_eq!(transport.request_count("https://x/a"), 2);
}

#[tokio::test]
async fn refetch_configuration_override_applies_to_that_attempt_only() {
    let transport = Arc::new(MockTransport::new());
    transport.stub("https://x/a", Ok(json_response(200, r#"{"v":"a"}"#)));

    let controller = RequestController::<Value>::get(transport.clone(), "https://x/a");
    wait_until(&controller, RequestState::is_settled).await;

    controller.refetch(
        None,
        Some(RequestConfig::new().with_method(Method::Post)),
    );
    wait_until(&controller, RequestState::is_settled).await;

    let last = transport.requests().pop().unwrap();
    assert_eq!(last.config.method, Method::Post);
    assert_eq!(controller.descriptor().config.method, Method::Get);
}

#[tokio::test]
async fn slow_superseded_attempt_cannot_clobber_the_newer_result() {
    init_tracing();
    let transport = Arc::new(ManualTransport::new());
    // Let the superseded attempt run to completion so the commit-time
    // sequence check is what's under test, not the network-layer abort.
    let controller = RequestController::<Value>::with_config(
        transport.clone(),
        "https://x/slow",
        RequestConfig::default(),
        ControllerConfig::new().with_cancel_superseded(false),
    );

    wait_for_parked(&transport, "https://x/slow", 1).await;
    controller.refetch(Some("https://x/fast".to_string()), None);
    wait_for_parked(&transport, "https://x/fast", 1).await;

    // The newer attempt resolves first and commits.
    assert!(transport.resolve("https://x/fast", json_response(200, r#"{"v":"fast"}"#)));
    wait_until(&controller, |state| state.data == Some(json!({"v": "fast"}))).await;

    // The superseded attempt resolves afterwards; its outcome is discarded.
    assert!(transport.resolve("https://x/slow", json_response(200, r#"{"v":"slow"}"#)));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = controller.state();
    assert_eq!(state.data, Some(json!({"v": "fast"})));
    assert!(state.error.is_none());
    assert!(!state.loading);
}

#[tokio::test]
async fn stale_failures_are_suppressed_too() {
    let transport = Arc::new(ManualTransport::new());
    let controller = RequestController::<Value>::with_config(
        transport.clone(),
        "https://x/slow",
        RequestConfig::default(),
        ControllerConfig::new().with_cancel_superseded(false),
    );

    wait_for_parked(&transport, "https://x/slow", 1).await;
    controller.refetch(Some("https://x/fast".to_string()), None);
    wait_for_parked(&transport, "https://x/fast", 1).await;

    assert!(transport.resolve("https://x/fast", json_response(200, r#"{"v":"fast"}"#)));
    wait_until(&controller, |state| state.data == Some(json!({"v": "fast"}))).await;

    // A failure from a superseded attempt must not surface.
    assert!(transport.resolve_err(
        "https://x/slow",
        TransportError::Timeout("too late".to_string())
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = controller.state();
    assert!(state.error.is_none());
    assert_eq!(state.data, Some(json!({"v": "fast"})));
}

#[tokio::test]
async fn superseded_attempts_are_cancelled_at_the_network_layer_by_default() {
    let transport = Arc::new(ManualTransport::new());
    let controller = RequestController::<Value>::get(transport.clone(), "https://x/slow");

    wait_for_parked(&transport, "https://x/slow", 1).await;
    controller.refetch(Some("https://x/fast".to_string()), None);
    wait_for_parked(&transport, "https://x/fast", 1).await;

    // Give the runtime a moment to drop the aborted attempt.
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The superseded attempt's request is gone; resolving it finds nobody.
    assert!(!transport.resolve("https://x/slow", json_response(200, r#"{"v":"slow"}"#)));

    assert!(transport.resolve("https://x/fast", json_response(200, r#"{"v":"fast"}"#)));
    let settled = wait_until(&controller, RequestState::is_settled).await;
    assert_eq!(settled.data, Some(json!({"v": "fast"})));
}

#[tokio::test]
async fn subscription_stream_observes_each_lifecycle_transition() {
    let transport = Arc::new(MockTransport::new());
    transport.stub("https://x/1", Ok(json_response(200, r#"{"v":1}"#)));

    let controller = RequestController::<Value>::get(transport, "https://x/1");
    let stream = controller.subscribe().into_stream();
    tokio::pin!(stream);

    // First observed commit: the initial attempt's terminal outcome.
    let settled = stream.next().await.unwrap();
    assert_eq!(settled.data, Some(json!({"v": 1})));
    assert!(!settled.loading);

    // A refetch publishes the pending transition, then the outcome.
    controller.refetch(None, None);
    let pending = stream.next().await.unwrap();
    assert!(pending.loading);
    assert!(pending.error.is_none());

    let settled = stream.next().await.unwrap();
    assert!(!settled.loading);
    assert_eq!(settled.data, Some(json!({"v": 1})));
}
