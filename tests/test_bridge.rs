use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use memeify::config::{PollCadence, UpstreamConfig};
use memeify::error::MemeError;
use memeify::prompt::Intensity;
use memeify::upstream::{GenerationRequest, UpstreamClient, extract_result};
use serde_json::{Value, json};

const MODEL: &str = "fal-ai/flux-kontext-pro";

fn request() -> GenerationRequest {
    GenerationRequest::new(b"GIF89a".to_vec(), "image/gif", Intensity::Mild, None)
}

fn cadence() -> PollCadence {
    PollCadence {
        interval: Duration::from_millis(5),
        max_attempts: 3,
        deadline: Duration::from_secs(5),
        ..PollCadence::default()
    }
}

/// Upstream that answers every submission inline and counts calls to each endpoint.
async fn start_sync_upstream(calls: Arc<AtomicUsize>) -> String {
    async fn submit(State(calls): State<Arc<AtomicUsize>>) -> Json<Value> {
        calls.fetch_add(1, Ordering::SeqCst);
        Json(json!({"output": {"images": ["https://cdn.example/sync.jpg"]}}))
    }
    async fn other(State(calls): State<Arc<AtomicUsize>>) -> Json<Value> {
        calls.fetch_add(1000, Ordering::SeqCst);
        Json(json!({"status": "COMPLETED"}))
    }

    let app = Router::new()
        .route(&format!("/{MODEL}"), post(submit))
        .route(&format!("/{MODEL}/requests/{{id}}/status"), get(other))
        .route(&format!("/{MODEL}/requests/{{id}}"), get(other))
        .with_state(calls);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn synchronous_upstream_never_polls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let base_url = start_sync_upstream(calls.clone()).await;
    let config = UpstreamConfig::new(Some("key".to_string()), &base_url, MODEL, cadence())
        .expect("config");
    let client = UpstreamClient::new(config);

    let image = client.generate(&request()).await.expect("image");

    assert_eq!(image.image_url, "https://cdn.example/sync.jpg");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unset_key_fails_before_any_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let base_url = start_sync_upstream(calls.clone()).await;
    let config = UpstreamConfig::new(None, &base_url, MODEL, cadence()).expect("config");
    let client = UpstreamClient::new(config);

    let err = client.generate(&request()).await.expect_err("no key");

    assert!(matches!(err, MemeError::Configuration(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn result_envelope_shapes() {
    let nested = json!({"output": {"images": [{"url": "X"}]}});
    assert_eq!(extract_result(&nested).expect("nested").image_url, "X");

    let empty = json!({"images": []});
    let err = extract_result(&empty).expect_err("empty");
    assert!(err.to_string().contains(r#"{"images":[]}"#));
}
