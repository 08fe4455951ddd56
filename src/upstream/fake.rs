//! Scripted stand-in for the upstream queue, served on an ephemeral port.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::time::sleep;

use crate::config::{PollCadence, UpstreamConfig};

pub(crate) const FAKE_MODEL: &str = "fal-ai/test-model";
pub(crate) const FAKE_KEY: &str = "test-key";

/// What the fake answers with.
#[derive(Clone, Debug)]
pub(crate) struct Script {
    pub(crate) submit: (StatusCode, Value),
    /// Sent verbatim instead of `submit` when set.
    pub(crate) raw_submit: Option<(StatusCode, String)>,
    /// One entry per status check; the last one repeats.
    pub(crate) statuses: Vec<(StatusCode, Value)>,
    pub(crate) result: (StatusCode, Value),
    pub(crate) delays: Delays,
}

/// How long each endpoint sleeps before answering.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Delays {
    pub(crate) submit: Duration,
    pub(crate) status: Duration,
    pub(crate) result: Duration,
}

impl Script {
    /// Queued job going through the given statuses, then returning `image_url`.
    pub(crate) fn queued(statuses: &[&str], image_url: &str) -> Self {
        Self {
            submit: (StatusCode::OK, json!({"request_id": "req-123"})),
            statuses: statuses
                .iter()
                .map(|status| (StatusCode::OK, json!({ "status": status })))
                .collect(),
            raw_submit: None,
            result: (
                StatusCode::OK,
                json!({"images": [{"url": image_url, "content_type": "image/jpeg"}]}),
            ),
            delays: Delays::default(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Hits {
    pub(crate) submit: AtomicUsize,
    pub(crate) status: AtomicUsize,
    pub(crate) result: AtomicUsize,
}

impl Hits {
    pub(crate) fn total(&self) -> usize {
        self.submit.load(Ordering::SeqCst)
            + self.status.load(Ordering::SeqCst)
            + self.result.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct FakeState {
    script: Script,
    hits: Arc<Hits>,
    last_submit: Arc<Mutex<Option<(String, Value)>>>,
}

pub(crate) struct FakeUpstream {
    pub(crate) addr: SocketAddr,
    pub(crate) hits: Arc<Hits>,
    last_submit: Arc<Mutex<Option<(String, Value)>>>,
}

impl FakeUpstream {
    pub(crate) async fn start(script: Script) -> Self {
        let hits = Arc::new(Hits::default());
        let last_submit = Arc::new(Mutex::new(None));
        let state = Arc::new(FakeState {
            script,
            hits: hits.clone(),
            last_submit: last_submit.clone(),
        });
        let app = Router::new()
            .route(&format!("/{FAKE_MODEL}"), post(submit))
            .route(&format!("/{FAKE_MODEL}/requests/{{id}}/status"), get(status))
            .route(&format!("/{FAKE_MODEL}/requests/{{id}}"), get(result))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake upstream");
        let addr = listener.local_addr().expect("fake upstream addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            hits,
            last_submit,
        }
    }

    pub(crate) fn config(&self, api_key: Option<&str>) -> UpstreamConfig {
        UpstreamConfig::new(
            api_key.map(str::to_owned),
            &format!("http://{}", self.addr),
            FAKE_MODEL,
            fast_cadence(),
        )
        .expect("fake upstream config")
    }

    /// Authorization header and JSON body of the last submission.
    pub(crate) fn last_submit(&self) -> Option<(String, Value)> {
        self.last_submit.lock().expect("lock").clone()
    }
}

pub(crate) fn fast_cadence() -> PollCadence {
    PollCadence {
        interval: Duration::from_millis(5),
        max_attempts: 5,
        deadline: Duration::from_secs(10),
        submit_timeout: Duration::from_secs(5),
        status_timeout: Duration::from_secs(2),
        result_timeout: Duration::from_secs(2),
    }
}

async fn submit(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hits.submit.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *state.last_submit.lock().expect("lock") = Some((auth, body));
    sleep(state.script.delays.submit).await;
    match state.script.raw_submit.clone() {
        Some((code, text)) => (code, text).into_response(),
        None => {
            let (code, body) = state.script.submit.clone();
            (code, Json(body)).into_response()
        }
    }
}

async fn status(State(state): State<Arc<FakeState>>) -> (StatusCode, Json<Value>) {
    let n = state.hits.status.fetch_add(1, Ordering::SeqCst);
    sleep(state.script.delays.status).await;
    let (code, body) = state
        .script
        .statuses
        .get(n)
        .or_else(|| state.script.statuses.last())
        .cloned()
        .unwrap_or((StatusCode::OK, json!({"status": "IN_QUEUE"})));
    (code, Json(body))
}

async fn result(State(state): State<Arc<FakeState>>) -> (StatusCode, Json<Value>) {
    state.hits.result.fetch_add(1, Ordering::SeqCst);
    sleep(state.script.delays.result).await;
    let (code, body) = state.script.result.clone();
    (code, Json(body))
}
