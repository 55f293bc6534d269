//! In-process stand-in for the upstream measurement API.
//!
//! Measurement ids are numbered by how many creations the stub has seen, so
//! a test can tell a reused measurement from a fresh one. Special targets and
//! ids trigger failure modes:
//!
//! - target `fail.invalid`: 500 on create
//! - id `missing`: 404
//! - id `slow`: answers after 3 seconds
//! - id `busy`: answers after 100 milliseconds
//! - id `flaky`: 500 on the first poll, 200 afterwards

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use super::Upstream;

#[derive(Clone, Default)]
struct Calls {
    creates: Arc<AtomicUsize>,
    polls: Arc<AtomicUsize>,
}

pub struct StubUpstream {
    address: SocketAddr,
    calls: Calls,
}

impl StubUpstream {
    pub async fn start() -> Self {
        let calls = Calls::default();

        let app = Router::new()
            .route("/measurements", post(create))
            .route("/measurements/:id", get(fetch))
            .with_state(calls.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub upstream");
        let address = listener.local_addr().expect("stub upstream address");

        tokio::spawn(async move { axum::serve(listener, app.into_make_service()).await });

        Self { address, calls }
    }

    pub fn config(&self, timeout_secs: u64) -> netscope_config::Upstream {
        netscope_config::Upstream {
            base_url: format!("http://{}/", self.address),
            token: "stub-token".to_string(),
            user_agent: "netscope-test".to_string(),
            timeout_secs,
            connect_timeout_secs: 1,
        }
    }

    pub fn client(&self) -> Upstream {
        self.client_with_timeout(5)
    }

    pub fn client_with_timeout(&self, timeout_secs: u64) -> Upstream {
        Upstream::new(&self.config(timeout_secs)).expect("valid upstream client")
    }

    /// Creations that reached the stub
    pub fn creates(&self) -> usize {
        self.calls.creates.load(Ordering::SeqCst)
    }

    /// Polls that reached the stub
    pub fn polls(&self) -> usize {
        self.calls.polls.load(Ordering::SeqCst)
    }
}

fn upstream_error(status: StatusCode, kind: &str, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "error": { "type": kind, "message": message } })),
    )
}

fn measurement(id: &str) -> Value {
    json!({
        "id": id,
        "type": "dns",
        "status": "finished",
        "createdAt": "2026-10-14T10:00:00.000Z",
        "updatedAt": "2026-10-14T10:00:01.250Z",
        "target": "example.com",
        "probesCount": 1,
        "results": [
            {
                "probe": { "continent": "EU", "country": "DE", "city": "Berlin", "asn": 3320 },
                "result": { "status": "finished", "statusCode": 0, "answers": [] }
            }
        ]
    })
}

async fn create(State(calls): State<Calls>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let count = calls.creates.fetch_add(1, Ordering::SeqCst) + 1;

    match body["target"].as_str() {
        Some("fail.invalid") => upstream_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "api_error",
            "Internal Server Error",
        ),
        Some("") | None => upstream_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Parameter validation failed.",
        ),
        Some(_) => (
            StatusCode::ACCEPTED,
            Json(json!({ "id": format!("m{count}"), "probesCount": 3 })),
        ),
    }
}

async fn fetch(State(calls): State<Calls>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let count = calls.polls.fetch_add(1, Ordering::SeqCst) + 1;

    match id.as_str() {
        "missing" => upstream_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "Couldn't find the requested measurement.",
        ),
        "flaky" if count == 1 => upstream_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "api_error",
            "Internal Server Error",
        ),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            (StatusCode::OK, Json(measurement(&id)))
        }
        "busy" => {
            tokio::time::sleep(Duration::from_millis(100)).await;
            (StatusCode::OK, Json(measurement(&id)))
        }
        _ => (StatusCode::OK, Json(measurement(&id))),
    }
}
