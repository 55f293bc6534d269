use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use netscope_result::{create_error, Result};

use crate::{
    diagnostics::Diagnostics,
    upstream::types::{CreatedMeasurement, MeasurementRequest, MeasurementResult},
};

use super::{RefreshParams, X_CACHE};

/// Longest id the upstream service hands out, with plenty of headroom
const MAX_ID_LENGTH: usize = 64;

/// Starts a new measurement
///
/// Identical non-real-time checks started within the cache window reuse the
/// measurement created first.
#[utoipa::path(
    post,
    path = "/measurements",
    tag = "Measurements",
    params(RefreshParams),
    request_body = MeasurementRequest,
    responses(
        (status = 202, description = "Measurement accepted", body = CreatedMeasurement,
            headers(("x-cache" = String, description = "HIT or MISS")))
    )
)]
pub async fn create(
    State(diagnostics): State<Diagnostics>,
    Query(params): Query<RefreshParams>,
    Json(request): Json<MeasurementRequest>,
) -> Result<impl IntoResponse> {
    if request.target.trim().is_empty() {
        return Err(create_error!(FailedValidation {
            error: "target must not be empty".to_string()
        }));
    }

    let created = diagnostics
        .create(request, params.refresh.unwrap_or_default())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        [(X_CACHE, created.status.as_str())],
        Json(created.value),
    ))
}

/// Fetches the current state of a measurement
#[utoipa::path(
    get,
    path = "/measurements/{id}",
    tag = "Measurements",
    params(
        ("id" = String, Path, description = "Measurement id"),
        RefreshParams
    ),
    responses(
        (status = 200, description = "Measurement state", body = MeasurementResult,
            headers(("x-cache" = String, description = "HIT or MISS")))
    )
)]
pub async fn fetch(
    State(diagnostics): State<Diagnostics>,
    Path(id): Path<String>,
    Query(params): Query<RefreshParams>,
) -> Result<impl IntoResponse> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(create_error!(InvalidProperty));
    }

    let result = diagnostics
        .poll(&id, params.refresh.unwrap_or_default())
        .await?;

    Ok(([(X_CACHE, result.status.as_str())], Json(result.value)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{diagnostics::Diagnostics, routes, upstream::stub::StubUpstream, AppState};

    fn app(stub: &StubUpstream) -> Router {
        let state = AppState {
            diagnostics: Diagnostics::new(
                stub.client(),
                Duration::from_secs(60),
                Duration::from_secs(2),
            ),
        };

        routes::router().with_state(state)
    }

    fn create_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn repeated_create_is_marked_as_hit() {
        let stub = StubUpstream::start().await;
        let app = app(&stub);
        let body = json!({ "type": "dns", "target": "example.com", "limit": 3 });

        let first = app
            .clone()
            .oneshot(create_request("/measurements", body.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);
        assert_eq!(first.headers()["x-cache"], "MISS");

        let second = app
            .clone()
            .oneshot(create_request("/measurements", body.clone()))
            .await
            .unwrap();
        assert_eq!(second.headers()["x-cache"], "HIT");
        assert_eq!(json_body(second).await, json!({ "id": "m1", "probesCount": 3 }));

        let refreshed = app
            .oneshot(create_request("/measurements?refresh=true", body))
            .await
            .unwrap();
        assert_eq!(refreshed.headers()["x-cache"], "MISS");
        assert_eq!(json_body(refreshed).await["id"], "m2");

        assert_eq!(stub.creates(), 2);
    }

    #[tokio::test]
    async fn empty_target_is_rejected_locally() {
        let stub = StubUpstream::start().await;

        let response = app(&stub)
            .oneshot(create_request(
                "/measurements",
                json!({ "type": "ping", "target": "  " }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["type"], "FailedValidation");
        assert_eq!(stub.creates(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_bad_gateway() {
        let stub = StubUpstream::start().await;

        let response = app(&stub)
            .oneshot(create_request(
                "/measurements",
                json!({ "type": "http", "target": "fail.invalid" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = json_body(response).await;
        assert_eq!(body["type"], "UpstreamError");
        assert_eq!(body["status"], 500);
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn poll_is_cached_briefly() {
        let stub = StubUpstream::start().await;
        let app = app(&stub);

        let first = app.clone().oneshot(get_request("/measurements/m1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-cache"], "MISS");

        let second = app
            .clone()
            .oneshot(get_request("/measurements/m1"))
            .await
            .unwrap();
        assert_eq!(second.headers()["x-cache"], "HIT");

        let body = json_body(second).await;
        assert_eq!(body["id"], "m1");
        assert_eq!(body["status"], "finished");
        assert_eq!(body["probesCount"], 1);

        let refreshed = app
            .oneshot(get_request("/measurements/m1?refresh=true"))
            .await
            .unwrap();
        assert_eq!(refreshed.headers()["x-cache"], "MISS");
        assert_eq!(stub.polls(), 2);
    }

    #[tokio::test]
    async fn unknown_measurement_is_not_found() {
        let stub = StubUpstream::start().await;

        let response = app(&stub)
            .oneshot(get_request("/measurements/missing"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_id_never_reaches_upstream() {
        let stub = StubUpstream::start().await;

        let response = app(&stub)
            .oneshot(get_request("/measurements/..%2Fadmin"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(stub.polls(), 0);
    }

    #[tokio::test]
    async fn cache_report_counts_requests() {
        let stub = StubUpstream::start().await;
        let app = app(&stub);

        for _ in 0..2 {
            app.clone()
                .oneshot(get_request("/measurements/m1"))
                .await
                .unwrap();
        }

        let response = app.oneshot(get_request("/cache")).await.unwrap();
        let body = json_body(response).await;

        assert_eq!(body["results"]["hits"], 1);
        assert_eq!(body["results"]["producerRuns"], 1);
        assert_eq!(body["results"]["entries"], 1);
        assert_eq!(body["checks"]["entries"], 0);
    }
}
