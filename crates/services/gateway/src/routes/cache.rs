use axum::{extract::State, Json};

use crate::{diagnostics::Diagnostics, types};

/// Counters for the measurement caches
#[utoipa::path(
    get,
    path = "/cache",
    tag = "Misc",
    responses(
        (status = 200, description = "Cache counters", body = types::CacheReport)
    )
)]
pub async fn cache(State(diagnostics): State<Diagnostics>) -> Json<types::CacheReport> {
    Json(types::CacheReport {
        checks: diagnostics.check_summary(),
        results: diagnostics.result_summary(),
    })
}
