use axum::{
    http::HeaderName,
    routing::{get, post, Router},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::AppState;

pub mod cache;
pub mod measurements;
pub mod root;

/// Marks whether a response was served from the cache
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct RefreshParams {
    /// Skip cached data and ask the upstream service again
    pub refresh: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root::root))
        .route("/cache", get(cache::cache))
        .route("/measurements", post(measurements::create))
        .route("/measurements/:id", get(measurements::fetch))
}
