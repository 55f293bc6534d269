use axum::{extract::FromRef, Router};

use netscope_config::config;
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::{diagnostics::Diagnostics, upstream::Upstream};

mod diagnostics;
mod routes;
mod types;
mod upstream;

#[derive(Clone)]
struct AppState {
    pub diagnostics: Diagnostics,
}

impl FromRef<AppState> for Diagnostics {
    fn from_ref(state: &AppState) -> Self {
        state.diagnostics.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    // Configure logging and environment
    netscope_config::configure!(gateway);

    // Configure API schema
    #[derive(OpenApi)]
    #[openapi(
        paths(
            routes::root::root,
            routes::cache::cache,
            routes::measurements::create,
            routes::measurements::fetch,
        ),
        tags(
            (name = "Misc", description = "Misc routes for microservice."),
            (name = "Measurements", description = "Network diagnostics proxied to the upstream service.")
        ),
        components(
            schemas(
                netscope_result::Error,
                netscope_result::ErrorType,
                types::CacheReport,
                types::CacheSummary,
                upstream::types::MeasurementType,
                upstream::types::MeasurementStatus,
                upstream::types::Location,
                upstream::types::MeasurementRequest,
                upstream::types::CreatedMeasurement,
                upstream::types::MeasurementResult,
            )
        ),
    )]
    struct ApiDoc;

    let config = config()
        .await
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidData, error))?;

    let upstream = Upstream::new(&config.upstream).map_err(std::io::Error::other)?;

    // One cache per process, shared by every request through the router state
    let state = AppState {
        diagnostics: Diagnostics::new(
            upstream,
            config.cache.check_ttl(),
            config.cache.poll_ttl(),
        ),
    };

    // Configure Axum and router
    let app = Router::new()
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .merge(routes::router())
        .with_state(state);

    // Configure TCP listener and bind
    let listener = TcpListener::bind(config.hosts.listen.as_str()).await?;
    tracing::info!("Listening on {}", config.hosts.listen);
    tracing::info!(
        "Play around with the API: http://{}/scalar",
        config.hosts.listen
    );
    axum::serve(listener, app.into_make_service()).await
}
