use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::{Error, ErrorType};

/// HTTP response builder for Error enum
impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error_type {
            ErrorType::LabelMe => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorType::UpstreamRatelimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorType::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
            ErrorType::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ErrorType::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,

            ErrorType::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::InvalidProperty => StatusCode::BAD_REQUEST,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::FailedValidation { .. } => StatusCode::BAD_REQUEST,
        };

        (status, Json(&self)).into_response()
    }
}
