use std::{fmt, sync::Arc};

use netscope_result::create_error;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use urlencoding::encode as url_encode;

pub mod types;

#[cfg(test)]
pub mod stub;

/// Longest upstream error message passed on to clients
const MAX_MESSAGE_LENGTH: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpstreamError {
    /// Could not reach the service at all
    Unreachable,
    /// Request did not complete within the configured timeout
    Timeout,
    /// Service answered with a non-success status
    Status { status: u16, message: String },
    /// Response body was not what we expected
    Decode,
    /// The shared request was dropped before it finished
    Abandoned,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Unreachable => write!(f, "Upstream service is unreachable"),
            UpstreamError::Timeout => write!(f, "Upstream service timed out"),
            UpstreamError::Status { status, message } => {
                write!(f, "Upstream service responded with {status}: {message}")
            }
            UpstreamError::Decode => write!(f, "Upstream response could not be decoded"),
            UpstreamError::Abandoned => write!(f, "Upstream request was abandoned"),
        }
    }
}

impl std::error::Error for UpstreamError {}

impl From<netscope_coalesced::Error<UpstreamError>> for UpstreamError {
    fn from(error: netscope_coalesced::Error<UpstreamError>) -> Self {
        error.into_producer().unwrap_or(UpstreamError::Abandoned)
    }
}

impl From<UpstreamError> for netscope_result::Error {
    fn from(error: UpstreamError) -> Self {
        match error {
            UpstreamError::Unreachable | UpstreamError::Decode => {
                create_error!(UpstreamUnavailable)
            }
            UpstreamError::Timeout => create_error!(UpstreamTimeout),
            UpstreamError::Abandoned => create_error!(InternalError),
            UpstreamError::Status { status, message } => match status {
                404 => create_error!(NotFound),
                429 => create_error!(UpstreamRatelimited),
                400 | 422 => create_error!(FailedValidation { error: message }),
                _ => create_error!(UpstreamError { status, message }),
            },
        }
    }
}

/// Client for the upstream measurement API
#[derive(Clone)]
pub struct Upstream {
    base_url: Arc<str>,
    token: Option<Arc<str>>,
    client: Client,
}

impl Upstream {
    pub fn new(config: &netscope_config::Upstream) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            token: config.token().map(Arc::from),
            client,
        })
    }

    /// Start a new measurement
    pub async fn create_measurement(
        &self,
        request: &types::MeasurementRequest,
    ) -> Result<types::CreatedMeasurement, UpstreamError> {
        let url = format!("{}/measurements", self.base_url);
        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        decode(response).await
    }

    /// Fetch the current state of a measurement
    pub async fn get_measurement(
        &self,
        id: &str,
    ) -> Result<types::MeasurementResult, UpstreamError> {
        let url = format!("{}/measurements/{}", self.base_url, url_encode(id));
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(transport_error)?;

        decode(response).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn transport_error(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        tracing::warn!("Upstream request timed out: {error}");
        UpstreamError::Timeout
    } else {
        tracing::error!("Upstream request failed! {error:?}");
        UpstreamError::Unreachable
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<types::ErrorResponse>(&body) {
            Ok(error) => error.error.message,
            Err(_) => body.chars().take(MAX_MESSAGE_LENGTH).collect(),
        };

        tracing::warn!(%status, %message, "Upstream rejected request");
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&body).map_err(|error| {
        tracing::error!("Failed to decode upstream response! {error:?}");
        UpstreamError::Decode
    })
}
