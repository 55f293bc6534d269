use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
/// Kind of diagnostic check.
pub enum MeasurementType {
    Ping,
    Traceroute,
    Dns,
    Mtr,
    Http,
}

impl MeasurementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::Ping => "ping",
            MeasurementType::Traceroute => "traceroute",
            MeasurementType::Dns => "dns",
            MeasurementType::Mtr => "mtr",
            MeasurementType::Http => "http",
        }
    }

    /// Checks whose value is their live latency, a reused measurement would be stale
    pub fn is_realtime(&self) -> bool {
        matches!(self, MeasurementType::Ping | MeasurementType::Mtr)
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
/// Where probes for a measurement should be picked from.
pub struct Location {
    /// Free-form location, e.g. `"Berlin"` or `"AS13335"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Probes to pick from this location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Request to start a new measurement.
pub struct MeasurementRequest {
    #[serde(rename = "type")]
    pub kind: MeasurementType,
    /// Hostname or IP address to run the check against
    pub target: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    /// Total number of probes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Type specific options, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub measurement_options: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_progress_updates: Option<bool>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Measurement accepted by the upstream service.
pub struct CreatedMeasurement {
    /// Id to poll results with
    pub id: String,
    /// Number of probes assigned to the measurement
    pub probes_count: u32,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MeasurementStatus {
    InProgress,
    Finished,
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Current state of a measurement and the results collected so far.
pub struct MeasurementResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MeasurementType,
    pub status: MeasurementStatus,
    pub created_at: String,
    pub updated_at: String,
    pub target: String,
    pub probes_count: u32,
    /// Per-probe results, passed through untouched
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Deserialize, Debug)]
pub struct ErrorDetails {
    pub message: String,
}
