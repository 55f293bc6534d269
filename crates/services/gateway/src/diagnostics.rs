use std::{sync::Arc, time::Duration};

use netscope_coalesced::{CacheKey, CoalescingCache};
use serde_json::Value;

use crate::{
    types::{CacheStatus, Cached, CacheSummary},
    upstream::{
        types::{CreatedMeasurement, MeasurementRequest, MeasurementResult},
        Upstream, UpstreamError,
    },
};

/// Upstream measurement API behind a short-lived cache.
///
/// Identical checks started within `check_ttl` reuse the first measurement,
/// and polls for the same measurement within `poll_ttl` share one answer.
/// Real-time check types are always forwarded.
#[derive(Clone)]
pub struct Diagnostics {
    upstream: Upstream,
    checks: CoalescingCache<Arc<CreatedMeasurement>, UpstreamError>,
    results: CoalescingCache<Arc<MeasurementResult>, UpstreamError>,
    check_ttl: Duration,
    poll_ttl: Duration,
}

impl Diagnostics {
    pub fn new(upstream: Upstream, check_ttl: Duration, poll_ttl: Duration) -> Self {
        Self {
            upstream,
            checks: CoalescingCache::new(),
            results: CoalescingCache::new(),
            check_ttl,
            poll_ttl,
        }
    }

    /// Start a measurement, or reuse a recent identical one
    ///
    /// `refresh` skips the cache lookup but still joins a creation that is
    /// already in flight.
    pub async fn create(
        &self,
        request: MeasurementRequest,
        refresh: bool,
    ) -> Result<Cached<Arc<CreatedMeasurement>>, UpstreamError> {
        if request.kind.is_realtime() {
            let created = self.upstream.create_measurement(&request).await?;
            return Ok(Cached::miss(Arc::new(created)));
        }

        let key = check_key(&request);

        if !refresh {
            if let Some(hit) = self.checks.get(&key) {
                return Ok(Cached::hit(hit));
            }
        }

        let upstream = self.upstream.clone();
        let cache = self.checks.clone();
        let ttl = self.check_ttl;
        let stored_key = key.clone();

        self.checks
            .coalesce(key, move || async move {
                let created = Arc::new(upstream.create_measurement(&request).await?);

                // a measurement without probes will never produce results
                if created.probes_count > 0 {
                    cache.set(stored_key, created.clone(), ttl);
                }

                Ok(created)
            })
            .await
            .map(Cached::miss)
            .map_err(UpstreamError::from)
    }

    /// Fetch the current state of a measurement
    pub async fn poll(
        &self,
        id: &str,
        refresh: bool,
    ) -> Result<Cached<Arc<MeasurementResult>>, UpstreamError> {
        let key = poll_key(id);

        if !refresh {
            if let Some(hit) = self.results.get(&key) {
                return Ok(Cached::hit(hit));
            }
        }

        let upstream = self.upstream.clone();
        let cache = self.results.clone();
        let ttl = self.poll_ttl;
        let stored_key = key.clone();
        let id = id.to_string();

        self.results
            .coalesce(key, move || async move {
                let result = Arc::new(upstream.get_measurement(&id).await?);
                cache.set(stored_key, result.clone(), ttl);
                Ok(result)
            })
            .await
            .map(Cached::miss)
            .map_err(UpstreamError::from)
    }

    pub fn check_summary(&self) -> CacheSummary {
        CacheSummary::new(&self.checks)
    }

    pub fn result_summary(&self) -> CacheSummary {
        CacheSummary::new(&self.results)
    }
}

impl<T> Cached<T> {
    fn hit(value: T) -> Self {
        Self {
            value,
            status: CacheStatus::Hit,
        }
    }

    fn miss(value: T) -> Self {
        Self {
            value,
            status: CacheStatus::Miss,
        }
    }
}

/// Key for starting a check, covers every field that changes what gets measured
fn check_key(request: &MeasurementRequest) -> String {
    let locations = if request.locations.is_empty() {
        None
    } else {
        serde_json::to_value(&request.locations)
            .ok()
            .map(|locations| canonical_json(&locations))
    };

    CacheKey::new("measurement.create")
        .param("type", request.kind.as_str())
        .param("target", request.target.trim().to_ascii_lowercase())
        .param_opt("locations", locations)
        .param_opt("limit", request.limit)
        .param_opt(
            "options",
            request.measurement_options.as_ref().map(canonical_json),
        )
        .param_opt("inProgressUpdates", request.in_progress_updates)
        .into()
}

fn poll_key(id: &str) -> String {
    CacheKey::new("measurement.get").param("id", id).into()
}

/// Compact JSON with object keys sorted at every level
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            let fields: Vec<String> = entries
                .into_iter()
                .map(|(name, value)| {
                    format!("{}:{}", Value::from(name.as_str()), canonical_json(value))
                })
                .collect();

            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}
