//! HTTP access to the NWPS gauges endpoint.
//!
//! [`NwpsClient`] performs single bounded-timeout GETs; it never retries —
//! retry is the scheduler's next tick. The [`StationSource`] trait is the
//! seam the coordinator depends on, so tests can script payloads and
//! failures without a network.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{FETCH_TIMEOUT_SECS, IMAGE_FETCH_TIMEOUT_SECS, NWPS_BASE};
use crate::error::{GaugeError, Result};

/// Maximum bytes of an upstream error body carried into an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Anything the coordinator can pull raw station JSON from.
#[async_trait]
pub trait StationSource: Send + Sync {
    async fn fetch_station(&self, station_id: &str) -> Result<Value>;
}

// ---------------------------------------------------------------------------
// NwpsClient
// ---------------------------------------------------------------------------

/// Thin reqwest wrapper for the NWPS REST API and the image proxy.
pub struct NwpsClient {
    http: reqwest::Client,
    base_url: String,
}

impl NwpsClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(NWPS_BASE)
    }

    /// Base override for tests and mirrors.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| GaugeError::Upstream(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Station ids are short alphanumeric tokens, safe to embed in the
    /// path without further encoding.
    fn station_url(&self, station_id: &str) -> String {
        format!("{}/{}", self.base_url, station_id)
    }

    /// Setup-time probe used by the host's config wizard: fetches the
    /// station once and returns its display name so the wizard can title
    /// the entry. Failures map to localized keys via
    /// [`GaugeError::error_key`].
    pub async fn validate_station(&self, station_id: &str) -> Result<String> {
        let payload = self.fetch_station(station_id).await?;
        Ok(display_name(&payload, station_id))
    }

    /// Lazy byte fetch for camera entities, independent of the refresh
    /// cycle and on a shorter deadline. Non-200 responses are logged at
    /// warn and yield `Ok(None)`.
    pub async fn fetch_image(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let resp = match self
            .http
            .get(url)
            .timeout(Duration::from_secs(IMAGE_FETCH_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(GaugeError::UpstreamTimeout(url.to_string())),
            Err(e) => return Err(GaugeError::Upstream(e.to_string())),
        };

        if !resp.status().is_success() {
            warn!(url, status = resp.status().as_u16(), "image fetch returned non-200");
            return Ok(None);
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GaugeError::Upstream(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }
}

#[async_trait]
impl StationSource for NwpsClient {
    async fn fetch_station(&self, station_id: &str) -> Result<Value> {
        let url = self.station_url(station_id);
        debug!(%url, "fetching station");

        let resp = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(GaugeError::UpstreamTimeout(station_id.to_string()))
            }
            Err(e) => return Err(GaugeError::Upstream(e.to_string())),
        };

        match resp.status().as_u16() {
            200 => resp
                .json()
                .await
                .map_err(|e| GaugeError::Upstream(format!("decoding station payload: {e}"))),
            404 => Err(GaugeError::StationNotFound(station_id.to_string())),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(GaugeError::UpstreamStatus {
                    status,
                    body: truncate_body(&body),
                })
            }
        }
    }
}

/// Display name from a station payload: `name` → `description` → the id.
fn display_name(payload: &Value, station_id: &str) -> String {
    payload
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| payload.get("description").and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .unwrap_or(station_id)
        .to_string()
}

/// First [`ERROR_BODY_LIMIT`] bytes of an error body, cut at a char
/// boundary.
fn truncate_body(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
