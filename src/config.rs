use std::time::Duration;

use crate::error::{GaugeError, Result};

/// NWPS gauges endpoint base.
pub const NWPS_BASE: &str = "https://api.water.noaa.gov/nwps/v1/gauges";

/// Default refresh cadence (seconds).
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 300;

/// Floor on the refresh cadence so a misconfigured host cannot hammer the
/// upstream API.
pub const MIN_SCAN_INTERVAL_SECS: u64 = 30;

/// Station fetch timeout (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Image proxy fetch timeout (seconds). Image fetches are per-request and
/// independent of the refresh cycle.
pub const IMAGE_FETCH_TIMEOUT_SECS: u64 = 10;

/// How long the last successful snapshot may keep being served after
/// fetches start failing. Past this window failures surface and entities
/// go unavailable.
pub const CACHE_RETENTION_SECS: u64 = 3600;

/// Upstream sentinel meaning "no data" — distinct from a legitimate zero
/// reading.
pub const SENTINEL_READING: f64 = -999.0;

// ---------------------------------------------------------------------------
// Parameter catalog
// ---------------------------------------------------------------------------

/// One entry of the known-parameter catalog.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    /// Snapshot field key.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Typical unit, post-normalization (flow in cfs). None for text and
    /// URL parameters.
    pub unit: Option<&'static str>,
}

/// Parameter keys exposed as sensors. Units are the normalized forms the
/// snapshot carries after unit conversion.
pub const PARAMETER_CATALOG: &[ParameterSpec] = &[
    ParameterSpec { key: "stage", name: "Stage", unit: Some("ft") },
    ParameterSpec { key: "flow", name: "Flow", unit: Some("cfs") },
    ParameterSpec { key: "forecast_stage", name: "Forecast Stage", unit: Some("ft") },
    ParameterSpec { key: "forecast_flow", name: "Forecast Flow", unit: Some("cfs") },
    ParameterSpec { key: "observed_flood_category", name: "Observed Flood Category", unit: None },
    ParameterSpec { key: "forecast_flood_category", name: "Forecast Flood Category", unit: None },
    ParameterSpec { key: "flood_minor_stage", name: "Flood Minor Stage", unit: Some("ft") },
    ParameterSpec { key: "flood_minor_flow", name: "Flood Minor Flow", unit: Some("cfs") },
    ParameterSpec { key: "flood_moderate_stage", name: "Flood Moderate Stage", unit: Some("ft") },
    ParameterSpec { key: "flood_moderate_flow", name: "Flood Moderate Flow", unit: Some("cfs") },
    ParameterSpec { key: "flood_major_stage", name: "Flood Major Stage", unit: Some("ft") },
    ParameterSpec { key: "flood_major_flow", name: "Flood Major Flow", unit: Some("cfs") },
    ParameterSpec { key: "hydrograph_image", name: "Hydrograph Image", unit: None },
    ParameterSpec { key: "floodcat_image", name: "Flood Category Image", unit: None },
    ParameterSpec { key: "short_range_probability_image", name: "Short Range Probability Image", unit: None },
    ParameterSpec { key: "probability_stage_week", name: "Probability Stage (weekint)", unit: None },
    ParameterSpec { key: "probability_flow_week", name: "Probability Flow (weekint)", unit: None },
    ParameterSpec { key: "photo_url", name: "Station Photo", unit: None },
];

/// Catalog lookup by snapshot field key.
pub fn parameter_spec(key: &str) -> Option<&'static ParameterSpec> {
    PARAMETER_CATALOG.iter().find(|p| p.key == key)
}

/// Flood-alert binary sensors: (key, display name).
pub const BINARY_SENSORS: &[(&str, &str)] = &[
    ("observed_flood", "Observed Flood Active"),
    ("forecast_flood", "Forecast Flood Expected"),
];

/// Camera table: (camera id, snapshot field key, display name).
pub const CAMERAS: &[(&str, &str, &str)] = &[
    ("hydrograph", "hydrograph_image", "Hydrograph"),
    ("floodcat", "floodcat_image", "Flood Category Image"),
    ("short_range_probability", "short_range_probability_image", "Short Range Probability"),
    ("station_photo", "photo_url", "Station Photo"),
];

/// Image entities project a URL only; the host's image platform renders it.
pub const IMAGE_PARAMETERS: &[(&str, &str)] = &[
    ("hydrograph_image", "Hydrograph Image"),
    ("floodcat_image", "Flood Category Image"),
    ("short_range_probability_image", "Short Range Probability Image"),
];

// ---------------------------------------------------------------------------
// GaugeConfig
// ---------------------------------------------------------------------------

/// Per-entry configuration, collected and persisted by the host's setup
/// wizard and handed to the coordinator at construction.
#[derive(Debug, Clone)]
pub struct GaugeConfig {
    /// Upper-cased NWPS gauge identifier, e.g. "PTTP1".
    pub station_id: String,
    /// Catalog keys to expose as sensors. Unknown keys are kept — a sensor
    /// is still created for them so the user can inspect raw payloads.
    pub parameters: Vec<String>,
    /// Refresh cadence.
    pub scan_interval: Duration,
}

impl GaugeConfig {
    /// Validates and normalizes user input. The station id is trimmed and
    /// upper-cased; `parameters: None` selects the full catalog; the scan
    /// interval is clamped to [`MIN_SCAN_INTERVAL_SECS`].
    pub fn new(
        station_id: &str,
        parameters: Option<Vec<String>>,
        scan_interval_secs: u64,
    ) -> Result<Self> {
        let station_id = station_id.trim().to_ascii_uppercase();
        if station_id.is_empty() {
            return Err(GaugeError::Config("station id must not be empty".to_string()));
        }
        if !station_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GaugeError::Config(format!(
                "station id {station_id:?} must be alphanumeric"
            )));
        }

        let parameters = parameters.unwrap_or_else(|| {
            PARAMETER_CATALOG.iter().map(|p| p.key.to_string()).collect()
        });

        Ok(Self {
            station_id,
            parameters,
            scan_interval: Duration::from_secs(scan_interval_secs.max(MIN_SCAN_INTERVAL_SECS)),
        })
    }

    /// Full catalog, default cadence.
    pub fn with_defaults(station_id: &str) -> Result<Self> {
        Self::new(station_id, None, DEFAULT_SCAN_INTERVAL_SECS)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_id_is_trimmed_and_upper_cased() {
        let cfg = GaugeConfig::with_defaults("  pttp1 ").unwrap();
        assert_eq!(cfg.station_id, "PTTP1");
    }

    #[test]
    fn empty_station_id_is_rejected() {
        let err = GaugeConfig::with_defaults("   ").unwrap_err();
        assert_eq!(err.error_key(), "invalid_station");
    }

    #[test]
    fn non_alphanumeric_station_id_is_rejected() {
        assert!(GaugeConfig::with_defaults("PT/TP1").is_err());
        assert!(GaugeConfig::with_defaults("pttp 1").is_err());
    }

    #[test]
    fn parameters_default_to_full_catalog() {
        let cfg = GaugeConfig::with_defaults("PTTP1").unwrap();
        assert_eq!(cfg.parameters.len(), PARAMETER_CATALOG.len());
        assert!(cfg.parameters.iter().any(|p| p == "stage"));
        assert!(cfg.parameters.iter().any(|p| p == "photo_url"));
    }

    #[test]
    fn explicit_parameter_subset_is_kept_verbatim() {
        let cfg = GaugeConfig::new(
            "PTTP1",
            Some(vec!["stage".to_string(), "made_up_key".to_string()]),
            DEFAULT_SCAN_INTERVAL_SECS,
        )
        .unwrap();
        // Unknown keys survive: a sensor is still created for them.
        assert_eq!(cfg.parameters, vec!["stage", "made_up_key"]);
    }

    #[test]
    fn scan_interval_is_clamped_to_floor() {
        let cfg = GaugeConfig::new("PTTP1", None, 1).unwrap();
        assert_eq!(cfg.scan_interval, Duration::from_secs(MIN_SCAN_INTERVAL_SECS));

        let cfg = GaugeConfig::new("PTTP1", None, 600).unwrap();
        assert_eq!(cfg.scan_interval, Duration::from_secs(600));
    }

    #[test]
    fn catalog_lookup_finds_known_keys() {
        let spec = parameter_spec("flow").unwrap();
        assert_eq!(spec.unit, Some("cfs"));
        assert!(parameter_spec("nope").is_none());
    }
}
