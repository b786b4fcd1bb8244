use serde::Serialize;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// StationDevice
// ---------------------------------------------------------------------------

/// Station metadata block embedded in every snapshot, consumed by the
/// host's device registry for grouping and attribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationDevice {
    pub station_id: Option<String>,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub data_attribution: Option<String>,
}

// ---------------------------------------------------------------------------
// StationSnapshot
// ---------------------------------------------------------------------------

/// One complete, immutable normalized result of a single successful fetch.
///
/// Every field is independently optional: absence of one field never
/// blocks population of the others. Replaced atomically on each
/// successful refresh, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationSnapshot {
    /// Observed water surface elevation, in feet.
    pub stage: Option<f64>,
    pub stage_unit: Option<String>,
    /// Observed discharge, normalized to cfs when the reported unit was
    /// kilo-prefixed.
    pub flow: Option<f64>,
    pub flow_unit: Option<String>,

    pub forecast_stage: Option<f64>,
    pub forecast_stage_unit: Option<String>,
    pub forecast_flow: Option<f64>,
    pub forecast_flow_unit: Option<String>,

    /// Raw category label as reported ("minor", "moderate", "major",
    /// "action", ...). Parse with [`FloodSeverity::from_label`].
    pub observed_flood_category: Option<String>,
    pub forecast_flood_category: Option<String>,

    pub flood_minor_stage: Option<f64>,
    pub flood_minor_flow: Option<f64>,
    pub flood_moderate_stage: Option<f64>,
    pub flood_moderate_flow: Option<f64>,
    pub flood_major_stage: Option<f64>,
    pub flood_major_flow: Option<f64>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub river_mile: Option<f64>,

    pub hydrograph_image: Option<String>,
    pub floodcat_image: Option<String>,
    pub probability_stage_week: Option<String>,
    pub probability_flow_week: Option<String>,
    pub short_range_probability_image: Option<String>,
    pub photo_url: Option<String>,
    pub photo_caption: Option<String>,

    pub device: StationDevice,

    /// Unmodified vendor payload, retained for diagnostic attribute
    /// exposure.
    pub raw: Value,
}

impl StationSnapshot {
    /// Generic field projection keyed by parameter-catalog name. Used by
    /// the presentation adapters so each stays a direct lookup. Returns
    /// `None` both for absent values and for unknown keys.
    pub fn field(&self, key: &str) -> Option<Value> {
        fn num(v: Option<f64>) -> Option<Value> {
            v.map(|x| json!(x))
        }
        fn text(v: &Option<String>) -> Option<Value> {
            v.as_ref().map(|s| Value::String(s.clone()))
        }

        match key {
            "stage" => num(self.stage),
            "stage_unit" => text(&self.stage_unit),
            "flow" => num(self.flow),
            "flow_unit" => text(&self.flow_unit),
            "forecast_stage" => num(self.forecast_stage),
            "forecast_stage_unit" => text(&self.forecast_stage_unit),
            "forecast_flow" => num(self.forecast_flow),
            "forecast_flow_unit" => text(&self.forecast_flow_unit),
            "observed_flood_category" => text(&self.observed_flood_category),
            "forecast_flood_category" => text(&self.forecast_flood_category),
            "flood_minor_stage" => num(self.flood_minor_stage),
            "flood_minor_flow" => num(self.flood_minor_flow),
            "flood_moderate_stage" => num(self.flood_moderate_stage),
            "flood_moderate_flow" => num(self.flood_moderate_flow),
            "flood_major_stage" => num(self.flood_major_stage),
            "flood_major_flow" => num(self.flood_major_flow),
            "latitude" => num(self.latitude),
            "longitude" => num(self.longitude),
            "elevation" => num(self.elevation),
            "river_mile" => num(self.river_mile),
            "hydrograph_image" => text(&self.hydrograph_image),
            "floodcat_image" => text(&self.floodcat_image),
            "probability_stage_week" => text(&self.probability_stage_week),
            "probability_flow_week" => text(&self.probability_flow_week),
            "short_range_probability_image" => text(&self.short_range_probability_image),
            "photo_url" => text(&self.photo_url),
            "photo_caption" => text(&self.photo_caption),
            _ => None,
        }
    }

    /// String-typed projection, for URL fields.
    pub fn field_str(&self, key: &str) -> Option<String> {
        self.field(key)
            .and_then(|v| v.as_str().map(str::to_string))
    }
}

// ---------------------------------------------------------------------------
// FloodSeverity
// ---------------------------------------------------------------------------

/// Ordinal flood severity: action < minor < moderate < major.
///
/// Any parsed severity means a flood alert is active; upstream labels that
/// mean "no flooding" parse to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FloodSeverity {
    Action,
    Minor,
    Moderate,
    Major,
}

impl FloodSeverity {
    /// Parse the upstream category label, case-insensitively. Returns
    /// `None` for "no flooding" style labels and anything unrecognized.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "action" => Some(FloodSeverity::Action),
            "minor" => Some(FloodSeverity::Minor),
            "moderate" => Some(FloodSeverity::Moderate),
            "major" => Some(FloodSeverity::Major),
            _ => None,
        }
    }
}

impl std::fmt::Display for FloodSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FloodSeverity::Action => "action",
            FloodSeverity::Minor => "minor",
            FloodSeverity::Moderate => "moderate",
            FloodSeverity::Major => "major",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
