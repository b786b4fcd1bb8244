//! Vendor JSON → [`StationSnapshot`] transform.
//!
//! The NWPS payload shape varies station to station: sub-objects come and
//! go, numbers arrive as strings, and missing readings are encoded as the
//! −999 sentinel. `normalize` is pure and total — a malformed sub-object
//! nulls only the fields extracted from it, never the whole snapshot.

use serde_json::Value;

use crate::config::SENTINEL_READING;
use crate::types::{StationDevice, StationSnapshot};

// ---------------------------------------------------------------------------
// Scalar helpers
// ---------------------------------------------------------------------------

/// Parse a JSON scalar to f64. Accepts numbers and numeric strings;
/// anything else is `None`.
fn to_float_safe(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Sentinel filter: a value exactly equal to −999 means "no reading".
fn valid_reading(v: f64) -> bool {
    v != SENTINEL_READING
}

fn str_at(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Unit normalization
// ---------------------------------------------------------------------------

/// `kcfs` and friends: a kilo-prefixed unit token scales the reading by
/// 1000 and relabels to the unprefixed form.
fn kilo_prefixed(unit: &str) -> bool {
    let u = unit.trim().to_ascii_lowercase();
    u.contains("kcfs") || u.starts_with('k')
}

fn strip_kilo_prefix(unit: &str) -> String {
    let trimmed = unit.trim();
    trimmed
        .strip_prefix('k')
        .or_else(|| trimmed.strip_prefix('K'))
        .unwrap_or(trimmed)
        .to_string()
}

/// Apply kilo-prefix normalization to a secondary (flow) reading.
///
/// The sentinel filter has already run: a `None` value passes through
/// with its reported unit label untouched, so a missing "kcfs" reading
/// stays labeled "kcfs".
fn normalize_flow(value: Option<f64>, unit: Option<String>) -> (Option<f64>, Option<String>) {
    match (value, unit) {
        (Some(v), Some(u)) if kilo_prefixed(&u) => (Some(v * 1000.0), Some(strip_kilo_prefix(&u))),
        (value, unit) => (value, unit),
    }
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Extract a (value, unit) reading pair from an observed/forecast block,
/// with sentinel filtering applied to the value.
fn reading(block: &Value, value_key: &str, unit_key: &str) -> (Option<f64>, Option<String>) {
    let value = to_float_safe(block.get(value_key)).filter(|v| valid_reading(*v));
    let unit = str_at(block, unit_key);
    (value, unit)
}

/// Map one raw station payload into the flat snapshot schema.
///
/// Field extraction order and fallback chains:
/// - device: `lid` → `id`, `name` → `description`
/// - readings: `status.{observed,forecast}.{primary,secondary}` with
///   sentinel filtering, then kilo-prefix conversion on the secondaries
/// - categories: `status.*.floodCategory` → legacy top-level
///   `ObservedFloodCategory` / `ForecastFloodCategory`
/// - thresholds: `flood.categories.{minor,moderate,major}.{stage,flow}`
/// - images: `images.hydrograph.default` → `.floodcat`,
///   `images.probability.{weekint.{stage,flow},shortrange}`, first entry
///   of `images.photos[]` (flat `image` or nested `properties.image`)
pub fn normalize(raw: &Value) -> StationSnapshot {
    let empty = Value::Object(serde_json::Map::new());

    let device = StationDevice {
        station_id: str_at(raw, "lid").or_else(|| str_at(raw, "id")),
        name: str_at(raw, "name").or_else(|| str_at(raw, "description")),
        latitude: to_float_safe(raw.get("latitude")),
        longitude: to_float_safe(raw.get("longitude")),
        description: str_at(raw, "description"),
        data_attribution: str_at(raw, "dataAttribution"),
    };

    let status = raw.get("status").unwrap_or(&empty);
    let observed = status.get("observed").unwrap_or(&empty);
    let forecast = status.get("forecast").unwrap_or(&empty);

    let (stage, stage_unit) = reading(observed, "primary", "primaryUnit");
    let (flow, flow_unit) = {
        let (value, unit) = reading(observed, "secondary", "secondaryUnit");
        normalize_flow(value, unit)
    };
    let (forecast_stage, forecast_stage_unit) = reading(forecast, "primary", "primaryUnit");
    let (forecast_flow, forecast_flow_unit) = {
        let (value, unit) = reading(forecast, "secondary", "secondaryUnit");
        normalize_flow(value, unit)
    };

    let observed_flood_category =
        str_at(observed, "floodCategory").or_else(|| str_at(raw, "ObservedFloodCategory"));
    let forecast_flood_category =
        str_at(forecast, "floodCategory").or_else(|| str_at(raw, "ForecastFloodCategory"));

    let categories = raw
        .get("flood")
        .and_then(|f| f.get("categories"))
        .unwrap_or(&empty);
    let threshold =
        |cat: &str, kind: &str| to_float_safe(categories.get(cat).and_then(|c| c.get(kind)));

    let images = raw.get("images").unwrap_or(&empty);
    let hydrograph = images.get("hydrograph").unwrap_or(&empty);
    let probability = images.get("probability").unwrap_or(&empty);
    let weekint = probability.get("weekint").unwrap_or(&empty);

    let (photo_url, photo_caption) = images
        .get("photos")
        .and_then(Value::as_array)
        .and_then(|photos| photos.first())
        .map(|first| {
            // Sample payloads carry GeoJSON-like features with
            // properties.image; some stations use a flat image field.
            let props = first.get("properties").unwrap_or(&empty);
            let url = str_at(props, "image").or_else(|| str_at(first, "image"));
            let caption = str_at(props, "caption");
            (url, caption)
        })
        .unwrap_or((None, None));

    StationSnapshot {
        stage,
        stage_unit,
        flow,
        flow_unit,
        forecast_stage,
        forecast_stage_unit,
        forecast_flow,
        forecast_flow_unit,
        observed_flood_category,
        forecast_flood_category,
        flood_minor_stage: threshold("minor", "stage"),
        flood_minor_flow: threshold("minor", "flow"),
        flood_moderate_stage: threshold("moderate", "stage"),
        flood_moderate_flow: threshold("moderate", "flow"),
        flood_major_stage: threshold("major", "stage"),
        flood_major_flow: threshold("major", "flow"),
        latitude: to_float_safe(raw.get("latitude")),
        longitude: to_float_safe(raw.get("longitude")),
        elevation: to_float_safe(raw.get("elevation")),
        river_mile: to_float_safe(raw.get("riverMile")),
        hydrograph_image: str_at(hydrograph, "default").or_else(|| str_at(hydrograph, "floodcat")),
        floodcat_image: str_at(hydrograph, "floodcat"),
        probability_stage_week: str_at(weekint, "stage"),
        probability_flow_week: str_at(weekint, "flow"),
        short_range_probability_image: str_at(probability, "shortrange"),
        photo_url,
        photo_caption,
        device,
        raw: raw.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
