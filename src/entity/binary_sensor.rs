//! Flood-alert binary sensors.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::coordinator::GaugeCoordinator;
use crate::entity::Entity;
use crate::types::FloodSeverity;

/// Which category feed the alert tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodAlertKind {
    Observed,
    Forecast,
}

impl FloodAlertKind {
    pub fn key(self) -> &'static str {
        match self {
            FloodAlertKind::Observed => "observed_flood",
            FloodAlertKind::Forecast => "forecast_flood",
        }
    }

    fn label(self) -> &'static str {
        match self {
            FloodAlertKind::Observed => "Observed Flood Active",
            FloodAlertKind::Forecast => "Forecast Flood Expected",
        }
    }
}

/// On when the tracked flood category parses to any severity (action or
/// above).
pub struct FloodAlertSensor {
    coordinator: Arc<GaugeCoordinator>,
    kind: FloodAlertKind,
}

impl FloodAlertSensor {
    pub fn new(coordinator: Arc<GaugeCoordinator>, kind: FloodAlertKind) -> Self {
        Self { coordinator, kind }
    }

    /// Both alert sensors for a station.
    pub fn for_station(coordinator: &Arc<GaugeCoordinator>) -> Vec<FloodAlertSensor> {
        [FloodAlertKind::Observed, FloodAlertKind::Forecast]
            .into_iter()
            .map(|kind| FloodAlertSensor::new(Arc::clone(coordinator), kind))
            .collect()
    }

    pub fn kind(&self) -> FloodAlertKind {
        self.kind
    }

    /// Current severity of the tracked category, `None` when no flooding
    /// is reported.
    pub fn severity(&self) -> Option<FloodSeverity> {
        let snapshot = self.coordinator.current_snapshot()?;
        let category = match self.kind {
            FloodAlertKind::Observed => snapshot.observed_flood_category.as_deref(),
            FloodAlertKind::Forecast => snapshot.forecast_flood_category.as_deref(),
        };
        category.and_then(FloodSeverity::from_label)
    }

    pub fn is_on(&self) -> bool {
        self.severity().is_some()
    }

    /// Both category labels plus the threshold table, for the host's
    /// attribute panel.
    pub fn attributes(&self) -> Value {
        let snapshot = self.coordinator.current_snapshot();
        let mut attrs = json!({
            "station_id": self.coordinator.station_id(),
        });
        if let Some(snap) = snapshot {
            let obj = attrs.as_object_mut().unwrap();
            obj.insert(
                "observed_flood_category".to_string(),
                json!(snap.observed_flood_category),
            );
            obj.insert(
                "forecast_flood_category".to_string(),
                json!(snap.forecast_flood_category),
            );
            obj.insert(
                "flood_thresholds".to_string(),
                json!({
                    "minor": { "stage": snap.flood_minor_stage, "flow": snap.flood_minor_flow },
                    "moderate": { "stage": snap.flood_moderate_stage, "flow": snap.flood_moderate_flow },
                    "major": { "stage": snap.flood_major_stage, "flow": snap.flood_major_flow },
                }),
            );
            if let Some(attribution) = &snap.device.data_attribution {
                obj.insert("attribution".to_string(), json!(attribution));
            }
        }
        attrs
    }
}

impl Entity for FloodAlertSensor {
    fn coordinator(&self) -> &GaugeCoordinator {
        &self.coordinator
    }

    fn unique_id(&self) -> String {
        format!("nwps_{}_{}", self.coordinator.station_id(), self.kind.key())
    }

    fn name(&self) -> String {
        format!("{} ({})", self.kind.label(), self.coordinator.station_id())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
