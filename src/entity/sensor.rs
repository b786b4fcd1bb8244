//! One sensor per selected catalog parameter.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::parameter_spec;
use crate::coordinator::GaugeCoordinator;
use crate::entity::Entity;

/// Projects a single snapshot field as a host sensor.
pub struct ParameterSensor {
    coordinator: Arc<GaugeCoordinator>,
    parameter: String,
}

impl ParameterSensor {
    pub fn new(coordinator: Arc<GaugeCoordinator>, parameter: &str) -> Self {
        Self {
            coordinator,
            parameter: parameter.to_string(),
        }
    }

    /// Sensors for the configured parameter selection. Unknown keys get a
    /// sensor too, so the user can inspect raw payloads through its
    /// attributes.
    pub fn for_config(coordinator: &Arc<GaugeCoordinator>) -> Vec<ParameterSensor> {
        coordinator
            .config()
            .parameters
            .iter()
            .map(|p| ParameterSensor::new(Arc::clone(coordinator), p))
            .collect()
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Current projected state; `None` when the field is absent from the
    /// snapshot (or no snapshot is published).
    pub fn state(&self) -> Option<Value> {
        self.coordinator.current_snapshot()?.field(&self.parameter)
    }

    /// Unit label. The snapshot's reported (post-conversion) unit wins
    /// for the reading parameters; the catalog supplies the rest.
    pub fn unit(&self) -> Option<String> {
        let reported = self.coordinator.current_snapshot().and_then(|s| {
            match self.parameter.as_str() {
                "stage" => s.stage_unit.clone(),
                "flow" => s.flow_unit.clone(),
                "forecast_stage" => s.forecast_stage_unit.clone(),
                "forecast_flow" => s.forecast_flow_unit.clone(),
                _ => None,
            }
        });
        reported.or_else(|| {
            parameter_spec(&self.parameter)
                .and_then(|spec| spec.unit.map(str::to_string))
        })
    }

    /// Diagnostic attributes mirrored onto the host entity, including the
    /// unmodified vendor payload.
    pub fn attributes(&self) -> Value {
        let snapshot = self.coordinator.current_snapshot();
        let mut attrs = json!({
            "station_id": self.coordinator.station_id(),
            "parameter": self.parameter,
        });
        if let Some(snap) = snapshot {
            let obj = attrs.as_object_mut().unwrap();
            if let Some(attribution) = &snap.device.data_attribution {
                obj.insert("attribution".to_string(), json!(attribution));
            }
            if let Some(lat) = snap.device.latitude {
                obj.insert("latitude".to_string(), json!(lat));
            }
            if let Some(lon) = snap.device.longitude {
                obj.insert("longitude".to_string(), json!(lon));
            }
            obj.insert("raw".to_string(), snap.raw.clone());
        }
        attrs
    }
}

impl Entity for ParameterSensor {
    fn coordinator(&self) -> &GaugeCoordinator {
        &self.coordinator
    }

    fn unique_id(&self) -> String {
        format!("nwps_{}_{}", self.coordinator.station_id(), self.parameter)
    }

    fn name(&self) -> String {
        let display = parameter_spec(&self.parameter)
            .map(|spec| spec.name)
            .unwrap_or(self.parameter.as_str());
        format!("{display} ({})", self.coordinator.station_id())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
