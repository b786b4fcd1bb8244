//! Image entities: URL projections only. The host's image platform does
//! its own rendering, so unlike [`super::StationCamera`] there is no byte
//! proxy here.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::IMAGE_PARAMETERS;
use crate::coordinator::GaugeCoordinator;
use crate::entity::Entity;

pub struct StationImage {
    coordinator: Arc<GaugeCoordinator>,
    parameter: &'static str,
    display_name: &'static str,
}

impl StationImage {
    /// All image entities for a station.
    pub fn for_station(coordinator: &Arc<GaugeCoordinator>) -> Vec<StationImage> {
        IMAGE_PARAMETERS
            .iter()
            .map(|&(parameter, display_name)| StationImage {
                coordinator: Arc::clone(coordinator),
                parameter,
                display_name,
            })
            .collect()
    }

    pub fn parameter(&self) -> &'static str {
        self.parameter
    }

    pub fn image_url(&self) -> Option<String> {
        self.coordinator.current_snapshot()?.field_str(self.parameter)
    }

    pub fn attributes(&self) -> Value {
        let attribution = self
            .coordinator
            .current_snapshot()
            .and_then(|s| s.device.data_attribution.clone());
        json!({
            "station_id": self.coordinator.station_id(),
            "parameter": self.parameter,
            "attribution": attribution,
        })
    }
}

impl Entity for StationImage {
    fn coordinator(&self) -> &GaugeCoordinator {
        &self.coordinator
    }

    fn unique_id(&self) -> String {
        format!("nwps_{}_{}", self.coordinator.station_id(), self.parameter)
    }

    fn name(&self) -> String {
        self.display_name.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
