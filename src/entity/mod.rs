//! Presentation adapters over the coordinator's read surface.
//!
//! Each adapter kind is an independent projection of the published
//! snapshot: it holds an `Arc<GaugeCoordinator>` and nothing else, reads
//! the fields it needs, and implements the slice of the host's entity
//! contract below. No shared mutable state, no inheritance — composition
//! over a common capability (subscribe + read).

mod binary_sensor;
mod camera;
mod image;
mod sensor;

pub use binary_sensor::{FloodAlertKind, FloodAlertSensor};
pub use camera::StationCamera;
pub use image::StationImage;
pub use sensor::ParameterSensor;

use crate::coordinator::GaugeCoordinator;
use crate::types::StationDevice;

/// What the host's entity registry consumes from every adapter. The
/// registry itself owns lifecycle, unique-id persistence and device
/// grouping.
pub trait Entity {
    fn coordinator(&self) -> &GaugeCoordinator;

    /// Stable id, unique within the integration.
    fn unique_id(&self) -> String;

    /// Display name.
    fn name(&self) -> String;

    /// An entity is available while any snapshot is published — a stale
    /// snapshot served from the fallback cache counts.
    fn available(&self) -> bool {
        self.coordinator().is_ready()
    }

    /// Station metadata for the host's device registry.
    fn device(&self) -> StationDevice {
        self.coordinator()
            .current_snapshot()
            .map(|s| s.device.clone())
            .unwrap_or_default()
    }
}
