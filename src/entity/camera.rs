//! Camera adapters: byte proxies for the station's image URLs.
//!
//! Image fetches are on-demand, per-request GETs with their own short
//! timeout. They are not serialized against the refresh cycle — they read
//! whatever URL the last-published snapshot carries.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::CAMERAS;
use crate::coordinator::GaugeCoordinator;
use crate::entity::Entity;
use crate::fetcher::NwpsClient;

pub struct StationCamera {
    coordinator: Arc<GaugeCoordinator>,
    client: Arc<NwpsClient>,
    camera_id: &'static str,
    field_key: &'static str,
    display_name: &'static str,
}

impl StationCamera {
    /// All cameras for a station, from the fixed camera table.
    pub fn for_station(
        coordinator: &Arc<GaugeCoordinator>,
        client: &Arc<NwpsClient>,
    ) -> Vec<StationCamera> {
        CAMERAS
            .iter()
            .map(|&(camera_id, field_key, display_name)| StationCamera {
                coordinator: Arc::clone(coordinator),
                client: Arc::clone(client),
                camera_id,
                field_key,
                display_name,
            })
            .collect()
    }

    pub fn camera_id(&self) -> &'static str {
        self.camera_id
    }

    /// URL the camera currently points at, if the snapshot carries one.
    pub fn image_url(&self) -> Option<String> {
        self.coordinator.current_snapshot()?.field_str(self.field_key)
    }

    /// Fetch the current image bytes. A missing URL is a no-op; fetch
    /// failures and non-200 responses are logged and yield `None`.
    pub async fn image(&self) -> Option<Vec<u8>> {
        let Some(url) = self.image_url() else {
            debug!(
                camera = self.camera_id,
                key = self.field_key,
                "no image url available"
            );
            return None;
        };

        match self.client.fetch_image(&url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(%url, "image fetch failed: {err}");
                None
            }
        }
    }
}

impl Entity for StationCamera {
    fn coordinator(&self) -> &GaugeCoordinator {
        &self.coordinator
    }

    fn unique_id(&self) -> String {
        format!(
            "nwps_{}_camera_{}",
            self.coordinator.station_id(),
            self.camera_id
        )
    }

    fn name(&self) -> String {
        self.display_name.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
