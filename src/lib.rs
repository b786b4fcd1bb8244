//! NWPS river-gauge integration core.
//!
//! Polls a single NOAA National Water Prediction Service gauge on a fixed
//! interval, normalizes the station JSON into a flat [`StationSnapshot`],
//! and serves it to host-registered presentation entities. On upstream
//! failure the last successful snapshot keeps being served until it is an
//! hour old, after which entities go unavailable.
//!
//! This crate is a plugin for a host automation runtime: it owns no
//! process, no listener, and no storage beyond the host's entity state.
//! Typical wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use nwps_water::{GaugeConfig, GaugeCoordinator, NwpsClient};
//! use nwps_water::entity::{FloodAlertSensor, ParameterSensor, StationCamera, StationImage};
//!
//! # async fn setup() -> nwps_water::Result<()> {
//! let client = Arc::new(NwpsClient::new()?);
//! let config = GaugeConfig::with_defaults("PTTP1")?;
//!
//! let coordinator = GaugeCoordinator::new(client.clone(), config);
//! coordinator.first_refresh().await?;
//! tokio::spawn(coordinator.clone().run());
//!
//! let sensors = ParameterSensor::for_config(&coordinator);
//! let alerts = FloodAlertSensor::for_station(&coordinator);
//! let cameras = StationCamera::for_station(&coordinator, &client);
//! let images = StationImage::for_station(&coordinator);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod fetcher;
pub mod normalizer;
pub mod types;

pub use config::GaugeConfig;
pub use coordinator::GaugeCoordinator;
pub use error::{GaugeError, Result};
pub use fetcher::{NwpsClient, StationSource};
pub use types::{FloodSeverity, StationDevice, StationSnapshot};
