//! End-to-end wiring: scripted upstream → coordinator → presentation
//! entities, across success, degraded and recovered cycles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use nwps_water::entity::{Entity, FloodAlertSensor, ParameterSensor, StationImage};
use nwps_water::{GaugeConfig, GaugeCoordinator, GaugeError, Result, StationSource};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

struct ScriptedSource {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Result<Value>>>,
}

impl ScriptedSource {
    fn new(steps: Vec<Result<Value>>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(steps.into()),
        })
    }
}

#[async_trait]
impl StationSource for ScriptedSource {
    async fn fetch_station(&self, _station_id: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GaugeError::Upstream("script exhausted".to_string())))
    }
}

fn station_payload() -> Value {
    json!({
        "lid": "PTTP1",
        "name": "Monongahela River at Point Marion",
        "latitude": 39.735,
        "longitude": -79.905,
        "dataAttribution": "NOAA National Water Prediction Service",
        "status": {
            "observed": {
                "primary": 22.4, "primaryUnit": "ft",
                "secondary": 41.0, "secondaryUnit": "kcfs",
                "floodCategory": "minor"
            },
            "forecast": {
                "primary": 25.1, "primaryUnit": "ft",
                "floodCategory": "moderate"
            }
        },
        "flood": { "categories": {
            "minor": { "stage": 21.0 },
            "moderate": { "stage": 24.0 },
            "major": { "stage": 28.5 }
        }},
        "images": {
            "hydrograph": { "default": "https://example.test/hydro.png" }
        }
    })
}

#[tokio::test(start_paused = true)]
async fn full_pipeline_degrades_and_recovers() {
    init_tracing();

    let source = ScriptedSource::new(vec![
        Ok(station_payload()),
        Err(GaugeError::UpstreamTimeout("PTTP1".to_string())),
        Err(GaugeError::UpstreamStatus { status: 503, body: "maintenance".to_string() }),
        Ok(station_payload()),
    ]);

    let config = GaugeConfig::new("pttp1", Some(vec!["stage".to_string(), "flow".to_string()]), 300)
        .unwrap();
    let coordinator = GaugeCoordinator::new(Arc::clone(&source) as Arc<dyn StationSource>, config);

    // --- Setup: first load succeeds, entities come up ---
    coordinator.first_refresh().await.unwrap();
    assert_eq!(coordinator.device_name(), "Monongahela River at Point Marion");

    let sensors = ParameterSensor::for_config(&coordinator);
    let alerts = FloodAlertSensor::for_station(&coordinator);
    let images = StationImage::for_station(&coordinator);

    let stage = &sensors[0];
    let flow = &sensors[1];
    assert!(stage.available());
    assert_eq!(stage.state(), Some(json!(22.4)));
    // 41 kcfs → 41000 cfs
    assert_eq!(flow.state(), Some(json!(41000.0)));
    assert_eq!(flow.unit().as_deref(), Some("cfs"));
    assert!(alerts[0].is_on());
    assert!(alerts[1].is_on());
    assert_eq!(
        images[0].image_url().as_deref(),
        Some("https://example.test/hydro.png")
    );

    // --- Degraded: fetch fails 30 minutes later, cache masks it ---
    tokio::time::advance(Duration::from_secs(30 * 60)).await;
    let stale = coordinator.refresh().await.unwrap();
    assert_eq!(stale.stage, Some(22.4));
    assert!(stage.available());

    // --- Expired: another failure past the hour surfaces ---
    tokio::time::advance(Duration::from_secs(40 * 60)).await;
    let err = coordinator.refresh().await.unwrap_err();
    assert_eq!(err.error_key(), "cannot_connect");
    assert!(!stage.available());
    assert_eq!(stage.state(), None);
    assert!(!alerts[0].is_on());
    assert_eq!(images[0].image_url(), None);
    assert!(coordinator.last_error().is_some());

    // --- Recovered: next success republishes and clears the error ---
    coordinator.refresh().await.unwrap();
    assert!(stage.available());
    assert_eq!(stage.state(), Some(json!(22.4)));
    assert!(coordinator.last_error().is_none());
    assert_eq!(source.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn snapshot_subscription_drives_rerender() {
    init_tracing();

    let source = ScriptedSource::new(vec![Ok(station_payload())]);
    let config = GaugeConfig::with_defaults("PTTP1").unwrap();
    let coordinator = GaugeCoordinator::new(Arc::clone(&source) as Arc<dyn StationSource>, config);

    let mut rx = coordinator.subscribe();
    assert!(rx.borrow().is_none());

    coordinator.first_refresh().await.unwrap();

    rx.changed().await.unwrap();
    let snapshot = rx.borrow().clone().unwrap();
    assert_eq!(snapshot.device.station_id.as_deref(), Some("PTTP1"));
    assert_eq!(snapshot.observed_flood_category.as_deref(), Some("minor"));
}
