//! Library configuration

use std::time::Duration;

use tracing::warn;
use zkfp_core::{constants::CAPTURE_BUDGET_MS, ProfileStore, Thresholds};
use zkfp_transport::SensorConfig;

/// Settings applied when devices and the engine session are opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub sensor: SensorConfig,
    /// How long image acquisition keeps polling for a frame
    pub capture_budget: Duration,
    pub store: ProfileStore,
    pub thresholds: Thresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            capture_budget: Duration::from_millis(CAPTURE_BUDGET_MS),
            store: ProfileStore::Memory,
            thresholds: Thresholds::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn with_sensor(mut self, sensor: SensorConfig) -> Self {
        self.sensor = sensor;
        self
    }
    
    pub fn with_capture_budget(mut self, budget: Duration) -> Self {
        self.capture_budget = budget;
        self
    }
    
    pub fn with_store(mut self, store: ProfileStore) -> Self {
        self.store = store;
        self
    }
    
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
    
    /// Sensor settings plus `ZKFP_CAPTURE_TIMEOUT_MS` and `ZKFP_DB`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
    
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default().with_sensor(SensorConfig::from_lookup(&lookup));
        
        if let Some(raw) = lookup("ZKFP_CAPTURE_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.capture_budget = Duration::from_millis(ms),
                Err(_) => warn!(value = %raw, "Ignoring unparsable capture timeout"),
            }
        }
        
        if let Some(name) = lookup("ZKFP_DB") {
            match ProfileStore::from_name(&name) {
                Some(store) => config.store = store,
                None => warn!(
                    "Profile store name longer than {} characters, using memory",
                    ProfileStore::MAX_NAME_LEN
                ),
            }
        }
        
        config
    }
}
