//! Sensor configuration

use std::time::Duration;

use tracing::warn;
use zkfp_core::constants::{DEFAULT_DPI, DEFAULT_HEIGHT, DEFAULT_WIDTH, TRANSFER_TIMEOUT_MS};

/// Geometry and timing of one sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorConfig {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    /// Frame width on the wire when it differs from `width`
    pub raw_width: Option<u32>,
    /// Frame height on the wire when it differs from `height`
    pub raw_height: Option<u32>,
    /// Per-transfer timeout
    pub timeout: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            dpi: DEFAULT_DPI,
            raw_width: None,
            raw_height: None,
            timeout: Duration::from_millis(TRANSFER_TIMEOUT_MS),
        }
    }
}

impl SensorConfig {
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Set frame size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
    
    /// Set resolution
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }
    
    /// Override the frame size read from the bulk endpoint
    pub fn with_raw_size(mut self, width: u32, height: u32) -> Self {
        self.raw_width = Some(width).filter(|&w| w > 0);
        self.raw_height = Some(height).filter(|&h| h > 0);
        self
    }
    
    /// Set per-transfer timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
    
    /// Frame size on the wire
    pub fn raw_dimensions(&self) -> (u32, u32) {
        (
            self.raw_width.unwrap_or(self.width),
            self.raw_height.unwrap_or(self.height),
        )
    }
    
    /// Bytes in one frame on the wire
    pub fn raw_len(&self) -> usize {
        let (w, h) = self.raw_dimensions();
        w as usize * h as usize
    }
    
    /// Read overrides from `ZKFP_WIDTH`, `ZKFP_HEIGHT`, `ZKFP_DPI`,
    /// `ZKFP_RAW_WIDTH` and `ZKFP_RAW_HEIGHT`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
    
    /// Same as [`SensorConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| -> Option<u32> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u32>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(key, value = %raw, "Ignoring unparsable sensor setting");
                    None
                }
            }
        };
        
        let defaults = Self::default();
        Self {
            width: read("ZKFP_WIDTH").unwrap_or(defaults.width),
            height: read("ZKFP_HEIGHT").unwrap_or(defaults.height),
            dpi: read("ZKFP_DPI").unwrap_or(defaults.dpi),
            raw_width: read("ZKFP_RAW_WIDTH").filter(|&v| v > 0),
            raw_height: read("ZKFP_RAW_HEIGHT").filter(|&v| v > 0),
            timeout: defaults.timeout,
        }
    }
}
