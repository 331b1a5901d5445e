//! Device and cache handles

use std::fmt;

use zkfp_core::DEVICE_MAGIC;
use zkfp_transport::{Sensor, Transport};
use zkfp_types::CaptureParams;

/// Handle to an opened sensor
///
/// Handles are plain values; a handle whose magic does not match, or whose
/// device has been closed, is rejected by every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    magic: u32,
    id: u32,
}

impl DeviceHandle {
    pub(crate) fn new(id: u32) -> Self {
        Self { magic: DEVICE_MAGIC, id }
    }
    
    /// Rebuild a handle from its raw parts
    pub fn from_raw(magic: u32, id: u32) -> Self {
        Self { magic, id }
    }
    
    pub fn into_raw(self) -> (u32, u32) {
        (self.magic, self.id)
    }
    
    pub fn id(&self) -> u32 {
        self.id
    }
    
    pub fn is_valid(&self) -> bool {
        self.magic == DEVICE_MAGIC
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.id)
    }
}

/// Handle to the template cache
///
/// There is one cache per engine session. Handles from an earlier session
/// stop working once the library is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheHandle {
    generation: u32,
}

impl CacheHandle {
    pub(crate) fn new(generation: u32) -> Self {
        Self { generation }
    }
    
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

/// An opened sensor plus its cached capture parameters
pub(crate) struct OpenDevice<T> {
    pub sensor: Sensor<T>,
    pub params: CaptureParams,
}

impl<T: Transport> OpenDevice<T> {
    pub fn new(sensor: Sensor<T>) -> Self {
        let params = Self::read_params(&sensor);
        Self { sensor, params }
    }
    
    fn read_params(sensor: &Sensor<T>) -> CaptureParams {
        let config = sensor.config();
        CaptureParams {
            width: config.width,
            height: config.height,
            dpi: config.dpi,
        }
    }
    
    /// Re-read the cached parameters after a change
    pub fn refresh(&mut self) {
        self.params = Self::read_params(&self.sensor);
    }
}
