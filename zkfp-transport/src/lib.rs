//! Transport layer for ZKTeco USB fingerprint sensors
//!
//! Provides blocking vendor control and bulk I/O over libusb.

pub mod config;
pub mod error;
pub mod sensor;
pub mod usb;

pub use config::SensorConfig;
pub use error::{Error, Result};
pub use sensor::Sensor;
pub use usb::{UsbBus, UsbTransport};

use std::time::Duration;

use zkfp_core::VendorRequest;
use zkfp_types::DeviceInfo;

/// Vendor I/O on one opened device
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Issue a host-to-device vendor request without data stage
    fn control_out(&self, request: VendorRequest, value: u16, index: u16, timeout: Duration) -> Result<()>;
    
    /// Issue a device-to-host vendor request, returning bytes read
    fn control_in(
        &self,
        request: VendorRequest,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize>;
    
    /// Read from the bulk IN endpoint
    fn bulk_read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize>;
    
    /// Device identity
    fn device_info(&self) -> DeviceInfo;
}

/// Discovery and opening of sensors
pub trait Bus {
    type Transport: Transport;
    
    /// Acquire the USB context; a second call is a no-op
    fn init(&mut self) -> Result<()>;
    
    /// Release the USB context
    fn shutdown(&mut self);
    
    fn is_initialized(&self) -> bool;
    
    /// Number of attached sensors (0 when not initialized)
    fn count(&self) -> usize;
    
    /// Open the sensor at `index` in enumeration order
    fn open(&self, index: usize) -> Result<Self::Transport>;
}
