//! USB device identity

use std::fmt;

/// Identity of an opened sensor, read from its USB descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// USB vendor id
    pub vendor_id: u16,
    
    /// USB product id
    pub product_id: u16,
    
    /// Device release number (bcdDevice)
    pub revision: u16,
    
    /// Product string descriptor
    pub model: Option<String>,
    
    /// Manufacturer string descriptor
    pub manufacturer: Option<String>,
}

impl DeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16, revision: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            revision,
            model: None,
            manufacturer: None,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sensor[{:04x}:{:04x} rev {:04x}, model: {}]",
            self.vendor_id,
            self.product_id,
            self.revision,
            self.model.as_deref().unwrap_or("unknown")
        )
    }
}
