//! Vendor control requests understood by the sensor

use std::fmt;

use crate::{
    constants::{REQUEST_TYPE_IN, REQUEST_TYPE_OUT},
    error::{Error, Result},
};

/// Vendor control request codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VendorRequest {
    /// Wake the sensor after open
    Init = 0xE0,
    
    /// Set GPIO line (`value`, `index` = line)
    SetGpio = 0xE1,
    
    /// Read GPIO line (`index` = line)
    GetGpio = 0xE2,
    
    /// Write camera register (`value`, `index` = register)
    WriteRegister = 0xE3,
    
    /// Read camera register, 2 bytes
    ReadRegister = 0xE4,
    
    /// Start an exposure; the frame follows on the bulk endpoint
    TriggerImage = 0xE5,
    
    /// Read one EEPROM byte
    ReadEeprom = 0xE7,
    
    /// Poll frame-ready status, 1 byte
    DetectImage = 0xEA,
}

impl VendorRequest {
    /// Check if the request reads data from the device
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Self::GetGpio | Self::ReadRegister | Self::ReadEeprom | Self::DetectImage
        )
    }
    
    /// bmRequestType for this request
    pub fn request_type(self) -> u8 {
        if self.is_read() {
            REQUEST_TYPE_IN
        } else {
            REQUEST_TYPE_OUT
        }
    }
    
    /// Get request name
    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::SetGpio => "SET_GPIO",
            Self::GetGpio => "GET_GPIO",
            Self::WriteRegister => "WRITE_REGISTER",
            Self::ReadRegister => "READ_REGISTER",
            Self::TriggerImage => "TRIGGER_IMAGE",
            Self::ReadEeprom => "READ_EEPROM",
            Self::DetectImage => "DETECT_IMAGE",
        }
    }
}

impl From<VendorRequest> for u8 {
    fn from(req: VendorRequest) -> u8 {
        req as u8
    }
}

impl TryFrom<u8> for VendorRequest {
    type Error = Error;
    
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0xE0 => Ok(Self::Init),
            0xE1 => Ok(Self::SetGpio),
            0xE2 => Ok(Self::GetGpio),
            0xE3 => Ok(Self::WriteRegister),
            0xE4 => Ok(Self::ReadRegister),
            0xE5 => Ok(Self::TriggerImage),
            0xE7 => Ok(Self::ReadEeprom),
            0xEA => Ok(Self::DetectImage),
            _ => Err(Error::UnknownRequest(value)),
        }
    }
}

impl fmt::Display for VendorRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}
