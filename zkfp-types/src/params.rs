//! Parameter codes and capture geometry

use std::fmt;

use crate::error::{Error, Result};

/// Device parameter codes accepted by get/set parameter
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ParamCode {
    Width = 1,
    Height = 2,
    Dpi = 3,
    /// Vendor-specific extended mode flag, forwarded to the matching engine
    ExtendedFlag = 10001,
}

impl From<ParamCode> for i32 {
    fn from(code: ParamCode) -> i32 {
        code as i32
    }
}

impl TryFrom<i32> for ParamCode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Self::Width),
            2 => Ok(Self::Height),
            3 => Ok(Self::Dpi),
            10001 => Ok(Self::ExtendedFlag),
            _ => Err(Error::Parse(format!("unknown parameter code {value}"))),
        }
    }
}

/// Template cache parameter codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CacheParam {
    /// 1 = keep the best capture, 2 = keep all but the worst capture
    MergeMode = 5005,
}

impl TryFrom<i32> for CacheParam {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            5005 => Ok(Self::MergeMode),
            _ => Err(Error::Parse(format!("unknown cache parameter {value}"))),
        }
    }
}

/// Image geometry reported for an opened device
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CaptureParams {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}

impl CaptureParams {
    /// Size in bytes of one 8-bit grayscale frame
    pub fn image_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for CaptureParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ {} dpi", self.width, self.height, self.dpi)
    }
}
