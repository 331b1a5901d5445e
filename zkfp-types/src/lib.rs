//! Type definitions for zkfp

pub mod device_info;
pub mod error;
pub mod error_code;
pub mod params;

pub use device_info::DeviceInfo;
pub use error::{Error, Result};
pub use error_code::ErrorCode;
pub use params::{CacheParam, CaptureParams, ParamCode};
