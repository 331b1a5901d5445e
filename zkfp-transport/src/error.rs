//! Transport errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("USB context not initialized")]
    NotInitialized,
    
    #[error("No sensor at index {index}")]
    DeviceNotFound { index: usize },
    
    #[error("Transfer timeout")]
    Timeout,
    
    #[error("No bulk IN endpoint on this device")]
    NoEndpoint,
    
    #[error("Short control transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },
    
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    
    #[error("Parameter {0} not supported")]
    NotSupported(i32),
    
    #[error("USB error: {0}")]
    Usb(rusb::Error),
}

impl From<rusb::Error> for Error {
    fn from(e: rusb::Error) -> Self {
        match e {
            rusb::Error::Timeout => Self::Timeout,
            other => Self::Usb(other),
        }
    }
}

impl Error {
    /// Check if the error is a transfer timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
    
    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ShortTransfer { .. } | Self::Usb(rusb::Error::Busy | rusb::Error::Interrupted)
        )
    }
}
