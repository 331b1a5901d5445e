//! High-level error types

use std::time::Duration;

use zkfp_core::EngineError;
use zkfp_types::ErrorCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Codec error: {0}")]
    Core(#[from] zkfp_core::Error),
    
    #[error("Transport error: {0}")]
    Transport(#[from] zkfp_transport::Error),
    
    #[error("Type error: {0}")]
    Types(#[from] zkfp_types::Error),
    
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    
    #[error("Library not initialized")]
    NotInitialized,
    
    #[error("No sensor available")]
    NoDevice,
    
    #[error("Invalid handle")]
    InvalidHandle,
    
    #[error("Template cache not initialized")]
    CacheNotInitialized,
    
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    
    #[error("Parameter {0} not supported")]
    NotSupported(i32),
    
    #[error("Matching engine initialization failed: {0}")]
    SessionInit(#[source] EngineError),
    
    #[error("Capture failed: {0}")]
    Capture(#[source] zkfp_transport::Error),
    
    #[error("No frame captured within {0:?}")]
    CaptureTimeout(Duration),
    
    #[error("Feature extraction failed: {0}")]
    Extract(#[source] Box<Error>),
    
    #[error("Failed to add template: {0}")]
    AddFinger(#[source] Box<Error>),
    
    #[error("Failed to delete template: {0}")]
    DelFinger(#[source] Box<Error>),
    
    #[error("Template merge failed: {0}")]
    Merge(#[source] Box<Error>),
    
    #[error("No matching template")]
    NoMatch,
    
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

impl Error {
    /// Outward error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Core(_) | Self::Engine(_) | Self::NoMatch => ErrorCode::Fail,
            Self::Transport(e) => match e {
                zkfp_transport::Error::NotSupported(_) => ErrorCode::NotSupport,
                zkfp_transport::Error::InvalidParameter(_) => ErrorCode::InvalidParam,
                zkfp_transport::Error::NotInitialized => ErrorCode::Init,
                zkfp_transport::Error::DeviceNotFound { .. } => ErrorCode::NoDevice,
                zkfp_transport::Error::Timeout => ErrorCode::Timeout,
                _ => ErrorCode::Open,
            },
            Self::Types(_) | Self::InvalidParameter(_) => ErrorCode::InvalidParam,
            Self::NotInitialized => ErrorCode::Init,
            Self::NoDevice => ErrorCode::NoDevice,
            Self::InvalidHandle => ErrorCode::InvalidHandle,
            Self::CacheNotInitialized => ErrorCode::NotInit,
            Self::NotSupported(_) => ErrorCode::NotSupport,
            Self::SessionInit(_) => ErrorCode::InitLib,
            Self::Capture(_) | Self::CaptureTimeout(_) => ErrorCode::Capture,
            Self::Extract(_) => ErrorCode::ExtractFp,
            Self::AddFinger(_) => ErrorCode::AddFinger,
            Self::DelFinger(_) => ErrorCode::DelFinger,
            Self::Merge(_) => ErrorCode::Merge,
            Self::BufferTooSmall { .. } => ErrorCode::MemoryNotEnough,
        }
    }
    
    /// Engine error code behind this error, if any
    pub fn engine_code(&self) -> Option<i32> {
        match self {
            Self::Engine(e) | Self::SessionInit(e) => Some(e.code),
            Self::Core(e) => e.engine_code(),
            Self::Extract(e) | Self::AddFinger(e) | Self::DelFinger(e) | Self::Merge(e) => e.engine_code(),
            _ => None,
        }
    }
}
