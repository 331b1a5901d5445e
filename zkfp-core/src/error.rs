//! Error types for zkfp-core

use crate::engine::EngineError;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Template codec and fusion errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Buffer is too short for the field being accessed
    #[error("Template too short: expected at least {expected} bytes, got {actual} bytes")]
    TooShort {
        expected: usize,
        actual: usize,
    },
    
    /// Declared length outside the accepted window
    #[error("Invalid template length {len} (accepted: {min}..={max})")]
    InvalidLength {
        len: usize,
        min: usize,
        max: usize,
    },
    
    /// Unmasked header does not carry the template magic
    #[error("Template magic mismatch")]
    BadMagic,
    
    /// Encoding requires a plaintext template
    #[error("Template is not in plaintext form")]
    NotPlaintext,
    
    /// A record header points past the end of the template
    #[error("Record at offset {offset} with length {len} exceeds template length {available}")]
    RecordOverrun {
        offset: usize,
        len: usize,
        available: usize,
    },
    
    /// Templates being packed belong to different fingers
    #[error("Template id mismatch: expected {expected:?}, got {actual:?}")]
    IdMismatch {
        expected: (u16, u16),
        actual: (u16, u16),
    },
    
    /// Nothing to pack or fuse
    #[error("No templates supplied")]
    Empty,
    
    /// Fusion only accepts one or three captures
    #[error("Unsupported capture count for fusion: {0}")]
    UnsupportedCount(usize),
    
    /// Two enrollment captures did not match each other
    #[error("Captures {first} and {second} do not match")]
    CapturesDiffer {
        first: usize,
        second: usize,
    },
    
    /// Exported template exceeds the caller's limit
    #[error("Template too large: {size} bytes (max: {max} bytes)")]
    TooLarge {
        size: usize,
        max: usize,
    },
    
    /// Unknown vendor request code
    #[error("Unknown vendor request: 0x{0:02X}")]
    UnknownRequest(u8),
    
    /// Matching engine failure
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Error {
    /// Engine error code carried by this error, if any
    pub fn engine_code(&self) -> Option<i32> {
        match self {
            Self::Engine(e) => Some(e.code),
            _ => None,
        }
    }
}
