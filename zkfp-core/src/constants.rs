//! Device and codec constants

/// USB vendor id of the supported sensor
pub const VENDOR_ID: u16 = 0x1B55;

/// USB product id of the supported sensor
pub const PRODUCT_ID: u16 = 0x0120;

/// Default frame width in pixels
pub const DEFAULT_WIDTH: u32 = 300;

/// Default frame height in pixels
pub const DEFAULT_HEIGHT: u32 = 400;

/// Default resolution
pub const DEFAULT_DPI: u32 = 500;

/// Per-transfer USB timeout (milliseconds)
pub const TRANSFER_TIMEOUT_MS: u64 = 2000;

/// Default capture polling budget (milliseconds)
pub const CAPTURE_BUDGET_MS: u64 = 500;

/// Vendor request, host to device
pub const REQUEST_TYPE_OUT: u8 = 0x40;

/// Vendor request, device to host
pub const REQUEST_TYPE_IN: u8 = 0xC0;

/// GPIO lines touched while opening a sensor
pub mod gpio {
    /// Two-byte line read to pick the capture mode
    pub const MODE_PROBE: u16 = 0x55;
    
    /// Indicator outputs enabled on open
    pub const LIGHT_A: u16 = 6;
    pub const LIGHT_B: u16 = 7;
    
    /// Value written to both indicator outputs
    pub const LIGHT_ON: u16 = 32769;
}

/// Template codec limits
pub mod template {
    /// Plaintext magic
    pub const MAGIC: &[u8; 5] = b"ICRS2";
    
    /// Format version byte following the magic in fresh headers
    pub const VERSION: u8 = b'1';
    
    /// Header size preceding the first record
    pub const HEADER_LEN: usize = 24;
    
    /// Smallest declared length accepted by decode
    pub const MIN_LEN: usize = 50;
    
    /// Largest single template (decode and encode cap)
    pub const MAX_LEN: usize = 0x680;
    
    /// Largest composite template accepted by split
    pub const MAX_COMPOSITE_LEN: usize = 0x8000;
    
    /// Export buffer handed to the engine
    pub const EXPORT_LEN: usize = 2048;
    
    /// Filler written at bytes 16 and 18 of a fresh header
    pub const HEADER_FILL: u8 = 0xC5;
}

/// Matching engine parameter codes
pub mod engine_param {
    /// Raw match threshold
    pub const MATCH_THRESHOLD: i32 = 1;
    
    /// Maximum rotation in degrees
    pub const MAX_ROTATION: i32 = 4;
    
    pub const PARAM_5: i32 = 5;
    
    /// Matching speed
    pub const SPEED: i32 = 6;
    
    pub const PARAM_8: i32 = 8;
    
    /// Maximum exported template size
    pub const MAX_TEMPLATE_SIZE: i32 = 10;
    
    pub const PARAM_16: i32 = 16;
    
    /// Extended device mode
    pub const EXTENDED_MODE: i32 = 5010;
}

/// Working image the engine expects
pub mod image {
    pub const WIDTH: usize = 280;
    pub const HEIGHT: usize = 360;
    
    /// Padding value for pixels outside the source frame
    pub const FILL: u8 = 0xFF;
    
    /// Working set added to the raw frame size for the session buffer
    pub const WORKSET: usize = 111_040;
    
    /// Minimum session buffer
    pub const MIN_BUFFER: usize = 211_840;
}
