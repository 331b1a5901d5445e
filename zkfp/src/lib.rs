//! # zkfp
//!
//! Host-side library for ZKTeco USB fingerprint sensors.
//!
//! ## Features
//!
//! - Sensor discovery, open sequence and frame capture over libusb
//! - Encoded template handling (cipher, merge and split)
//! - Enrollment fusion, 1:1 and 1:N matching through a pluggable engine
//! - Version-aware score normalization
//!
//! ## Quick Start
//!
//! ```no_run
//! use zkfp::{MatchingEngine, Zkfp};
//!
//! fn run<E: MatchingEngine>(engine: E) -> zkfp::Result<()> {
//!     let mut zk = Zkfp::new(engine);
//!     zk.init()?;
//!
//!     let device = zk.open_device(0)?;
//!     let params = zk.capture_params(device)?;
//!     println!("{}: {}", zk.device_info(device)?, params);
//!
//!     let mut image = vec![0u8; params.image_len()];
//!     let mut template = vec![0u8; 2048];
//!     let len = zk.acquire_fingerprint(device, &mut image, &mut template)?;
//!
//!     let cache = zk.create_cache()?;
//!     zk.add_template(cache, 1, &template[..len])?;
//!     let (fid, score) = zk.identify(cache, &template[..len])?;
//!     println!("matched {} with score {}", fid, score);
//!
//!     zk.terminate();
//!     Ok(())
//! }
//! ```

pub mod blob;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod image;
pub mod session;

// Re-exports
pub use blob::{base64_to_blob, base64_to_blob_into, blob_to_base64, blob_to_base64_into};
pub use config::Config;
pub use context::{InitStatus, Zkfp};
pub use device::{CacheHandle, DeviceHandle};
pub use error::{Error, Result};
pub use session::{Challenge, EngineSession, Identified, SessionParams, SessionState};

// Re-export types
pub use zkfp_core::{
    cipher::{decode as decode_template, encode as encode_template, template_len},
    template::{pack as pack_templates, split as split_template},
    EngineError, EngineResult, EngineVersion, MatchingEngine, MergeMode, ProfileStore, ScorePolicy, Thresholds,
};
pub use zkfp_transport::{Bus, Sensor, SensorConfig, Transport, UsbBus};
pub use zkfp_types::{CacheParam, CaptureParams, DeviceInfo, ErrorCode, ParamCode};
