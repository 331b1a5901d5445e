//! # zkfp-core
//!
//! I/O-free building blocks for the ZKTeco USB fingerprint sensor stack.
//!
//! This crate provides:
//! - Vendor control request codes
//! - The template obfuscation cipher
//! - Template layout parsing, packing and splitting
//! - Enrollment fusion on top of a matching engine
//! - Score normalization and the engine license challenge

pub mod cipher;
pub mod constants;
pub mod engine;
pub mod error;
pub mod license;
pub mod merge;
pub mod request;
pub mod score;
pub mod template;

pub use engine::{EngineError, EngineResult, EngineVersion, MatchingEngine, ProfileStore};
pub use error::{Error, Result};
pub use merge::{Fused, MergeMode};
pub use request::VendorRequest;
pub use score::{ScorePolicy, Thresholds};
pub use template::{Header, TemplateBuilder, TemplateView};

/// Magic tag stamped on every device handle
pub const DEVICE_MAGIC: u32 = 0x1234_5678;
