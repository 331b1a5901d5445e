//! Matching engine boundary
//!
//! Minutiae extraction and matching live in a closed engine. This module
//! describes the calls the rest of the workspace makes into it, so that a
//! real binding or an in-memory double can be plugged in.

use std::fmt;

/// Engine error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Matching engine error {code}")]
pub struct EngineError {
    pub code: i32,
}

impl EngineError {
    /// Invalid argument passed to a session call
    pub const INVALID_PARAMETER: i32 = 1101;
    
    /// Session context missing
    pub const NO_CONTEXT: i32 = 1116;
    
    /// User id not present in the store
    pub const USER_NOT_FOUND: i32 = 1127;
    
    /// Template length outside 50..=1664
    pub const INVALID_TEMPLATE_LEN: i32 = 1135;
    
    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

/// Result type for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine version as reported at initialization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Where the engine keeps registered users
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProfileStore {
    #[default]
    Memory,
    Named(String),
}

impl ProfileStore {
    /// Longest accepted store name
    pub const MAX_NAME_LEN: usize = 31;
    
    /// Pick a store from a configured name; empty or `memory` selects the in-memory store
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "" | "memory" => Some(Self::Memory),
            n if n.len() > Self::MAX_NAME_LEN => None,
            n => Some(Self::Named(n.to_string())),
        }
    }
    
    /// Connection string passed to [`MatchingEngine::connect`]
    pub fn connection_string(&self) -> &str {
        match self {
            Self::Memory => "type=memory",
            Self::Named(name) => name,
        }
    }
}

/// Calls into the closed matching engine
///
/// `User` is the engine's opaque enrollment subject. Templates passed in and
/// out are always in decoded form.
pub trait MatchingEngine {
    type User: Copy + fmt::Debug;
    
    fn version(&self) -> EngineVersion;
    fn user_limit(&self) -> usize;
    fn set_parameter(&mut self, code: i32, value: i32) -> EngineResult<()>;
    
    fn init_module(&mut self) -> EngineResult<()>;
    fn init_with_license(&mut self, license: &[u8]) -> EngineResult<()>;
    fn terminate_module(&mut self);
    fn connect(&mut self, store: &str) -> EngineResult<()>;
    
    fn init_user(&mut self) -> EngineResult<Self::User>;
    fn free_user(&mut self, user: Self::User);
    fn clear_user(&mut self, user: Self::User) -> EngineResult<()>;
    
    /// Add a converted bitmap to a user
    fn add_fingerprint(&mut self, user: Self::User, bitmap: &[u8]) -> EngineResult<()>;
    
    /// Export a user's template; fails if it would exceed `max_len`
    fn export_template(&mut self, user: Self::User, max_len: usize) -> EngineResult<Vec<u8>>;
    
    /// Append a template's fingerprints to a user
    fn import_template(&mut self, user: Self::User, template: &[u8]) -> EngineResult<()>;
    
    fn fingerprint_quality(&mut self, user: Self::User, index: usize) -> EngineResult<i32>;
    fn fingerprint_count(&mut self, user: Self::User) -> EngineResult<usize>;
    
    fn match_users(&mut self, first: Self::User, second: Self::User) -> EngineResult<i32>;
    fn match_user(&mut self, user: Self::User, uid: u32) -> EngineResult<i32>;
    fn match_fingerprints(&mut self, user: Self::User, first: usize, second: usize) -> EngineResult<i32>;
    
    /// Best registered match as `(uid, raw score)`
    fn find_user(&mut self, user: Self::User) -> EngineResult<(u32, i32)>;
    fn find_user_by_query(&mut self, user: Self::User, query: &str) -> EngineResult<(u32, i32)>;
    
    /// Load a registered user into `user`
    fn get_user(&mut self, user: Self::User, uid: u32) -> EngineResult<()>;
    fn register_user_as(&mut self, user: Self::User, uid: u32) -> EngineResult<()>;
    fn update_user(&mut self, user: Self::User, uid: u32) -> EngineResult<()>;
    fn remove_user(&mut self, uid: u32) -> EngineResult<()>;
    fn clear_database(&mut self) -> EngineResult<()>;
    fn user_count(&mut self) -> EngineResult<usize>;
    
    fn set_string_tag(&mut self, user: Self::User, key: &str, value: &str) -> EngineResult<()>;
    
    /// Convert an 8-bit raster into the engine's bitmap form
    fn convert_raw_image(&mut self, raw: &[u8], width: usize, height: usize) -> EngineResult<Vec<u8>>;
}
