//! Matching engine session
//!
//! Owns the engine-side state shared by every device: three scratch users,
//! the score policy for the running engine version, thresholds and the
//! extraction buffer. Templates cross this boundary in encoded form and are
//! decoded right before they reach the engine.

use std::fmt;

use tracing::{debug, info, trace, warn};
use zkfp_core::{
    cipher,
    constants::{
        engine_param,
        image,
        template::{EXPORT_LEN, MAX_LEN, MIN_LEN},
    },
    license, merge, EngineError, EngineResult, MatchingEngine, MergeMode, ProfileStore,
    ScorePolicy, Thresholds,
};

use crate::{
    error::{Error, Result},
    image::center_crop,
};

/// Rotation tolerance applied at session start
const MAX_ROTATION: i32 = 180;

/// Engine-side value of parameter 16
const PARAM_16_VALUE: i32 = 21;

/// Answer to the license challenge: maps a probe to its response
pub type Challenge = fn(u32) -> u32;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// What a session is started with
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// Raw frame width of the device that triggered the start
    pub width: usize,
    pub height: usize,
    pub store: ProfileStore,
    pub thresholds: Thresholds,
}

/// Outcome of a 1:N search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identified {
    /// Registered id, 0 when nothing matched
    pub uid: u32,
    /// Public score
    pub score: i32,
}

#[derive(Debug, Clone, Copy)]
struct Users<U> {
    primary: U,
    secondary: U,
    temp: U,
}

/// A running engine session
pub struct EngineSession<E: MatchingEngine> {
    state: SessionState,
    users: Users<E::User>,
    policy: ScorePolicy,
    thresholds: Thresholds,
    merge_mode: MergeMode,
    extended_mode: bool,
    workspace: Vec<u8>,
    last_error: i32,
    last_quality: i32,
}

impl<E: MatchingEngine> fmt::Debug for EngineSession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("thresholds", &self.thresholds)
            .field("merge_mode", &self.merge_mode)
            .field("extended_mode", &self.extended_mode)
            .field("workspace", &self.workspace.len())
            .finish()
    }
}

/// Size of the extraction workspace for a raw frame
pub fn workspace_len(width: usize, height: usize) -> usize {
    (width * height + image::WORKSET).max(image::MIN_BUFFER)
}

fn set_param<E: MatchingEngine>(engine: &mut E, code: i32, value: i32) {
    if let Err(e) = engine.set_parameter(code, value) {
        warn!(code, value, "Engine rejected parameter: {}", e);
    }
}

impl<E: MatchingEngine> EngineSession<E> {
    /// Bring the engine up and allocate the shared users
    ///
    /// When the engine refuses to start unlicensed, `challenge` is asked to
    /// answer a random probe; a correct answer unlocks the built-in license.
    pub fn start(engine: &mut E, params: &SessionParams, challenge: Option<Challenge>) -> EngineResult<Self> {
        let mut state = SessionState::Uninitialized;
        trace!(%state, "Starting engine session");
        
        set_param(engine, engine_param::PARAM_8, -1);
        let limit = engine.user_limit();
        let version = engine.version();
        state = SessionState::Initializing;
        info!(%version, limit, %state, "Initializing matching engine");
        
        let policy = ScorePolicy::for_version(version);
        
        if let Err(e) = engine.init_module() {
            let Some(answer) = challenge else {
                warn!("Engine refused to start and no license challenge is available");
                return Err(e);
            };
            let probe = license::random_probe(&mut rand::thread_rng());
            if answer(probe) != license::challenge_response(probe) {
                warn!(probe, "License challenge failed");
                return Err(e);
            }
            debug!("License challenge passed, loading built-in license");
            engine.init_with_license(&license::LICENSE)?;
        }
        
        set_param(engine, engine_param::MAX_ROTATION, MAX_ROTATION);
        set_param(engine, engine_param::SPEED, policy.speed);
        set_param(engine, engine_param::PARAM_5, 0);
        set_param(engine, engine_param::MATCH_THRESHOLD, policy.base);
        set_param(engine, engine_param::MAX_TEMPLATE_SIZE, MAX_LEN as i32);
        set_param(engine, engine_param::PARAM_8, -1);
        set_param(engine, engine_param::PARAM_16, PARAM_16_VALUE);
        
        engine.connect(params.store.connection_string())?;
        
        let users = Users {
            primary: engine.init_user()?,
            secondary: engine.init_user()?,
            temp: engine.init_user()?,
        };
        
        let mut session = Self {
            state: SessionState::Ready,
            users,
            policy,
            thresholds: params.thresholds,
            merge_mode: MergeMode::default(),
            extended_mode: false,
            workspace: vec![0u8; workspace_len(params.width, params.height)],
            last_error: 0,
            last_quality: 0,
        };
        session.apply_threshold(engine, session.thresholds.identify);
        
        info!(state = %session.state, store = params.store.connection_string(), "Engine session ready");
        Ok(session)
    }
    
    pub fn state(&self) -> SessionState {
        self.state
    }
    
    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }
    
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }
    
    pub fn merge_mode(&self) -> MergeMode {
        self.merge_mode
    }
    
    pub fn set_merge_mode(&mut self, mode: MergeMode) {
        self.merge_mode = mode;
    }
    
    pub fn extended_mode(&self) -> bool {
        self.extended_mode
    }
    
    /// Toggle the engine's extended template mode
    pub fn set_extended_mode(&mut self, engine: &mut E, on: bool) {
        self.extended_mode = on;
        set_param(engine, engine_param::EXTENDED_MODE, on as i32);
    }
    
    /// Engine error code of the most recent failed call
    pub fn last_error(&self) -> i32 {
        self.last_error
    }
    
    /// Quality of the most recent extraction or fusion
    pub fn last_quality(&self) -> i32 {
        self.last_quality
    }
    
    pub fn workspace_len(&self) -> usize {
        self.workspace.len()
    }
    
    fn track<T>(&mut self, result: EngineResult<T>) -> Result<T> {
        result.map_err(|e| {
            self.last_error = e.code;
            Error::Engine(e)
        })
    }
    
    fn apply_threshold(&mut self, engine: &mut E, public: i32) {
        let raw = self.policy.engine_threshold(public);
        trace!(public, raw, "Applying match threshold");
        set_param(engine, engine_param::MATCH_THRESHOLD, raw);
    }
    
    /// Validate the declared length of an encoded template for matching
    fn check_len(&mut self, template: &[u8]) -> Result<()> {
        let len = cipher::declared_len(template)?;
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            self.last_error = EngineError::INVALID_TEMPLATE_LEN;
            return Err(zkfp_core::Error::InvalidLength {
                len,
                min: MIN_LEN,
                max: MAX_LEN,
            }
            .into());
        }
        Ok(())
    }
    
    fn check_tag(tag: &str) -> Result<()> {
        if tag.is_empty() || tag.contains(['\'', '\\']) {
            return Err(Error::InvalidParameter(format!("invalid tag {tag:?}")));
        }
        Ok(())
    }
    
    /// Decode `template` and load it into `user`, replacing what it held
    fn load(&mut self, engine: &mut E, user: E::User, template: &[u8]) -> Result<()> {
        let plain = cipher::decode(template)?;
        self.track(engine.clear_user(user))?;
        self.track(engine.import_template(user, &plain))
    }
    
    /// Turn a raw frame into an encoded template
    pub fn extract(&mut self, engine: &mut E, raw: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
        let primary = self.users.primary;
        let cropped = image::WIDTH * image::HEIGHT;
        center_crop(raw, width, height, &mut self.workspace[..cropped], image::WIDTH, image::HEIGHT);
        
        let bitmap = engine.convert_raw_image(&self.workspace[..cropped], image::WIDTH, image::HEIGHT);
        let bitmap = self.track(bitmap)?;
        self.track(engine.clear_user(primary))?;
        self.track(engine.add_fingerprint(primary, &bitmap))?;
        let exported = self.track(engine.export_template(primary, EXPORT_LEN))?;
        
        if exported.is_empty() || exported.len() >= MAX_LEN {
            return Err(zkfp_core::Error::InvalidLength {
                len: exported.len(),
                min: 1,
                max: MAX_LEN - 1,
            }
            .into());
        }
        let encoded = cipher::encode(&exported)?;
        
        self.last_quality = self.track(engine.fingerprint_quality(primary, 0))?;
        debug!(len = encoded.len(), quality = self.last_quality, "Extracted template");
        Ok(encoded)
    }
    
    /// Search the registered users for `template`
    ///
    /// With a tag only users carrying that tag are considered.
    pub fn identify(&mut self, engine: &mut E, template: &[u8], tag: Option<&str>) -> Result<Identified> {
        self.check_len(template)?;
        let primary = self.users.primary;
        self.load(engine, primary, template)?;
        
        let found = match tag {
            Some(tag) => {
                Self::check_tag(tag)?;
                let query = format!("SELECT USERID FROM TAG_CACHE WHERE F{tag}='{tag}'");
                engine.find_user_by_query(primary, &query)
            }
            None => engine.find_user(primary),
        };
        let (uid, raw) = self.track(found)?;
        
        let score = if uid > 0 && raw > 0 { self.policy.normalize(raw) } else { 0 };
        debug!(uid, raw, score, "Identification finished");
        Ok(Identified { uid, score })
    }
    
    /// Compare two templates, returning the public score
    pub fn verify(&mut self, engine: &mut E, first: &[u8], second: &[u8]) -> Result<i32> {
        self.check_len(first)?;
        self.check_len(second)?;
        
        let (primary, secondary) = (self.users.primary, self.users.secondary);
        self.load(engine, primary, first)?;
        self.load(engine, secondary, second)?;
        
        let raw = self.track(engine.match_users(primary, secondary))?;
        Ok(self.policy.normalize(raw))
    }
    
    /// Compare a template against one registered user
    pub fn verify_by_id(&mut self, engine: &mut E, uid: u32, template: &[u8]) -> Result<i32> {
        let primary = self.users.primary;
        self.load(engine, primary, template)?;
        
        let raw = self.track(engine.match_user(primary, uid))?;
        Ok(self.policy.normalize(raw))
    }
    
    /// Run `f` with the verify threshold applied
    ///
    /// The identify threshold is restored afterwards whatever `f` returns.
    pub fn with_verify_threshold<T>(
        &mut self,
        engine: &mut E,
        f: impl FnOnce(&mut Self, &mut E) -> Result<T>,
    ) -> Result<T> {
        self.apply_threshold(engine, self.thresholds.verify);
        let result = f(self, engine);
        self.apply_threshold(engine, self.thresholds.identify);
        result
    }
    
    /// Register `template` under `uid`
    pub fn add(&mut self, engine: &mut E, uid: u32, template: &[u8]) -> Result<()> {
        let len = cipher::declared_len(template)?;
        if len > MAX_LEN || len > template.len() {
            return Err(zkfp_core::Error::TooShort {
                expected: len,
                actual: template.len(),
            }
            .into());
        }
        
        let primary = self.users.primary;
        self.load(engine, primary, &template[..len])?;
        self.track(engine.register_user_as(primary, uid))?;
        debug!(uid, len, "Registered template");
        Ok(())
    }
    
    pub fn remove(&mut self, engine: &mut E, uid: u32) -> Result<()> {
        let removed = engine.remove_user(uid);
        self.track(removed)
    }
    
    /// Drop every registered user
    pub fn clear(&mut self, engine: &mut E) -> Result<()> {
        let temp = self.users.temp;
        self.track(engine.clear_user(temp))?;
        let cleared = engine.clear_database();
        self.track(cleared)
    }
    
    pub fn user_count(&mut self, engine: &mut E) -> Result<usize> {
        let count = engine.user_count();
        self.track(count)
    }
    
    /// Fuse enrollment captures with the current merge mode
    pub fn fuse(&mut self, engine: &mut E, captures: &[&[u8]]) -> Result<Vec<u8>> {
        let fused = merge::fuse(engine, self.users.primary, captures, self.merge_mode).map_err(|e| {
            if let Some(code) = e.engine_code() {
                self.last_error = code;
            }
            e
        })?;
        if let Some(quality) = fused.quality {
            self.last_quality = quality;
        }
        Ok(fused.template)
    }
    
    /// Attach `tag` to a registered user so tag-scoped searches find it
    pub fn set_tag(&mut self, engine: &mut E, uid: u32, tag: &str) -> Result<()> {
        Self::check_tag(tag)?;
        let primary = self.users.primary;
        self.track(engine.clear_user(primary))?;
        self.track(engine.get_user(primary, uid))?;
        self.track(engine.set_string_tag(primary, &format!("F{tag}"), tag))?;
        self.track(engine.update_user(primary, uid))
    }
    
    /// Release the users and stop the engine
    pub fn close(&mut self, engine: &mut E) {
        if self.state == SessionState::Closed {
            return;
        }
        engine.free_user(self.users.primary);
        engine.free_user(self.users.secondary);
        engine.free_user(self.users.temp);
        engine.terminate_module();
        self.state = SessionState::Closed;
        info!("Engine session closed");
    }
}
