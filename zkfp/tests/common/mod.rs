//! In-memory sensor bus and matching engine

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use zkfp::{
    encode_template, Bus, Config, EngineError, EngineResult, EngineVersion, MatchingEngine, Transport, Zkfp,
};
use zkfp_core::{
    cipher,
    constants::image,
    template::{make_record, record_payload, TemplateBuilder, TemplateView},
    VendorRequest,
};
use zkfp_types::DeviceInfo;

pub const IDENTITY_LEN: usize = 24;

/// What the next bulk read returns
#[derive(Debug, Clone)]
pub enum Frame {
    Image(Vec<u8>),
    Timeout,
    Broken,
}

#[derive(Debug, Default)]
pub struct SensorState {
    pub frames: VecDeque<Frame>,
    pub probe: [u8; 2],
    pub detect_status: u8,
    pub requests: Vec<(VendorRequest, u16, u16)>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    pub state: Arc<Mutex<SensorState>>,
}

impl FakeTransport {
    pub fn push_frame(&self, frame: Frame) {
        self.state.lock().unwrap().frames.push_back(frame);
    }
    
    pub fn requests(&self) -> Vec<(VendorRequest, u16, u16)> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Transport for FakeTransport {
    fn control_out(&self, request: VendorRequest, value: u16, index: u16, _timeout: Duration) -> zkfp_transport::Result<()> {
        self.state.lock().unwrap().requests.push((request, value, index));
        Ok(())
    }
    
    fn control_in(
        &self,
        request: VendorRequest,
        value: u16,
        index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> zkfp_transport::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.requests.push((request, value, index));
        if request == VendorRequest::DetectImage {
            buf[0] = state.detect_status;
            return Ok(1);
        }
        let probe = state.probe;
        let n = buf.len().min(2);
        buf[..n].copy_from_slice(&probe[..n]);
        Ok(n)
    }
    
    fn bulk_read(&self, buf: &mut [u8], _timeout: Duration) -> zkfp_transport::Result<usize> {
        let frame = self.state.lock().unwrap().frames.pop_front();
        match frame {
            Some(Frame::Image(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(Frame::Broken) => Err(zkfp_transport::Error::NoEndpoint),
            Some(Frame::Timeout) | None => Err(zkfp_transport::Error::Timeout),
        }
    }
    
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(0x1B55, 0x0120, 0x0100)
    }
}


#[derive(Debug, Default)]
pub struct FakeBus {
    pub sensors: Vec<FakeTransport>,
    pub initialized: bool,
}

impl FakeBus {
    pub fn with_sensors(count: usize) -> Self {
        Self {
            sensors: (0..count).map(|_| FakeTransport::default()).collect(),
            initialized: false,
        }
    }
}

impl Bus for FakeBus {
    type Transport = FakeTransport;
    
    fn init(&mut self) -> zkfp_transport::Result<()> {
        self.initialized = true;
        Ok(())
    }
    
    fn shutdown(&mut self) {
        self.initialized = false;
    }
    
    fn is_initialized(&self) -> bool {
        self.initialized
    }
    
    fn count(&self) -> usize {
        if self.initialized { self.sensors.len() } else { 0 }
    }
    
    fn open(&self, index: usize) -> zkfp_transport::Result<FakeTransport> {
        self.sensors
            .get(index)
            .cloned()
            .ok_or(zkfp_transport::Error::DeviceNotFound { index })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finger {
    pub ids: (u16, u16),
    pub record: Vec<u8>,
    pub quality: i32,
    pub identity: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
struct Profile {
    fingers: Vec<Finger>,
    tags: HashMap<String, String>,
}

/// Matching engine double
///
/// A fingerprint is identified by a short byte string; two fingerprints
/// match when their identities are equal. Templates hold one record per
/// fingerprint whose payload is the quality byte followed by the identity.
#[derive(Debug)]
pub struct FakeEngine {
    pub version: EngineVersion,
    pub licensed: bool,
    pub license_loaded: bool,
    pub params: Vec<(i32, i32)>,
    pub qualities: VecDeque<i32>,
    pub fail_matching: bool,
    pub terminated: bool,
    users: Vec<Option<Profile>>,
    db: HashMap<u32, Profile>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            version: EngineVersion { major: 3, minor: 0 },
            licensed: true,
            license_loaded: false,
            params: Vec::new(),
            qualities: VecDeque::new(),
            fail_matching: false,
            terminated: false,
            users: Vec::new(),
            db: HashMap::new(),
        }
    }
}

pub const MATCH_SCORE: i32 = 200;

impl FakeEngine {
    /// Engine that refuses to start without the built-in license
    pub fn unlicensed() -> Self {
        Self {
            licensed: false,
            ..Self::default()
        }
    }
    
    /// Last value written to an engine parameter
    pub fn param(&self, code: i32) -> Option<i32> {
        self.params.iter().rev().find(|(c, _)| *c == code).map(|(_, v)| *v)
    }
    
    fn user(&mut self, user: usize) -> EngineResult<&mut Profile> {
        self.users
            .get_mut(user)
            .and_then(Option::as_mut)
            .ok_or(EngineError::new(EngineError::NO_CONTEXT))
    }
    
    fn score(a: &Profile, b: &Profile) -> i32 {
        let hit = a
            .fingers
            .iter()
            .any(|x| b.fingers.iter().any(|y| x.identity == y.identity));
        if hit { MATCH_SCORE } else { 0 }
    }
    
    fn check_matching(&self) -> EngineResult<()> {
        if self.fail_matching {
            Err(EngineError::new(EngineError::INVALID_PARAMETER))
        } else {
            Ok(())
        }
    }
}

impl MatchingEngine for FakeEngine {
    type User = usize;
    
    fn version(&self) -> EngineVersion {
        self.version
    }
    
    fn user_limit(&self) -> usize {
        1000
    }
    
    fn set_parameter(&mut self, code: i32, value: i32) -> EngineResult<()> {
        self.params.push((code, value));
        Ok(())
    }
    
    fn init_module(&mut self) -> EngineResult<()> {
        self.terminated = false;
        if self.licensed {
            Ok(())
        } else {
            Err(EngineError::new(EngineError::NO_CONTEXT))
        }
    }
    
    fn init_with_license(&mut self, license: &[u8]) -> EngineResult<()> {
        if license.starts_with(b"IC_L") {
            self.license_loaded = true;
            Ok(())
        } else {
            Err(EngineError::new(EngineError::INVALID_PARAMETER))
        }
    }
    
    fn terminate_module(&mut self) {
        self.terminated = true;
    }
    
    fn connect(&mut self, _store: &str) -> EngineResult<()> {
        Ok(())
    }
    
    fn init_user(&mut self) -> EngineResult<usize> {
        self.users.push(Some(Profile::default()));
        Ok(self.users.len() - 1)
    }
    
    fn free_user(&mut self, user: usize) {
        if let Some(slot) = self.users.get_mut(user) {
            *slot = None;
        }
    }
    
    fn clear_user(&mut self, user: usize) -> EngineResult<()> {
        *self.user(user)? = Profile::default();
        Ok(())
    }
    
    fn add_fingerprint(&mut self, user: usize, bitmap: &[u8]) -> EngineResult<()> {
        let center = (image::HEIGHT / 2) * image::WIDTH;
        let identity = bitmap
            .get(center..center + IDENTITY_LEN)
            .ok_or(EngineError::new(EngineError::INVALID_PARAMETER))?
            .to_vec();
        let quality = self.qualities.pop_front().unwrap_or(70);
        let finger = finger((1, 0), quality, &identity);
        self.user(user)?.fingers.push(finger);
        Ok(())
    }
    
    fn export_template(&mut self, user: usize, max_len: usize) -> EngineResult<Vec<u8>> {
        let profile = self.user(user)?;
        let first = profile
            .fingers
            .first()
            .ok_or(EngineError::new(EngineError::INVALID_PARAMETER))?;
        let mut builder = TemplateBuilder::new(first.ids);
        for f in &profile.fingers {
            builder = builder
                .push_record(&f.record)
                .map_err(|_| EngineError::new(EngineError::INVALID_PARAMETER))?;
        }
        let out = builder
            .build()
            .map_err(|_| EngineError::new(EngineError::INVALID_PARAMETER))?;
        if out.len() > max_len {
            return Err(EngineError::new(EngineError::INVALID_TEMPLATE_LEN));
        }
        Ok(out)
    }
    
    fn import_template(&mut self, user: usize, template: &[u8]) -> EngineResult<()> {
        let invalid = || EngineError::new(EngineError::INVALID_PARAMETER);
        if !cipher::is_plaintext(template) {
            return Err(invalid());
        }
        let view = TemplateView::new(template).map_err(|_| invalid())?;
        let ids = view.header().ids;
        let records = view.records().map_err(|_| invalid())?;
        let mut fingers = Vec::new();
        for record in records {
            let payload = record_payload(record);
            let (&quality, identity) = payload.split_first().ok_or_else(invalid)?;
            fingers.push(Finger {
                ids,
                record: record.to_vec(),
                quality: quality as i32,
                identity: identity.to_vec(),
            });
        }
        self.user(user)?.fingers.extend(fingers);
        Ok(())
    }
    
    fn fingerprint_quality(&mut self, user: usize, index: usize) -> EngineResult<i32> {
        self.user(user)?
            .fingers
            .get(index)
            .map(|f| f.quality)
            .ok_or(EngineError::new(EngineError::INVALID_PARAMETER))
    }
    
    fn fingerprint_count(&mut self, user: usize) -> EngineResult<usize> {
        Ok(self.user(user)?.fingers.len())
    }
    
    fn match_users(&mut self, first: usize, second: usize) -> EngineResult<i32> {
        self.check_matching()?;
        let a = self.user(first)?.clone();
        let b = self.user(second)?.clone();
        Ok(Self::score(&a, &b))
    }
    
    fn match_user(&mut self, user: usize, uid: u32) -> EngineResult<i32> {
        self.check_matching()?;
        let probe = self.user(user)?.clone();
        let stored = self
            .db
            .get(&uid)
            .ok_or(EngineError::new(EngineError::USER_NOT_FOUND))?;
        Ok(Self::score(&probe, stored))
    }
    
    fn match_fingerprints(&mut self, user: usize, first: usize, second: usize) -> EngineResult<i32> {
        self.check_matching()?;
        let profile = self.user(user)?;
        match (profile.fingers.get(first), profile.fingers.get(second)) {
            (Some(a), Some(b)) if a.identity == b.identity => Ok(MATCH_SCORE),
            (Some(_), Some(_)) => Ok(0),
            _ => Err(EngineError::new(EngineError::INVALID_PARAMETER)),
        }
    }
    
    fn find_user(&mut self, user: usize) -> EngineResult<(u32, i32)> {
        self.check_matching()?;
        let probe = self.user(user)?.clone();
        let mut uids: Vec<_> = self.db.keys().copied().collect();
        uids.sort_unstable();
        Ok(uids
            .into_iter()
            .map(|uid| (uid, Self::score(&probe, &self.db[&uid])))
            .find(|(_, score)| *score > 0)
            .unwrap_or((0, 0)))
    }
    
    fn find_user_by_query(&mut self, user: usize, query: &str) -> EngineResult<(u32, i32)> {
        self.check_matching()?;
        let probe = self.user(user)?.clone();
        let mut uids: Vec<_> = self.db.keys().copied().collect();
        uids.sort_unstable();
        Ok(uids
            .into_iter()
            .filter(|uid| {
                self.db[uid].tags.iter().any(|(key, value)| {
                    query == format!("SELECT USERID FROM TAG_CACHE WHERE {key}='{value}'")
                })
            })
            .map(|uid| (uid, Self::score(&probe, &self.db[&uid])))
            .find(|(_, score)| *score > 0)
            .unwrap_or((0, 0)))
    }
    
    fn get_user(&mut self, user: usize, uid: u32) -> EngineResult<()> {
        let stored = self
            .db
            .get(&uid)
            .cloned()
            .ok_or(EngineError::new(EngineError::USER_NOT_FOUND))?;
        *self.user(user)? = stored;
        Ok(())
    }
    
    fn register_user_as(&mut self, user: usize, uid: u32) -> EngineResult<()> {
        let profile = self.user(user)?.clone();
        self.db.insert(uid, profile);
        Ok(())
    }
    
    fn update_user(&mut self, user: usize, uid: u32) -> EngineResult<()> {
        if !self.db.contains_key(&uid) {
            return Err(EngineError::new(EngineError::USER_NOT_FOUND));
        }
        let profile = self.user(user)?.clone();
        self.db.insert(uid, profile);
        Ok(())
    }
    
    fn remove_user(&mut self, uid: u32) -> EngineResult<()> {
        self.db
            .remove(&uid)
            .map(|_| ())
            .ok_or(EngineError::new(EngineError::USER_NOT_FOUND))
    }
    
    fn clear_database(&mut self) -> EngineResult<()> {
        self.db.clear();
        Ok(())
    }
    
    fn user_count(&mut self) -> EngineResult<usize> {
        Ok(self.db.len())
    }
    
    fn set_string_tag(&mut self, user: usize, key: &str, value: &str) -> EngineResult<()> {
        self.user(user)?.tags.insert(key.to_string(), value.to_string());
        Ok(())
    }
    
    fn convert_raw_image(&mut self, raw: &[u8], width: usize, height: usize) -> EngineResult<Vec<u8>> {
        raw.get(..width * height)
            .map(<[u8]>::to_vec)
            .ok_or(EngineError::new(EngineError::INVALID_PARAMETER))
    }
}

fn finger(ids: (u16, u16), quality: i32, identity: &[u8]) -> Finger {
    let mut payload = vec![quality as u8];
    payload.extend_from_slice(identity);
    Finger {
        ids,
        record: make_record(0, &payload).unwrap(),
        quality,
        identity: identity.to_vec(),
    }
}

/// Plaintext single-fingerprint template
pub fn plain_template(quality: u8, identity: u8) -> Vec<u8> {
    let mut payload = vec![quality];
    payload.extend_from_slice(&[identity; IDENTITY_LEN]);
    TemplateBuilder::new((1, 0))
        .push_record(&make_record(0, &payload).unwrap())
        .unwrap()
        .build()
        .unwrap()
}

/// Encoded single-fingerprint template
pub fn template(quality: u8, identity: u8) -> Vec<u8> {
    encode_template(&plain_template(quality, identity)).unwrap()
}

/// A full frame of one gray value
pub fn frame(value: u8) -> Frame {
    Frame::Image(vec![value; 300 * 400])
}

pub fn fast_config() -> Config {
    Config::default().with_capture_budget(Duration::from_millis(30))
}

pub type TestZkfp = Zkfp<FakeBus, FakeEngine>;

/// Initialized library with `sensors` attached
pub fn library(sensors: usize) -> (TestZkfp, Vec<FakeTransport>) {
    let bus = FakeBus::with_sensors(sensors);
    let handles = bus.sensors.clone();
    let zk = Zkfp::with_bus(bus, FakeEngine::default(), fast_config());
    (zk, handles)
}
