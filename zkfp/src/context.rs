//! Library context: device registry, template cache and matching

use std::{collections::HashMap, time::Instant};

use tracing::{debug, info, trace, warn};
use zkfp_core::{MatchingEngine, MergeMode};
use zkfp_transport::{Bus, Sensor, UsbBus};
use zkfp_types::{CacheParam, CaptureParams, DeviceInfo, ParamCode};

use crate::{
    config::Config,
    device::{CacheHandle, DeviceHandle, OpenDevice},
    error::{Error, Result},
    session::{Challenge, EngineSession, SessionParams},
};

/// Outcome of [`Zkfp::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    Initialized,
    /// The library was already up; nothing changed
    AlreadyInitialized,
}

/// Entry point of the library
///
/// Owns the sensor bus, every opened device and the matching engine. All
/// devices share one engine session, which is started when the first device
/// opens and stopped by [`Zkfp::terminate`].
pub struct Zkfp<B: Bus, E: MatchingEngine> {
    bus: B,
    engine: E,
    config: Config,
    challenge: Option<Challenge>,
    initialized: bool,
    devices: HashMap<u32, OpenDevice<B::Transport>>,
    next_id: u32,
    current: Option<u32>,
    session: Option<EngineSession<E>>,
    generation: u32,
    enrolled: u32,
}

impl<E: MatchingEngine> Zkfp<UsbBus, E> {
    /// Use the USB bus with configuration taken from the environment
    pub fn new(engine: E) -> Self {
        Self::with_bus(UsbBus::new(), engine, Config::from_env())
    }
}

impl<B: Bus, E: MatchingEngine> Zkfp<B, E> {
    pub fn with_bus(bus: B, engine: E, config: Config) -> Self {
        Self {
            bus,
            engine,
            config,
            challenge: Some(Sensor::<B::Transport>::check_license as Challenge),
            initialized: false,
            devices: HashMap::new(),
            next_id: 1,
            current: None,
            session: None,
            generation: 0,
            enrolled: 0,
        }
    }
    
    /// Replace the license challenge answer (`None` disables the fallback)
    pub fn with_challenge(mut self, challenge: Option<Challenge>) -> Self {
        self.challenge = challenge;
        self
    }
    
    pub fn config(&self) -> &Config {
        &self.config
    }
    
    pub fn engine(&self) -> &E {
        &self.engine
    }
    
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
    
    pub fn session(&self) -> Option<&EngineSession<E>> {
        self.session.as_ref()
    }
    
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
    
    /// Bring up the sensor bus
    ///
    /// Fails with [`Error::NoDevice`] when no sensor is attached, leaving the
    /// library uninitialized.
    pub fn init(&mut self) -> Result<InitStatus> {
        if self.initialized {
            return Ok(InitStatus::AlreadyInitialized);
        }
        
        self.bus.init().map_err(|e| {
            warn!("Bus initialization failed: {}", e);
            Error::NotInitialized
        })?;
        
        let count = self.bus.count();
        if count == 0 {
            self.bus.shutdown();
            return Err(Error::NoDevice);
        }
        
        self.initialized = true;
        info!(count, "Library initialized");
        Ok(InitStatus::Initialized)
    }
    
    /// Close every device, stop the engine session and release the bus
    pub fn terminate(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close(&mut self.engine);
        }
        self.enrolled = 0;
        self.devices.clear();
        self.current = None;
        self.bus.shutdown();
        self.initialized = false;
        info!("Library terminated");
    }
    
    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized { Ok(()) } else { Err(Error::NotInitialized) }
    }
    
    pub fn device_count(&self) -> Result<usize> {
        self.ensure_initialized()?;
        Ok(self.bus.count())
    }
    
    /// Open the sensor at `index` and make it the current device
    ///
    /// Opening the first device also starts the engine session.
    pub fn open_device(&mut self, index: usize) -> Result<DeviceHandle> {
        self.ensure_initialized()?;
        if index >= self.bus.count() {
            return Err(Error::NoDevice);
        }
        
        let transport = self.bus.open(index)?;
        let sensor = Sensor::open(transport, self.config.sensor.clone());
        let device = OpenDevice::new(sensor);
        let (width, height) = device.sensor.config().raw_dimensions();
        
        if self.session.is_none() {
            let params = SessionParams {
                width: width as usize,
                height: height as usize,
                store: self.config.store.clone(),
                thresholds: self.config.thresholds,
            };
            let session = EngineSession::start(&mut self.engine, &params, self.challenge)
                .map_err(Error::SessionInit)?;
            self.session = Some(session);
            self.generation = self.generation.wrapping_add(1);
            self.enrolled = 0;
        }
        
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        info!(id, info = %device.sensor.device_info(), params = %device.params, "Device opened");
        self.devices.insert(id, device);
        self.current = Some(id);
        
        Ok(DeviceHandle::new(id))
    }
    
    fn device(&self, handle: DeviceHandle) -> Result<&OpenDevice<B::Transport>> {
        if !handle.is_valid() {
            return Err(Error::InvalidHandle);
        }
        self.ensure_initialized()?;
        self.devices.get(&handle.id()).ok_or(Error::InvalidHandle)
    }
    
    fn device_mut(&mut self, handle: DeviceHandle) -> Result<&mut OpenDevice<B::Transport>> {
        if !handle.is_valid() {
            return Err(Error::InvalidHandle);
        }
        self.ensure_initialized()?;
        self.devices.get_mut(&handle.id()).ok_or(Error::InvalidHandle)
    }
    
    pub fn close_device(&mut self, handle: DeviceHandle) -> Result<()> {
        self.device(handle)?;
        self.devices.remove(&handle.id());
        if self.current == Some(handle.id()) {
            self.current = None;
        }
        debug!(id = handle.id(), "Device closed");
        Ok(())
    }
    
    /// The most recently opened device, if still open
    pub fn current_device(&self) -> Option<DeviceHandle> {
        self.current.map(DeviceHandle::new)
    }
    
    /// Set a device or library parameter
    pub fn set_parameter(&mut self, handle: DeviceHandle, code: i32, value: u32) -> Result<()> {
        if code == i32::from(ParamCode::ExtendedFlag) {
            self.device(handle)?;
            let on = value == 1;
            if let Some(session) = self.session.as_mut() {
                session.set_extended_mode(&mut self.engine, on);
            }
            return Ok(());
        }
        
        let device = self.device_mut(handle)?;
        device.sensor.set_parameter(code, value)?;
        device.refresh();
        debug!(code, value, params = %device.params, "Parameter updated");
        Ok(())
    }
    
    /// Set a parameter from a little-endian value of at least four bytes
    pub fn set_parameter_bytes(&mut self, handle: DeviceHandle, code: i32, value: &[u8]) -> Result<()> {
        let Some(bytes) = value.first_chunk::<4>() else {
            return Err(Error::InvalidParameter(format!(
                "parameter value needs 4 bytes, got {}",
                value.len()
            )));
        };
        self.set_parameter(handle, code, u32::from_le_bytes(*bytes))
    }
    
    pub fn get_parameter(&self, handle: DeviceHandle, code: i32) -> Result<u32> {
        let device = self.device(handle)?;
        if code == i32::from(ParamCode::ExtendedFlag) {
            let on = self.session.as_ref().is_some_and(|s| s.extended_mode());
            return Ok(on as u32);
        }
        Ok(device.sensor.get_parameter(code)?)
    }
    
    pub fn capture_params(&self, handle: DeviceHandle) -> Result<CaptureParams> {
        Ok(self.device(handle)?.params)
    }
    
    pub fn device_info(&self, handle: DeviceHandle) -> Result<DeviceInfo> {
        Ok(self.device(handle)?.sensor.device_info())
    }
    
    /// Poll the sensor until a frame arrives or the capture budget runs out
    fn capture_frame(&self, device: &OpenDevice<B::Transport>, image: &mut [u8]) -> Result<()> {
        image.fill(0);
        let budget = self.config.capture_budget;
        let started = Instant::now();
        let mut attempts = 0u32;
        
        loop {
            attempts += 1;
            match device.sensor.capture(image) {
                Ok(n) if n > 0 => {
                    trace!(attempts, bytes = n, "Frame captured");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) if e.is_recoverable() => trace!("Retrying capture: {}", e),
                Err(e) => return Err(Error::Capture(e)),
            }
            if started.elapsed() >= budget {
                debug!(attempts, ?budget, "No frame within capture budget");
                return Err(Error::CaptureTimeout(budget));
            }
        }
    }
    
    /// Capture a grayscale image into `image`
    pub fn acquire_image(&self, handle: DeviceHandle, image: &mut [u8]) -> Result<()> {
        let device = self.device(handle)?;
        let needed = device.params.image_len();
        if needed > image.len() {
            return Err(Error::InvalidParameter(format!(
                "image buffer holds {} bytes, frame needs {}",
                image.len(),
                needed
            )));
        }
        self.capture_frame(device, image)
    }
    
    /// Capture an image and extract an encoded template from it
    ///
    /// Returns the template length written to `template`.
    pub fn acquire_fingerprint(
        &mut self,
        handle: DeviceHandle,
        image: &mut [u8],
        template: &mut [u8],
    ) -> Result<usize> {
        if template.is_empty() {
            return Err(Error::InvalidParameter("empty template buffer".into()));
        }
        self.acquire_image(handle, image)?;
        
        let params = self.device(handle)?.params;
        let session = self.session.as_mut().ok_or(Error::CacheNotInitialized)?;
        let extracted = session
            .extract(&mut self.engine, image, params.width as usize, params.height as usize)
            .map_err(|e| Error::Extract(Box::new(e)))?;
        
        copy_out(&extracted, template)
    }
    
    /// Quality of the most recent extraction or enrollment
    pub fn last_quality(&self) -> i32 {
        self.session.as_ref().map_or(0, |s| s.last_quality())
    }
    
    /// Engine error code of the most recent failed engine call
    pub fn last_error(&self) -> i32 {
        self.session.as_ref().map_or(0, |s| s.last_error())
    }
    
    /// Get the template cache of the running session
    pub fn create_cache(&self) -> Result<CacheHandle> {
        if self.session.is_none() {
            return Err(Error::CacheNotInitialized);
        }
        Ok(CacheHandle::new(self.generation))
    }
    
    /// Session behind `cache` together with the engine it drives
    fn session_for(&mut self, cache: CacheHandle) -> Result<(&mut EngineSession<E>, &mut E)> {
        match self.session.as_mut() {
            Some(session) if cache.generation() == self.generation => Ok((session, &mut self.engine)),
            Some(_) => Err(Error::InvalidHandle),
            None => Err(Error::CacheNotInitialized),
        }
    }
    
    /// Empty the cache; the handle stays usable
    pub fn close_cache(&mut self, cache: CacheHandle) -> Result<()> {
        self.clear_cache(cache)
    }
    
    pub fn clear_cache(&mut self, cache: CacheHandle) -> Result<()> {
        let (session, engine) = self.session_for(cache)?;
        session.clear(engine)?;
        self.enrolled = 0;
        debug!("Template cache cleared");
        Ok(())
    }
    
    /// Templates added through this library since the last clear
    pub fn cache_count(&mut self, cache: CacheHandle) -> Result<u32> {
        self.session_for(cache)?;
        Ok(self.enrolled)
    }
    
    /// Users the engine holds, including those loaded from a named store
    pub fn engine_user_count(&mut self, cache: CacheHandle) -> Result<usize> {
        let (session, engine) = self.session_for(cache)?;
        session.user_count(engine)
    }
    
    /// Register a template under `fid`
    pub fn add_template(&mut self, cache: CacheHandle, fid: u32, template: &[u8]) -> Result<()> {
        if fid == 0 || template.is_empty() {
            return Err(Error::InvalidParameter("fid and template are required".into()));
        }
        let (session, engine) = self.session_for(cache)?;
        session
            .add(engine, fid, template)
            .map_err(|e| Error::AddFinger(Box::new(e)))?;
        self.enrolled += 1;
        Ok(())
    }
    
    pub fn delete_template(&mut self, cache: CacheHandle, fid: u32) -> Result<()> {
        let (session, engine) = self.session_for(cache)?;
        session
            .remove(engine, fid)
            .map_err(|e| Error::DelFinger(Box::new(e)))?;
        self.enrolled = self.enrolled.saturating_sub(1);
        Ok(())
    }
    
    /// Fuse three enrollment captures into `out`, returning its length
    pub fn gen_reg_template(
        &mut self,
        cache: CacheHandle,
        first: &[u8],
        second: &[u8],
        third: &[u8],
        out: &mut [u8],
    ) -> Result<usize> {
        if first.is_empty() || second.is_empty() || third.is_empty() {
            return Err(Error::InvalidParameter("enrollment capture missing".into()));
        }
        let (session, engine) = self.session_for(cache)?;
        let fused = session
            .fuse(engine, &[first, second, third])
            .map_err(|e| Error::Merge(Box::new(e)))?;
        copy_out(&fused, out)
    }
    
    /// Choose what enrollment fusion keeps
    ///
    /// Merge mode 1 keeps the best capture; any other value keeps the best two.
    pub fn set_cache_parameter(&mut self, cache: CacheHandle, code: i32, value: i32) -> Result<()> {
        let (session, _) = self.session_for(cache)?;
        match CacheParam::try_from(code) {
            Ok(CacheParam::MergeMode) => {
                let mode = MergeMode::try_from(value).unwrap_or(MergeMode::BestTwo);
                session.set_merge_mode(mode);
                debug!(?mode, "Merge mode updated");
                Ok(())
            }
            Err(_) => Err(Error::NotSupported(code)),
        }
    }
    
    /// Search the cache, returning `(fid, score)` of the best match
    pub fn identify(&mut self, cache: CacheHandle, template: &[u8]) -> Result<(u32, i32)> {
        self.identify_inner(cache, template, None)
    }
    
    /// Search only the users carrying `tag`
    pub fn identify_by_tag(&mut self, cache: CacheHandle, template: &[u8], tag: &str) -> Result<(u32, i32)> {
        self.identify_inner(cache, template, Some(tag))
    }
    
    fn identify_inner(&mut self, cache: CacheHandle, template: &[u8], tag: Option<&str>) -> Result<(u32, i32)> {
        if template.is_empty() {
            return Err(Error::InvalidParameter("empty template".into()));
        }
        let (session, engine) = self.session_for(cache)?;
        let found = session.identify(engine, template, tag)?;
        if found.uid == 0 || found.score <= 0 {
            return Err(Error::NoMatch);
        }
        Ok((found.uid, found.score))
    }
    
    /// Tag a registered template
    pub fn set_template_tag(&mut self, cache: CacheHandle, fid: u32, tag: &str) -> Result<()> {
        let (session, engine) = self.session_for(cache)?;
        session.set_tag(engine, fid, tag)
    }
    
    /// Compare two templates under the verify threshold
    pub fn match_finger(&mut self, cache: CacheHandle, first: &[u8], second: &[u8]) -> Result<i32> {
        if first.is_empty() || second.is_empty() {
            return Err(Error::InvalidParameter("empty template".into()));
        }
        let (session, engine) = self.session_for(cache)?;
        session.with_verify_threshold(engine, |s, engine| s.verify(engine, first, second))
    }
    
    /// Compare a template against the one registered under `fid`
    pub fn verify_by_id(&mut self, cache: CacheHandle, fid: u32, template: &[u8]) -> Result<i32> {
        if template.is_empty() {
            return Err(Error::InvalidParameter("empty template".into()));
        }
        let (session, engine) = self.session_for(cache)?;
        session.with_verify_threshold(engine, |s, engine| s.verify_by_id(engine, fid, template))
    }
}

impl<B: Bus, E: MatchingEngine> Drop for Zkfp<B, E> {
    fn drop(&mut self) {
        if self.initialized || self.session.is_some() {
            self.terminate();
        }
    }
}

fn copy_out(data: &[u8], out: &mut [u8]) -> Result<usize> {
    if data.len() > out.len() {
        return Err(Error::BufferTooSmall {
            needed: data.len(),
            available: out.len(),
        });
    }
    out[..data.len()].copy_from_slice(data);
    Ok(data.len())
}
