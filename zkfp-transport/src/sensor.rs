//! Sensor handle: open sequence, frame capture and scalar parameters

use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use zkfp_core::{
    constants::gpio,
    license,
    VendorRequest,
};
use zkfp_types::{DeviceInfo, ParamCode};

use crate::{
    config::SensorConfig,
    error::{Error, Result},
    Transport,
};

/// An opened sensor
///
/// The configuration lock also serializes captures, so one handle can be
/// shared between threads.
pub struct Sensor<T> {
    transport: T,
    config: Mutex<SensorConfig>,
    detect_mode: bool,
}

impl<T: Transport> Sensor<T> {
    /// Run the open sequence on a freshly opened transport
    ///
    /// Sends the init request, probes the capture mode and enables the
    /// indicator outputs. Failures here are logged and do not abort the open.
    pub fn open(transport: T, config: SensorConfig) -> Self {
        let timeout = config.timeout;
        
        if let Err(e) = transport.control_out(VendorRequest::Init, 0, 0, timeout) {
            warn!("Init request failed: {}", e);
        }
        
        let mut probe = [0u8; 2];
        let detect_mode = match transport.control_in(VendorRequest::GetGpio, 0, gpio::MODE_PROBE, &mut probe, timeout) {
            Ok(2) => probe[0] > 4 || probe[1] > 1,
            Ok(n) => {
                warn!("Capture mode probe returned {} bytes", n);
                false
            }
            Err(e) => {
                warn!("Capture mode probe failed: {}", e);
                false
            }
        };
        
        for line in [gpio::LIGHT_A, gpio::LIGHT_B] {
            if let Err(e) = transport.control_out(VendorRequest::SetGpio, gpio::LIGHT_ON, line, timeout) {
                warn!("Failed to set GPIO {}: {}", line, e);
            }
        }
        
        debug!(
            detect_mode,
            "Sensor ready: {}x{} @ {} dpi",
            config.width, config.height, config.dpi
        );
        
        Self {
            transport,
            config: Mutex::new(config),
            detect_mode,
        }
    }
    
    /// Whether frames are polled with the detect request before reading
    pub fn detect_mode(&self) -> bool {
        self.detect_mode
    }
    
    pub fn transport(&self) -> &T {
        &self.transport
    }
    
    /// Snapshot of the current configuration
    pub fn config(&self) -> SensorConfig {
        self.config.lock().clone()
    }
    
    pub fn device_info(&self) -> DeviceInfo {
        self.transport.device_info()
    }
    
    /// Capture one frame into `buf`
    ///
    /// Returns the bytes copied, or 0 when no frame was available. A buffer
    /// smaller or larger than the wire frame receives the overlapping prefix.
    pub fn capture(&self, buf: &mut [u8]) -> Result<usize> {
        let config = self.config.lock();
        let raw_len = config.raw_len();
        if raw_len == 0 {
            return Err(Error::InvalidParameter("zero frame size".into()));
        }
        if buf.is_empty() {
            return Err(Error::InvalidParameter("empty capture buffer".into()));
        }
        
        if buf.len() == raw_len {
            return self.read_frame(buf, &config);
        }
        
        let mut scratch = vec![0u8; raw_len];
        let n = self.read_frame(&mut scratch, &config)?;
        if n == 0 {
            return Ok(0);
        }
        let copied = buf.len().min(raw_len);
        buf[..copied].copy_from_slice(&scratch[..copied]);
        trace!(raw_len, copied, "Copied frame prefix");
        Ok(copied)
    }
    
    fn read_frame(&self, buf: &mut [u8], config: &SensorConfig) -> Result<usize> {
        if self.detect_mode {
            let mut status = [0u8; 1];
            self.transport
                .control_in(VendorRequest::DetectImage, 0, 0, &mut status, config.timeout)?;
            if status[0] != 1 {
                return Ok(0);
            }
        } else {
            self.transport
                .control_out(VendorRequest::TriggerImage, 0, 0, config.timeout)?;
        }
        
        match self.transport.bulk_read(buf, config.timeout) {
            Err(e) if e.is_timeout() => {
                trace!("Bulk read timed out");
                Ok(0)
            }
            other => other,
        }
    }
    
    /// Read a scalar parameter
    pub fn get_parameter(&self, code: i32) -> Result<u32> {
        let config = self.config.lock();
        match ParamCode::try_from(code) {
            Ok(ParamCode::Width) => Ok(config.width),
            Ok(ParamCode::Height) => Ok(config.height),
            Ok(ParamCode::Dpi) => Ok(config.dpi),
            _ => Err(Error::NotSupported(code)),
        }
    }
    
    /// Write a scalar parameter
    pub fn set_parameter(&self, code: i32, value: u32) -> Result<()> {
        let mut config = self.config.lock();
        match ParamCode::try_from(code) {
            Ok(ParamCode::Width) => config.width = value,
            Ok(ParamCode::Height) => config.height = value,
            Ok(ParamCode::Dpi) => config.dpi = value,
            _ => return Err(Error::NotSupported(code)),
        }
        debug!(code, value, "Sensor parameter updated");
        Ok(())
    }
    
    pub fn set_gpio(&self, line: u16, value: u16) -> Result<()> {
        let timeout = self.config.lock().timeout;
        self.transport.control_out(VendorRequest::SetGpio, value, line, timeout)
    }
    
    pub fn get_gpio(&self, line: u16, buf: &mut [u8]) -> Result<()> {
        let timeout = self.config.lock().timeout;
        self.read_exact(VendorRequest::GetGpio, line, buf, timeout)
    }
    
    /// Write a camera register
    pub fn write_register(&self, register: u8, value: u8) -> Result<()> {
        let timeout = self.config.lock().timeout;
        self.transport
            .control_out(VendorRequest::WriteRegister, value as u16, register as u16, timeout)
    }
    
    /// Read a camera register (2 bytes)
    pub fn read_register(&self, register: u8) -> Result<[u8; 2]> {
        let timeout = self.config.lock().timeout;
        let mut buf = [0u8; 2];
        self.read_exact(VendorRequest::ReadRegister, register as u16, &mut buf, timeout)?;
        Ok(buf)
    }
    
    /// Read one EEPROM byte
    pub fn read_eeprom(&self, addr: u8) -> Result<u8> {
        let timeout = self.config.lock().timeout;
        let mut buf = [0u8; 1];
        self.read_exact(VendorRequest::ReadEeprom, addr as u16, &mut buf, timeout)?;
        Ok(buf[0])
    }
    
    /// Read consecutive EEPROM bytes; empty if any byte fails
    pub fn read_eeprom_range(&self, addr: u8, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        for offset in 0..len {
            match self.read_eeprom(addr.wrapping_add(offset as u8)) {
                Ok(b) => out.push(b),
                Err(e) => {
                    debug!("EEPROM read at 0x{:02X} failed: {}", addr as usize + offset, e);
                    return Vec::new();
                }
            }
        }
        out
    }
    
    fn read_exact(
        &self,
        request: VendorRequest,
        index: u16,
        buf: &mut [u8],
        timeout: std::time::Duration,
    ) -> Result<()> {
        let n = self.transport.control_in(request, 0, index, buf, timeout)?;
        if n != buf.len() {
            return Err(Error::ShortTransfer {
                expected: buf.len(),
                actual: n,
            });
        }
        Ok(())
    }
    
    /// Answer the matching engine's license challenge
    pub fn check_license(probe: u32) -> u32 {
        license::challenge_response(probe)
    }
}
