//! libusb transport

use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, Direction, TransferType, UsbContext};
use tracing::{debug, trace, warn};
use zkfp_core::{
    constants::{PRODUCT_ID, VENDOR_ID},
    VendorRequest,
};
use zkfp_types::DeviceInfo;

use crate::{error::*, Bus, Transport};

/// Process-wide USB context
#[derive(Default)]
pub struct UsbBus {
    context: Option<Context>,
}

impl UsbBus {
    pub fn new() -> Self {
        Self::default()
    }
    
    fn sensors(&self) -> Result<Vec<Device<Context>>> {
        let context = self.context.as_ref().ok_or(Error::NotInitialized)?;
        let devices = context.devices()?;
        
        Ok(devices
            .iter()
            .filter(|device| {
                device
                    .device_descriptor()
                    .map(|d| d.vendor_id() == VENDOR_ID && d.product_id() == PRODUCT_ID)
                    .unwrap_or(false)
            })
            .collect())
    }
}

impl Bus for UsbBus {
    type Transport = UsbTransport;
    
    fn init(&mut self) -> Result<()> {
        if self.context.is_some() {
            return Ok(());
        }
        self.context = Some(Context::new()?);
        debug!("USB context initialized");
        Ok(())
    }
    
    fn shutdown(&mut self) {
        if self.context.take().is_some() {
            debug!("USB context released");
        }
    }
    
    fn is_initialized(&self) -> bool {
        self.context.is_some()
    }
    
    fn count(&self) -> usize {
        match self.sensors() {
            Ok(sensors) => sensors.len(),
            Err(Error::NotInitialized) => 0,
            Err(e) => {
                warn!("Device enumeration failed: {}", e);
                0
            }
        }
    }
    
    fn open(&self, index: usize) -> Result<UsbTransport> {
        let device = self
            .sensors()?
            .into_iter()
            .nth(index)
            .ok_or(Error::DeviceNotFound { index })?;
        
        UsbTransport::open(device)
    }
}

/// Bulk endpoints picked from the active configuration
#[derive(Debug, Clone, Copy)]
struct Endpoints {
    interface: u8,
    bulk_in: u8,
    bulk_out: Option<u8>,
}

fn find_endpoints(device: &Device<Context>) -> Option<Endpoints> {
    let config = device.active_config_descriptor().ok()?;
    
    for interface in config.interfaces() {
        for desc in interface.descriptors() {
            let bulk = |dir: Direction| {
                desc.endpoint_descriptors()
                    .find(|ep| ep.transfer_type() == TransferType::Bulk && ep.direction() == dir)
                    .map(|ep| ep.address())
            };
            if let Some(bulk_in) = bulk(Direction::In) {
                return Some(Endpoints {
                    interface: desc.interface_number(),
                    bulk_in,
                    bulk_out: bulk(Direction::Out),
                });
            }
        }
    }
    None
}

/// One opened sensor
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    endpoints: Option<Endpoints>,
    claimed: bool,
    reattach: bool,
    info: DeviceInfo,
}

impl UsbTransport {
    /// Open a device and claim its bulk interface
    ///
    /// Only the open call itself is fatal; a missing endpoint or a failed
    /// claim is logged and surfaces later as a capture error.
    pub fn open(device: Device<Context>) -> Result<Self> {
        let desc = device.device_descriptor()?;
        let mut handle = device.open()?;
        
        let version = desc.device_version();
        let mut info = DeviceInfo::new(
            desc.vendor_id(),
            desc.product_id(),
            (version.major() as u16) << 8 | (version.minor() as u16) << 4 | version.sub_minor() as u16,
        );
        info.model = handle.read_product_string_ascii(&desc).ok();
        info.manufacturer = handle.read_manufacturer_string_ascii(&desc).ok();
        
        let endpoints = find_endpoints(&device);
        let mut claimed = false;
        let mut reattach = false;
        
        match endpoints {
            Some(ep) => {
                if let Ok(true) = handle.kernel_driver_active(ep.interface) {
                    reattach = handle.detach_kernel_driver(ep.interface).is_ok();
                }
                match handle.claim_interface(ep.interface) {
                    Ok(()) => claimed = true,
                    Err(e) => warn!("Failed to claim interface {}: {}", ep.interface, e),
                }
                debug!(
                    "Using interface {} (bulk in 0x{:02X}, bulk out {:?})",
                    ep.interface, ep.bulk_in, ep.bulk_out
                );
            }
            None => warn!("No interface with a bulk IN endpoint"),
        }
        
        debug!("Opened {}", info);
        Ok(Self {
            handle,
            endpoints,
            claimed,
            reattach,
            info,
        })
    }
    
    /// Bulk OUT endpoint, if the interface has one
    pub fn bulk_out(&self) -> Option<u8> {
        self.endpoints.and_then(|ep| ep.bulk_out)
    }
}

impl Transport for UsbTransport {
    fn control_out(&self, request: VendorRequest, value: u16, index: u16, timeout: Duration) -> Result<()> {
        trace!("{} value={} index={}", request, value, index);
        self.handle
            .write_control(request.request_type(), request.into(), value, index, &[], timeout)?;
        Ok(())
    }
    
    fn control_in(
        &self,
        request: VendorRequest,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        let n = self
            .handle
            .read_control(request.request_type(), request.into(), value, index, buf, timeout)?;
        trace!("{} index={} -> {:02X?}", request, index, &buf[..n]);
        Ok(n)
    }
    
    fn bulk_read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let ep = self.endpoints.ok_or(Error::NoEndpoint)?;
        let n = self.handle.read_bulk(ep.bulk_in, buf, timeout)?;
        trace!("Bulk read {} of {} bytes", n, buf.len());
        Ok(n)
    }
    
    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        let Some(ep) = self.endpoints else {
            return;
        };
        if self.claimed {
            if let Err(e) = self.handle.release_interface(ep.interface) {
                warn!("Failed to release interface {}: {}", ep.interface, e);
            }
        }
        if self.reattach {
            self.handle.attach_kernel_driver(ep.interface).ok();
        }
        debug!("Closed {}", self.info);
    }
}
