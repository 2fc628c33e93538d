use log::{debug, info, warn};
use rusb::{Context, Device, DeviceDescriptor, Direction, TransferType, UsbContext};
use std::time::Duration;

use crate::{
    error::{Error, Result},
    transport::{DeviceInfo, HidHandle, HidTransport},
};

const HID_CLASS: u8 = 0x03;

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    iface: u8,
    setting: u8,
    address: u8,
}

/// Timeouts used by [`UsbTransport`].
#[derive(Debug, Clone, Copy)]
pub struct UsbConfig {
    write_timeout: Duration,
    read_timeout: Duration,
}

impl Default for UsbConfig {
    fn default() -> Self {
        UsbConfig {
            write_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(1),
        }
    }
}

impl UsbConfig {
    /// Timeout for one output report.
    pub fn write_timeout(self, write_timeout: Duration) -> Self {
        UsbConfig {
            write_timeout,
            ..self
        }
    }

    /// Timeout for descriptor reads and input reports.
    pub fn read_timeout(self, read_timeout: Duration) -> Self {
        UsbConfig {
            read_timeout,
            ..self
        }
    }
}

/// HID transport on top of libusb.
///
/// Reports go straight to the interface's interrupt endpoints, the kernel HID
/// driver is detached while a device is open.
pub struct UsbTransport {
    context: Context,
    config: UsbConfig,
}

impl UsbTransport {
    pub fn new(config: UsbConfig) -> Result<Self> {
        // rusb::set_log_level(rusb::LogLevel::Debug);
        let context = Context::new()?;
        Ok(UsbTransport { context, config })
    }

    fn read_serial(
        &self,
        device: &Device<Context>,
        device_desc: &DeviceDescriptor,
    ) -> std::result::Result<String, rusb::Error> {
        if device_desc.serial_number_string_index().is_none() {
            return Ok(String::new());
        }

        let handle = device.open()?;
        let languages = handle.read_languages(self.config.read_timeout)?;
        match languages.first() {
            Some(language) => {
                handle.read_serial_number_string(*language, device_desc, self.config.read_timeout)
            }
            None => Ok(String::new()),
        }
    }

    fn find_device(&self, path: &str) -> Result<Option<Device<Context>>> {
        let devices = self.context.devices()?;
        Ok(devices.iter().find(|device| device_path(device) == path))
    }
}

impl HidTransport for UsbTransport {
    type Handle = UsbHandle;

    fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        let devices = self.context.devices()?;
        let mut found = Vec::new();

        for device in devices.iter() {
            let device_desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(err) => {
                    debug!("{:?}", err);
                    continue;
                }
            };

            // only HID devices that accept output reports
            if find_endpoint(&device, &device_desc, Direction::Out).is_none() {
                continue;
            }

            let path = device_path(&device);
            let mut access_denied = false;
            let serial_number = match self.read_serial(&device, &device_desc) {
                Ok(s) if s.is_empty() => None,
                Ok(s) => Some(s),
                Err(rusb::Error::Access) => {
                    warn!(
                        "Permission denied reading serial number of '{}'. Please grant access to HID.",
                        path
                    );
                    access_denied = true;
                    None
                }
                Err(err) => {
                    debug!("Failed to read serial number string of {}: {:?}", path, err);
                    None
                }
            };

            debug!(
                "HID device {} {:04x}:{:04x} serial={:?}",
                path,
                device_desc.vendor_id(),
                device_desc.product_id(),
                serial_number
            );
            found.push(DeviceInfo {
                path,
                serial_number,
                access_denied,
                vendor_id: device_desc.vendor_id(),
                product_id: device_desc.product_id(),
            });
        }
        Ok(found)
    }

    fn open(&self, info: &DeviceInfo) -> Result<UsbHandle> {
        let device = match self.find_device(&info.path)? {
            Some(device) => device,
            None => return Err(Error::DeviceDisconnected(info.path.clone())),
        };
        let device_desc = device.device_descriptor()?;

        let endpoint_out = match find_endpoint(&device, &device_desc, Direction::Out) {
            Some(endpoint) => endpoint,
            None => return Err(Error::MissingEndpoint),
        };
        let endpoint_in = find_endpoint(&device, &device_desc, Direction::In);

        let mut handle = device
            .open()
            .map_err(|err| Error::from_usb(err, &info.path))?;

        // usbhid holds the interface on Linux, other platforms report NotSupported
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(err) => return Err(Error::from_usb(err, &info.path)),
        }
        handle
            .claim_interface(endpoint_out.iface)
            .map_err(|err| Error::from_usb(err, &info.path))?;
        handle
            .set_alternate_setting(endpoint_out.iface, endpoint_out.setting)
            .map_err(|err| Error::from_usb(err, &info.path))?;

        info!("Opened {} (interface {})", info.path, endpoint_out.iface);

        Ok(UsbHandle {
            handle: Some(handle),
            path: info.path.clone(),
            endpoint_out,
            endpoint_in,
            config: self.config,
        })
    }

    fn is_connected(&self, path: &str) -> bool {
        match self.find_device(path) {
            Ok(found) => found.is_some(),
            Err(err) => {
                debug!("Failed to read device list: {:?}", err);
                false
            }
        }
    }
}

/// Open HID interface of one printer.
pub struct UsbHandle {
    handle: Option<rusb::DeviceHandle<Context>>,
    path: String,
    endpoint_out: Endpoint,
    endpoint_in: Option<Endpoint>,
    config: UsbConfig,
}

impl UsbHandle {
    fn handle(&self) -> Result<&rusb::DeviceHandle<Context>> {
        match &self.handle {
            Some(handle) => Ok(handle),
            None => Err(Error::UsbError(rusb::Error::NoDevice)),
        }
    }
}

impl HidHandle for UsbHandle {
    fn write_report(&mut self, report_id: u8, data: &[u8]) -> Result<()> {
        // report 0 means the device uses no report ids, nothing is prefixed
        let mut buf: Vec<u8> = Vec::with_capacity(data.len() + 1);
        if report_id != 0 {
            buf.push(report_id);
        }
        buf.extend_from_slice(data);

        let n = self
            .handle()?
            .write_interrupt(self.endpoint_out.address, &buf, self.config.write_timeout)
            .map_err(|err| Error::from_usb(err, &self.path))?;
        if n == buf.len() {
            Ok(())
        } else {
            debug!(
                "write error: bytes wrote {} != bytes supplied {}, possibly timeout ?",
                n,
                buf.len()
            );
            Err(Error::IncompleteWrite {
                written: n,
                expected: buf.len(),
            })
        }
    }

    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        let endpoint = self.endpoint_in.ok_or(Error::MissingEndpoint)?;
        self.handle()?
            .read_interrupt(endpoint.address, buf, self.config.read_timeout)
            .map_err(|err| Error::from_usb(err, &self.path))
    }

    fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(err) = handle.release_interface(self.endpoint_out.iface) {
                debug!("Failed to release interface of {}: {:?}", self.path, err);
            }
            info!("Closed {}", self.path);
        }
    }
}

impl Drop for UsbHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Bus and address, e.g. `usb:001:004`. The address changes when a device is
/// plugged in again.
fn device_path<T: UsbContext>(device: &Device<T>) -> String {
    format!("usb:{:03}:{:03}", device.bus_number(), device.address())
}

fn find_endpoint<T: UsbContext>(
    device: &Device<T>,
    device_desc: &DeviceDescriptor,
    direction: Direction,
) -> Option<Endpoint> {
    for n in 0..device_desc.num_configurations() {
        let config_desc = match device.config_descriptor(n) {
            Ok(c) => c,
            Err(_) => continue,
        };
        for interface in config_desc.interfaces() {
            for interface_desc in interface.descriptors() {
                if interface_desc.class_code() != HID_CLASS {
                    continue;
                }
                for endpoint_desc in interface_desc.endpoint_descriptors() {
                    if endpoint_desc.direction() == direction
                        && endpoint_desc.transfer_type() == TransferType::Interrupt
                    {
                        return Some(Endpoint {
                            iface: interface_desc.interface_number(),
                            setting: interface_desc.setting_number(),
                            address: endpoint_desc.address(),
                        });
                    }
                }
            }
        }
    }
    None
}
