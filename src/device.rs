//! Device discovery by vendor and product id.
//!
//! Enumeration goes through a [`DeviceBus`], and every opened device is an
//! owned handle that closes itself on drop. [`find_device`] opens all
//! matches and keeps the first; the rest are dropped (closed) before it
//! returns. On any error every handle opened so far is dropped as well, so
//! a failed search leaves nothing open.

use crate::error::{Error, Result};
use std::fmt;
use tracing::debug;

/// What a bus reports about an attached device before it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceDescriptor {
    /// Vendor id.
    pub vendor: u16,
    /// Product id.
    pub product: u16,
    /// Bus number.
    pub bus: u8,
    /// Address on the bus.
    pub address: u8,
}

impl DeviceDescriptor {
    /// Whether this descriptor has the given ids.
    pub const fn matches(&self, vendor: u16, product: u16) -> bool {
        self.vendor == vendor && self.product == product
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} at {:03}.{:03}",
            self.vendor, self.product, self.bus, self.address
        )
    }
}

/// A bus that can list and open devices.
///
/// `Device` must release the underlying handle when dropped.
pub trait DeviceBus {
    /// An open device handle.
    type Device;

    /// Describe every attached device.
    fn descriptors(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Open one device.
    fn open(&self, descriptor: &DeviceDescriptor) -> Result<Self::Device>;
}

/// Open the first device with `vendor`:`product`.
///
/// Fails with [`Error::DeviceNotFound`] if nothing matches. Only the
/// returned handle is left open.
pub fn find_device<B: DeviceBus>(bus: &B, vendor: u16, product: u16) -> Result<B::Device> {
    let opened = bus
        .descriptors()?
        .iter()
        .filter(|descriptor| descriptor.matches(vendor, product))
        .map(|descriptor| {
            debug!(%descriptor, "opening candidate device");
            bus.open(descriptor)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut opened = opened.into_iter();
    let first = opened.next().ok_or(Error::DeviceNotFound { vendor, product })?;
    let extra = opened.count();
    if extra > 0 {
        debug!(extra, "closed extra matching devices");
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const VID: u16 = 0x1234;
    const PID: u16 = 0x5678;

    /// Tracks how many handles are open at once.
    #[derive(Default)]
    struct FakeBus {
        attached: Vec<DeviceDescriptor>,
        open_handles: Arc<AtomicUsize>,
        opens: AtomicUsize,
        fail_on_open: Option<usize>,
    }

    struct FakeDevice {
        descriptor: DeviceDescriptor,
        open_handles: Arc<AtomicUsize>,
    }

    impl Drop for FakeDevice {
        fn drop(&mut self) {
            self.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl FakeBus {
        fn with(devices: &[(u16, u16)]) -> Self {
            let attached = devices
                .iter()
                .zip(1u8..)
                .map(|(&(vendor, product), address)| DeviceDescriptor {
                    vendor,
                    product,
                    bus: 1,
                    address,
                })
                .collect();
            Self {
                attached,
                ..Self::default()
            }
        }

        fn open_now(&self) -> usize {
            self.open_handles.load(Ordering::SeqCst)
        }
    }

    impl DeviceBus for FakeBus {
        type Device = FakeDevice;

        fn descriptors(&self) -> Result<Vec<DeviceDescriptor>> {
            Ok(self.attached.clone())
        }

        fn open(&self, descriptor: &DeviceDescriptor) -> Result<FakeDevice> {
            let attempt = self.opens.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_open == Some(attempt) {
                return Err(Error::Device(format!("cannot open {descriptor}")));
            }
            self.open_handles.fetch_add(1, Ordering::SeqCst);
            Ok(FakeDevice {
                descriptor: *descriptor,
                open_handles: Arc::clone(&self.open_handles),
            })
        }
    }

    #[test]
    fn test_no_match_is_not_found_with_nothing_open() {
        let bus = FakeBus::with(&[(0x1111, PID), (VID, 0x2222)]);
        let result = find_device(&bus, VID, PID);
        assert!(matches!(
            result,
            Err(Error::DeviceNotFound {
                vendor: VID,
                product: PID
            })
        ));
        assert_eq!(bus.open_now(), 0);
    }

    #[test]
    fn test_first_match_kept_others_closed() {
        let bus = FakeBus::with(&[(VID, PID), (0x9999, 0x0001), (VID, PID), (VID, PID)]);
        let device = find_device(&bus, VID, PID).unwrap();
        assert_eq!(bus.opens.load(Ordering::SeqCst), 3);
        assert_eq!(bus.open_now(), 1);
        assert_eq!(device.descriptor.address, 1);

        drop(device);
        assert_eq!(bus.open_now(), 0);
    }

    #[test]
    fn test_open_failure_closes_everything() {
        let bus = FakeBus {
            fail_on_open: Some(1),
            ..FakeBus::with(&[(VID, PID), (VID, PID)])
        };
        assert!(matches!(find_device(&bus, VID, PID), Err(Error::Device(_))));
        assert_eq!(bus.open_now(), 0);
    }

    #[test]
    fn test_descriptor_display() {
        let descriptor = DeviceDescriptor {
            vendor: VID,
            product: PID,
            bus: 2,
            address: 7,
        };
        assert_eq!(descriptor.to_string(), "1234:5678 at 002.007");
    }
}
