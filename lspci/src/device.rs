use core::fmt;

use serde::Serialize;

use crate::{NameWithId, Slot};

/// A device record parsed from `lspci` output.
///
/// The verbose-only fields (`driver` onward) stay empty when parsing the
/// single-line format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    slot: Slot,
    cls: NameWithId,
    vendor: NameWithId,
    device: NameWithId,
    subsystem_vendor: Option<NameWithId>,
    subsystem_device: Option<NameWithId>,
    revision: Option<u8>,
    progif: Option<u8>,
    driver: Option<String>,
    kernel_modules: Vec<String>,
    numa_node: Option<u32>,
    iommu_group: Option<u32>,
    physical_slot: Option<String>,
}

impl Device {
    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn cls(&self) -> &NameWithId {
        &self.cls
    }

    pub fn vendor(&self) -> &NameWithId {
        &self.vendor
    }

    pub fn device(&self) -> &NameWithId {
        &self.device
    }

    pub fn subsystem_vendor(&self) -> Option<&NameWithId> {
        self.subsystem_vendor.as_ref()
    }

    pub fn subsystem_device(&self) -> Option<&NameWithId> {
        self.subsystem_device.as_ref()
    }

    pub fn revision(&self) -> Option<u8> {
        self.revision
    }

    /// Programming interface
    pub fn progif(&self) -> Option<u8> {
        self.progif
    }

    /// Kernel driver in use (Linux only)
    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    /// Kernel modules able to handle this device (Linux only)
    pub fn kernel_modules(&self) -> &[String] {
        &self.kernel_modules
    }

    pub fn numa_node(&self) -> Option<u32> {
        self.numa_node
    }

    pub fn iommu_group(&self) -> Option<u32> {
        self.iommu_group
    }

    pub fn physical_slot(&self) -> Option<&str> {
        self.physical_slot.as_deref()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {} {}", self.slot, self.cls, self.vendor, self.device)?;
        if let Some(revision) = self.revision {
            write!(f, " (rev {revision:02x})")?;
        }
        Ok(())
    }
}

/// Collects fields while a record is being parsed. Nothing else can create a
/// [`Device`], so a device never changes once parsed.
#[derive(Debug, Default)]
pub(crate) struct DeviceBuilder {
    pub slot: Option<Slot>,
    pub cls: Option<NameWithId>,
    pub vendor: Option<NameWithId>,
    pub device: Option<NameWithId>,
    pub subsystem_vendor: Option<NameWithId>,
    pub subsystem_device: Option<NameWithId>,
    pub revision: Option<u8>,
    pub progif: Option<u8>,
    pub driver: Option<String>,
    pub kernel_modules: Vec<String>,
    pub numa_node: Option<u32>,
    pub iommu_group: Option<u32>,
    pub physical_slot: Option<String>,
}

impl DeviceBuilder {
    /// Fails with the name of the first missing mandatory field.
    pub fn build(self) -> Result<Device, &'static str> {
        Ok(Device {
            slot: self.slot.ok_or("Slot")?,
            cls: self.cls.ok_or("Class")?,
            vendor: self.vendor.ok_or("Vendor")?,
            device: self.device.ok_or("Device")?,
            subsystem_vendor: self.subsystem_vendor,
            subsystem_device: self.subsystem_device,
            revision: self.revision,
            progif: self.progif,
            driver: self.driver,
            kernel_modules: self.kernel_modules,
            numa_node: self.numa_node,
            iommu_group: self.iommu_group,
            physical_slot: self.physical_slot,
        })
    }
}
