//! Advertised GATT tree
//!
//! The server exposes one service holding one characteristic holding one
//! descriptor. Each lives in a fixed UUID slot: the full UUID is
//! `prefix + slot + suffix`, e.g. `1234AAAA-0000-1000-8000-00805F9B34FB`.

use crate::domain::models::AgentCapability;
use std::ops::BitOr;

/// Default leading UUID group, followed by the 4-character slot
pub const UUID_PREFIX: &str = "1234";

/// Default UUID tail, the Bluetooth base UUID
pub const UUID_SUFFIX: &str = "-0000-1000-8000-00805F9B34FB";

/// Service slot
pub const SERVICE_SLOT: &str = "AAAA";

/// Characteristic slot
pub const CHARACTERISTIC_SLOT: &str = "BBBB";

/// Descriptor slot
pub const DESCRIPTOR_SLOT: &str = "CCCC";

/// Read/Write access flags for characteristics and descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessFlags {
    pub read: bool,
    pub write: bool,
}

impl AccessFlags {
    pub const READ: Self = Self {
        read: true,
        write: false,
    };
    pub const WRITE: Self = Self {
        read: false,
        write: true,
    };
}

impl BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            read: self.read || rhs.read,
            write: self.write || rhs.write,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattDescriptor {
    pub uuid: String,
    pub flags: AccessFlags,
}

impl GattDescriptor {
    pub fn new(uuid: impl Into<String>, flags: AccessFlags) -> Self {
        Self {
            uuid: uuid.into(),
            flags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    pub uuid: String,
    pub flags: AccessFlags,
    pub descriptors: Vec<GattDescriptor>,
}

impl GattCharacteristic {
    pub fn new(uuid: impl Into<String>, flags: AccessFlags) -> Self {
        Self {
            uuid: uuid.into(),
            flags,
            descriptors: Vec::new(),
        }
    }

    pub fn add_descr(&mut self, descriptor: GattDescriptor) {
        self.descriptors.push(descriptor);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: String,
    pub characteristics: Vec<GattCharacteristic>,
}

impl GattService {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            characteristics: Vec::new(),
        }
    }

    pub fn add_char(&mut self, characteristic: GattCharacteristic) {
        self.characteristics.push(characteristic);
    }
}

/// Options handed to the backend when creating an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppOptions {
    pub adapter_id: String,
    pub agent_capability: AgentCapability,
    /// Register the agent as the system default
    pub agent_set_as_default: bool,
    pub uuid_prefix: String,
    pub uuid_suffix: String,
}

impl AppOptions {
    pub fn new(adapter_id: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            agent_capability: AgentCapability::NoInputNoOutput,
            agent_set_as_default: true,
            uuid_prefix: UUID_PREFIX.to_string(),
            uuid_suffix: UUID_SUFFIX.to_string(),
        }
    }

    /// Full UUID for a 4-character slot
    pub fn slot_uuid(&self, slot: &str) -> String {
        format!("{}{}{}", self.uuid_prefix, slot, self.uuid_suffix)
    }
}

/// Build the single service/characteristic/descriptor tree
pub fn build_service_tree(options: &AppOptions) -> GattService {
    let mut service = GattService::new(options.slot_uuid(SERVICE_SLOT));

    let mut characteristic = GattCharacteristic::new(
        options.slot_uuid(CHARACTERISTIC_SLOT),
        AccessFlags::READ | AccessFlags::WRITE,
    );
    characteristic.add_descr(GattDescriptor::new(
        options.slot_uuid(DESCRIPTOR_SLOT),
        AccessFlags::READ | AccessFlags::WRITE,
    ));

    service.add_char(characteristic);
    service
}
