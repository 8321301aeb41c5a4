//! Discovery results for the CX endpoint service.
//!
//! The GATT discovery procedure of the transport produces one
//! [`DiscoveredService`] per matching primary service. Each characteristic
//! lists its attributes in handle order: the value attribute carries the
//! characteristic's own UUID, descriptors carry theirs (e.g. the CCC).

use heapless::Vec;

use super::{AttHandle, ConnectionRef};

/// Characteristics kept per discovered service.
pub const MAX_CHARACTERISTICS: usize = 8;
/// Attributes (value + descriptors) kept per characteristic.
pub const MAX_ATTRIBUTES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveredAttribute {
    pub uuid: u128,
    pub handle: AttHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCharacteristic {
    pub uuid: u128,
    pub attributes: Vec<DiscoveredAttribute, MAX_ATTRIBUTES>,
}

impl DiscoveredCharacteristic {
    pub fn new(uuid: u128) -> Self {
        Self {
            uuid,
            attributes: Vec::new(),
        }
    }

    /// Builder-style helper; attributes past capacity are dropped.
    #[must_use]
    pub fn with_attribute(mut self, uuid: u128, handle: u16) -> Self {
        let _ = self.attributes.push(DiscoveredAttribute {
            uuid,
            handle: AttHandle(handle),
        });
        self
    }

    pub fn attribute(&self, uuid: u128) -> Option<AttHandle> {
        self.attributes
            .iter()
            .find(|a| a.uuid == uuid)
            .map(|a| a.handle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    pub uuid: u128,
    /// Link the discovery ran on.
    pub conn: ConnectionRef,
    pub characteristics: Vec<DiscoveredCharacteristic, MAX_CHARACTERISTICS>,
}

impl DiscoveredService {
    pub fn new(uuid: u128, conn: ConnectionRef) -> Self {
        Self {
            uuid,
            conn,
            characteristics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_characteristic(mut self, chrc: DiscoveredCharacteristic) -> Self {
        let _ = self.characteristics.push(chrc);
        self
    }

    pub fn characteristic(&self, uuid: u128) -> Option<&DiscoveredCharacteristic> {
        self.characteristics.iter().find(|c| c.uuid == uuid)
    }
}
