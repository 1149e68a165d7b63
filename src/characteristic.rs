use std::collections::HashMap;
use std::fmt;

use btleplug::api::CharPropFlags;
use uuid::Uuid;

use crate::common::Service;
use crate::{Error, Result};

/// A characteristic as enumerated on a connected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub service_uuid: Uuid,
    /// Handle used for reads and writes while the connection lasts.
    pub value_handle: u16,
    pub properties: CharPropFlags,
}

/// Value handles of the registered services for one connection.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HandleTable {
    handles: HashMap<Service, u16>,
}

impl HandleTable {
    /// Handle of the given service
    pub fn get(&self, service: Service) -> Result<u16> {
        self.handles
            .get(&service)
            .copied()
            .ok_or(Error::MissingCharacteristic(service))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Service, u16)> + '_ {
        self.handles.iter().map(|(service, handle)| (*service, *handle))
    }
}

impl fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort();
        f.debug_map()
            .entries(entries.iter().map(|(s, h)| (s.name(), format!("{h:#06x}"))))
            .finish()
    }
}

/// Resolves a handle for every registry entry.
///
/// When several characteristics share a UUID the first one enumerated wins.
/// Fails on the first registry entry that has no matching characteristic.
pub fn build_handle_table(
    characteristics: &[CharacteristicInfo],
    registry: &[(Service, Uuid)],
) -> Result<HandleTable> {
    let mut first_by_uuid: HashMap<Uuid, u16> = HashMap::new();
    for characteristic in characteristics {
        first_by_uuid
            .entry(characteristic.uuid)
            .or_insert(characteristic.value_handle);
    }

    let mut handles = HashMap::with_capacity(registry.len());
    for (service, uuid) in registry {
        let handle = first_by_uuid
            .get(uuid)
            .copied()
            .ok_or(Error::MissingCharacteristic(*service))?;
        handles.insert(*service, handle);
    }

    Ok(HandleTable { handles })
}
