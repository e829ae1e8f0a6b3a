//! The canonical, ordered, deduplicated device registry.

use crate::device::{Device, Sighting};
use crate::palette::Palette;

/// Result of merging one sighting into the registry.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The canonical device after the merge.
    pub device: Device,
    /// Whether the sighting created a new registry entry.
    pub is_new: bool,
}

/// Ordered list of known devices, deduplicated by identity.
///
/// Devices keep their first-seen position for the lifetime of the registry;
/// navigation walks that order, not any sort over addresses.
pub struct Registry {
    devices: Vec<Device>,
    palette: Palette,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            palette: Palette::new(),
        }
    }

    /// Merge one sighting.
    ///
    /// A sighting for a known identity updates that device's descriptor and
    /// marks it reachable; its position and color are untouched. A sighting
    /// for a fresh identity gets the next palette color and is appended.
    pub fn merge(&mut self, sighting: Sighting) -> MergeOutcome {
        if let Some(existing) = self.devices.iter_mut().find(|d| d.matches(&sighting)) {
            existing.set_descriptor(sighting.descriptor);
            existing.set_reachable(true);
            return MergeOutcome {
                device: existing.clone(),
                is_new: false,
            };
        }

        let mut device = Device::new(sighting.address, sighting.port, sighting.descriptor);
        device.set_reachable(true);
        if device.color().is_none() {
            device.set_color(self.palette.acquire());
        }
        self.devices.push(device.clone());
        MergeOutcome {
            device,
            is_new: true,
        }
    }

    /// Install a device recovered from persisted state.
    ///
    /// Its color is reserved in the palette, identity duplicates are dropped,
    /// and it enters the list unreachable: only a live sighting makes a
    /// device reachable again.
    pub fn recover(&mut self, mut device: Device) {
        if self.devices.iter().any(|d| d.same_identity(&device)) {
            return;
        }
        if let Some(color) = device.color() {
            self.palette.reserve(color);
        }
        device.set_reachable(false);
        self.devices.push(device);
    }

    /// First reachable device strictly after `of` in insertion order.
    ///
    /// `None` when `of` is the last entry, has no reachable successor, or is
    /// not in the list at all.
    pub fn next_reachable(&self, of: &Device) -> Option<&Device> {
        let mut found = false;
        for device in &self.devices {
            if found && device.reachable() {
                return Some(device);
            }
            if device.same_identity(of) {
                found = true;
            }
        }
        None
    }

    /// Last reachable device strictly before `of` in insertion order.
    ///
    /// When `of` is not in the list the scan runs to the end, so the last
    /// reachable device overall is returned.
    pub fn previous_reachable(&self, of: &Device) -> Option<&Device> {
        let mut previous = None;
        for device in &self.devices {
            if device.same_identity(of) {
                break;
            }
            if device.reachable() {
                previous = Some(device);
            }
        }
        previous
    }

    /// Mark `of` as the focused device, clearing focus everywhere else.
    pub fn set_focus(&mut self, of: &Device) {
        for device in &mut self.devices {
            let focused = device.same_identity(of);
            device.set_focus(focused);
        }
    }

    /// Devices in first-seen order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Number of known devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True when no devices are known.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Remove every device.
    pub fn clear(&mut self) {
        self.devices.clear();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
