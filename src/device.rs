//! Sighting and device data model.

/// A raw, possibly duplicate, possibly incomplete report of a device's
/// presence from one discovery backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    /// Network address the device was seen at.
    pub address: String,
    /// Port the device listens on.
    pub port: u16,
    /// Protocol-specific descriptor text, a loose set of `name=value` fields.
    pub descriptor: String,
}

impl Sighting {
    /// Substring test over the descriptor text.
    pub fn description_contains(&self, needle: &str) -> bool {
        self.descriptor.contains(needle)
    }

    /// Extract a `name=value` field from the descriptor text.
    pub fn description_field(&self, name: &str) -> Option<String> {
        descriptor_field(&self.descriptor, name)
    }
}

/// A canonical, identity-stable entry in the registry.
///
/// Identity is `(address, port)`. The descriptor is a superset of
/// protocol-specific metadata and plays no part in identity; neither does the
/// color, which is assigned once by the registry and kept for the device's
/// whole lifetime, persistence round-trips included.
#[derive(Debug, Clone)]
pub struct Device {
    address: String,
    port: u16,
    descriptor: String,
    color: Option<String>,
    reachable: bool,
    focus: bool,
}

impl Device {
    pub(crate) fn new(address: String, port: u16, descriptor: String) -> Self {
        Self {
            address,
            port,
            descriptor,
            color: None,
            reachable: false,
            focus: false,
        }
    }

    pub(crate) fn from_parts(
        address: String,
        port: u16,
        descriptor: String,
        color: Option<String>,
        reachable: bool,
        focus: bool,
    ) -> Self {
        Self {
            address,
            port,
            descriptor,
            color,
            reachable,
            focus,
        }
    }

    /// Network address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Port the device listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Descriptor text as last reported.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Color assigned by the registry, if any.
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Whether the device has been seen in the current session.
    pub fn reachable(&self) -> bool {
        self.reachable
    }

    /// Whether this was the user-selected device when the pool was saved.
    pub fn has_focus(&self) -> bool {
        self.focus
    }

    /// True when `other` names the same device.
    pub fn same_identity(&self, other: &Device) -> bool {
        self.address == other.address && self.port == other.port
    }

    pub(crate) fn matches(&self, sighting: &Sighting) -> bool {
        self.address == sighting.address && self.port == sighting.port
    }

    /// Substring test over the descriptor text.
    pub fn description_contains(&self, needle: &str) -> bool {
        self.descriptor.contains(needle)
    }

    /// Extract a `name=value` field from the descriptor text.
    pub fn description_field(&self, name: &str) -> Option<String> {
        descriptor_field(&self.descriptor, name)
    }

    /// A device record is usable when it has an address and a port.
    pub fn is_consistent(&self) -> bool {
        !self.address.is_empty() && self.port != 0
    }

    pub(crate) fn set_descriptor(&mut self, descriptor: String) {
        self.descriptor = descriptor;
    }

    pub(crate) fn set_color(&mut self, color: String) {
        self.color = Some(color);
    }

    pub(crate) fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    pub(crate) fn set_focus(&mut self, focus: bool) {
        self.focus = focus;
    }
}

/// Fields are `name=value` tokens delimited by commas or whitespace.
fn descriptor_field(descriptor: &str, name: &str) -> Option<String> {
    let pattern = format!("{name}=");
    let start = descriptor.find(&pattern)? + pattern.len();
    let rest = &descriptor[start..];
    let end = rest
        .find([',', ' ', '\t', '\n'])
        .unwrap_or(rest.len());
    let value = &rest[..end];
    (!value.is_empty()).then(|| value.to_string())
}
