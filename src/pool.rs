//! Persistence codec for the device pool.
//!
//! The pool is one opaque string: a JSON array of device records in registry
//! order. Decoding is tolerant on every level. A malformed blob yields an
//! empty pool and a malformed record is skipped, so a damaged store costs
//! saved devices, never a crash.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::device::Device;

/// Settings key under which the encoded pool is stored.
pub const POOL_KEY: &str = "freebox_pool";

#[derive(Debug, Serialize, Deserialize)]
struct PoolRecord {
    address: String,
    port: u16,
    #[serde(default)]
    descriptor: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    reachable: bool,
    #[serde(default)]
    focus: bool,
}

impl From<&Device> for PoolRecord {
    fn from(device: &Device) -> Self {
        Self {
            address: device.address().to_string(),
            port: device.port(),
            descriptor: device.descriptor().to_string(),
            color: device.color().map(str::to_string),
            reachable: device.reachable(),
            focus: device.has_focus(),
        }
    }
}

impl From<PoolRecord> for Device {
    fn from(record: PoolRecord) -> Self {
        Device::from_parts(
            record.address,
            record.port,
            record.descriptor,
            record.color,
            record.reachable,
            record.focus,
        )
    }
}

/// Serialize `devices` into a pool blob, skipping inconsistent entries.
pub fn encode(devices: &[Device]) -> String {
    let records: Vec<PoolRecord> = devices
        .iter()
        .filter(|device| device.is_consistent())
        .map(PoolRecord::from)
        .collect();
    match serde_json::to_string(&records) {
        Ok(blob) => blob,
        Err(e) => {
            warn!(error = %e, "failed to encode device pool");
            "[]".to_string()
        }
    }
}

/// Parse a pool blob back into devices, in saved order.
///
/// An empty or malformed blob yields no devices; records that fail to parse
/// or fail the consistency check are dropped and the rest are kept.
pub fn decode(raw: &str) -> Vec<Device> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let entries: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "malformed device pool, starting empty");
            return Vec::new();
        }
    };

    let mut devices = Vec::new();
    for entry in entries {
        match serde_json::from_value::<PoolRecord>(entry) {
            Ok(record) => {
                let device = Device::from(record);
                if device.is_consistent() {
                    devices.push(device);
                } else {
                    debug!("skipping inconsistent pool record");
                }
            }
            Err(e) => debug!(error = %e, "skipping unreadable pool record"),
        }
    }
    devices
}
