//! Multi-backend discovery of set-top boxes on the local network.
//!
//! Three discovery mechanisms run concurrently: a UDP broadcast probe, DNS-SD
//! service discovery through a platform provider, and a simulated backend for
//! environments without either. Their sightings are merged into one ordered,
//! deduplicated registry that assigns each device a stable color, answers
//! neighbor-navigation queries, and round-trips through a key-value store
//! across sessions.
//!
//! [`Home`] ties it together: it owns the registry and every backend, bridges
//! their reports into registry updates, and notifies a [`HomeListener`] of
//! selection and detection events.

#![deny(missing_docs)]

pub mod device;
pub mod discovery;
pub mod error;
pub mod home;
mod palette;
pub mod pool;
pub mod registry;
pub mod shortcuts;
pub mod store;

// Re-export key types
pub use device::{Device, Sighting};
pub use error::{Error, Result};
pub use home::{Home, HomeConfig, HomeListener};
pub use registry::{MergeOutcome, Registry};
pub use store::{FileStore, MemoryStore, SettingsStore};
