//! Pluggable discovery backends and their shared event types.

mod broadcast;
mod dnssd;
mod mdns;
mod resolver;
mod simulated;

pub use broadcast::BroadcastBackend;
pub use dnssd::{DnssdProvider, FoundService, MdnsSdProvider, ResolvedService};
pub use mdns::MdnsBackend;
pub use resolver::ResolverQueue;
pub use simulated::SimulatedBackend;

use tokio::sync::mpsc;

use crate::device::Sighting;
use crate::error::Result;

/// A sighting tagged with the backend that produced it.
#[derive(Debug, Clone)]
pub struct Report {
    /// The sighting itself.
    pub sighting: Sighting,
    /// Name of the backend that produced it.
    pub source: &'static str,
}

/// Channel end backends push their reports into.
pub type SightingSink = mpsc::UnboundedSender<Report>;

/// A discovery mechanism watching for devices.
///
/// Implementations report every candidate device through their sink, possibly
/// repeatedly for the same device; the consumer deduplicates. Within one
/// backend reports arrive in discovery order; across backends there is no
/// ordering at all.
pub trait DiscoveryBackend: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Begin watching asynchronously.
    ///
    /// A failure here means zero sightings from this backend and nothing
    /// more; the session carries on with the rest.
    fn start(&mut self) -> Result<()>;

    /// Stop watching and release provider resources.
    ///
    /// Idempotent, and safe to call when `start` failed or never ran.
    fn stop(&mut self);
}
