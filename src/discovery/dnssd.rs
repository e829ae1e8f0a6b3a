//! DNS-SD provider capability and the mdns-sd adapter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::device::Sighting;
use crate::error::{Error, Result};

/// A service advertisement noticed by the provider, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundService {
    /// Service type the advertisement belongs to.
    pub service_type: String,
    /// Full instance name of the advertisement.
    pub fullname: String,
}

/// Concrete address information for a resolved service.
#[derive(Debug, Clone)]
pub struct ResolvedService {
    /// Host address.
    pub address: String,
    /// Service port.
    pub port: u16,
    /// Descriptor text assembled from the resolved advertisement.
    pub descriptor: String,
}

impl From<ResolvedService> for Sighting {
    fn from(resolved: ResolvedService) -> Self {
        Sighting {
            address: resolved.address,
            port: resolved.port,
            descriptor: resolved.descriptor,
        }
    }
}

/// Platform DNS-SD capability.
///
/// One provider instance is created per session and shared by every
/// service-discovery backend. `resolve` is only ever issued with a single
/// request in flight at a time; implementations may rely on that.
#[async_trait]
pub trait DnssdProvider: Send + Sync {
    /// Begin watching `service_type`, delivering advertisements into `found`.
    fn start_browse(
        &self,
        service_type: &str,
        found: mpsc::UnboundedSender<FoundService>,
    ) -> Result<()>;

    /// Stop watching `service_type`. Idempotent.
    fn stop_browse(&self, service_type: &str);

    /// Resolve an advertisement to a concrete address and port.
    async fn resolve(&self, found: &FoundService) -> Result<ResolvedService>;
}

/// [`DnssdProvider`] backed by an [`mdns_sd::ServiceDaemon`].
///
/// Browse events are pumped into found notifications; resolutions observed
/// from the daemon are cached by fullname, and `resolve` awaits the cache
/// entry with a timeout.
pub struct MdnsSdProvider {
    daemon: ServiceDaemon,
    resolved: Arc<Mutex<HashMap<String, ResolvedService>>>,
    pumps: Mutex<HashMap<String, JoinHandle<()>>>,
    resolve_timeout: Duration,
}

impl MdnsSdProvider {
    /// Spin up the daemon.
    pub fn new() -> Result<Self> {
        Ok(Self {
            daemon: ServiceDaemon::new()?,
            resolved: Arc::new(Mutex::new(HashMap::new())),
            pumps: Mutex::new(HashMap::new()),
            resolve_timeout: Duration::from_secs(10),
        })
    }

    /// Override the resolution timeout. Default: 10 seconds.
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    // mdns-sd wants fully qualified service types.
    fn qualified(service_type: &str) -> String {
        if service_type.ends_with(".local.") {
            service_type.to_string()
        } else {
            format!("{service_type}.local.")
        }
    }
}

#[async_trait]
impl DnssdProvider for MdnsSdProvider {
    fn start_browse(
        &self,
        service_type: &str,
        found: mpsc::UnboundedSender<FoundService>,
    ) -> Result<()> {
        let qualified = Self::qualified(service_type);
        let events = self.daemon.browse(&qualified)?;
        let resolved = Arc::clone(&self.resolved);

        let pump = tokio::spawn(async move {
            while let Ok(event) = events.recv_async().await {
                match event {
                    ServiceEvent::ServiceFound(service_type, fullname) => {
                        trace!(service = %fullname, "dns-sd: advertisement");
                        if found
                            .send(FoundService {
                                service_type,
                                fullname,
                            })
                            .is_err()
                        {
                            break;
                        }
                    }
                    ServiceEvent::ServiceResolved(info) => {
                        if let Some(service) = flatten(&info) {
                            resolved
                                .lock()
                                .insert(info.get_fullname().to_string(), service);
                        }
                    }
                    ServiceEvent::ServiceRemoved(_, fullname) => {
                        debug!(service = %fullname, "dns-sd: advertisement lost");
                    }
                    other => trace!(?other, "dns-sd: event"),
                }
            }
        });
        if let Some(old) = self.pumps.lock().insert(qualified, pump) {
            old.abort();
        }
        Ok(())
    }

    fn stop_browse(&self, service_type: &str) {
        let qualified = Self::qualified(service_type);
        if let Err(e) = self.daemon.stop_browse(&qualified) {
            debug!(service_type, error = %e, "dns-sd: stop browse");
        }
        if let Some(pump) = self.pumps.lock().remove(&qualified) {
            pump.abort();
        }
    }

    async fn resolve(&self, found: &FoundService) -> Result<ResolvedService> {
        let deadline = tokio::time::Instant::now() + self.resolve_timeout;
        let mut tick = tokio::time::interval(Duration::from_millis(50));
        loop {
            if let Some(service) = self.resolved.lock().get(&found.fullname).cloned() {
                return Ok(service);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::resolve(format!(
                    "{} did not resolve in time",
                    found.fullname
                )));
            }
            tick.tick().await;
        }
    }
}

impl Drop for MdnsSdProvider {
    fn drop(&mut self) {
        for (_, pump) in self.pumps.lock().drain() {
            pump.abort();
        }
        let _ = self.daemon.shutdown();
    }
}

/// Flatten a resolved advertisement into address, port and descriptor text.
fn flatten(info: &ServiceInfo) -> Option<ResolvedService> {
    let address = info.get_addresses().iter().next()?.to_string();
    let mut descriptor = format!(
        "fullname={}, type={}, host={}, port={}",
        info.get_fullname(),
        info.get_type(),
        info.get_hostname(),
        info.get_port(),
    );
    for property in info.get_properties().iter() {
        descriptor.push_str(&format!(", {}={}", property.key(), property.val_str()));
    }
    Some(ResolvedService {
        address,
        port: info.get_port(),
        descriptor,
    })
}
