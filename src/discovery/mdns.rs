//! Service-discovery backend over the DNS-SD provider capability.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::error::Result;

use super::dnssd::DnssdProvider;
use super::resolver::ResolverQueue;
use super::DiscoveryBackend;

const SOURCE: &str = "dns-sd";

/// Watches one service type through the shared DNS-SD provider.
///
/// Advertisements matching the service type are funneled into the shared
/// [`ResolverQueue`]; resolved services come out the queue's sink as
/// sightings.
pub struct MdnsBackend {
    service_type: String,
    provider: Arc<dyn DnssdProvider>,
    resolver: ResolverQueue,
    pump: Option<JoinHandle<()>>,
}

impl MdnsBackend {
    /// Create a backend watching `service_type`.
    pub fn new(
        service_type: impl Into<String>,
        provider: Arc<dyn DnssdProvider>,
        resolver: ResolverQueue,
    ) -> Self {
        Self {
            service_type: service_type.into(),
            provider,
            resolver,
            pump: None,
        }
    }
}

impl DiscoveryBackend for MdnsBackend {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn start(&mut self) -> Result<()> {
        if self.pump.is_some() {
            return Ok(());
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.provider.start_browse(&self.service_type, tx)?;

        let service_type = self.service_type.clone();
        let resolver = self.resolver.clone();
        self.pump = Some(tokio::spawn(async move {
            let mut found = UnboundedReceiverStream::new(rx);
            while let Some(service) = found.next().await {
                // Advertisements for sub-types still carry our prefix.
                if !service.service_type.starts_with(&service_type) {
                    continue;
                }
                debug!(service = %service.fullname, "dns-sd: service found");
                resolver.submit(service);
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(pump) = self.pump.take() {
            self.provider.stop_browse(&self.service_type);
            pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::super::dnssd::{FoundService, ResolvedService};
    use super::*;
    use crate::error::Error;

    /// Provider emitting a fixed advertisement list on every browse.
    struct CannedProvider {
        services: Vec<FoundService>,
    }

    #[async_trait]
    impl DnssdProvider for CannedProvider {
        fn start_browse(
            &self,
            _service_type: &str,
            found: mpsc::UnboundedSender<FoundService>,
        ) -> Result<()> {
            for service in &self.services {
                let _ = found.send(service.clone());
            }
            Ok(())
        }

        fn stop_browse(&self, _service_type: &str) {}

        async fn resolve(&self, found: &FoundService) -> Result<ResolvedService> {
            if found.fullname.starts_with("gone") {
                return Err(Error::resolve("gone"));
            }
            Ok(ResolvedService {
                address: "192.168.1.9".into(),
                port: 24322,
                descriptor: format!("fullname={}", found.fullname),
            })
        }
    }

    #[tokio::test]
    async fn foreign_service_types_are_filtered_out() {
        let provider = Arc::new(CannedProvider {
            services: vec![
                FoundService {
                    service_type: "_hid._udp.local.".into(),
                    fullname: "Player._hid._udp.local.".into(),
                },
                FoundService {
                    service_type: "_printer._tcp.local.".into(),
                    fullname: "Printer._printer._tcp.local.".into(),
                },
            ],
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let resolver = ResolverQueue::new(provider.clone(), tx);
        let mut backend = MdnsBackend::new("_hid._udp", provider, resolver);
        backend.start().unwrap();

        let report = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no sighting")
            .expect("sink closed");
        assert_eq!(report.source, "dns-sd");
        assert!(report
            .sighting
            .descriptor
            .contains("Player._hid._udp.local."));

        // The printer advertisement never makes it through.
        assert!(
            tokio::time::timeout(Duration::from_millis(200), rx.recv())
                .await
                .is_err()
        );

        backend.stop();
        backend.stop();
    }
}
