//! Broadcast-probe backend: watches a fixed UDP port for announcements.

use serde::Deserialize;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::device::Sighting;
use crate::error::Result;

use super::{DiscoveryBackend, Report, SightingSink};

const SOURCE: &str = "broadcast";
const MAX_PACKET: usize = 2048;

/// Announcement packet sent by devices on the probe port.
///
/// Every field is optional; the sender address fills the gaps.
#[derive(Debug, Deserialize)]
struct Announcement {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

impl Announcement {
    fn descriptor(&self) -> String {
        let mut parts = vec!["source=broadcast".to_string()];
        if let Some(name) = &self.name {
            parts.push(format!("name={name}"));
        }
        if let Some(model) = &self.model {
            parts.push(format!("box_model={model}"));
        }
        parts.join(", ")
    }
}

/// Watches a fixed UDP port for device announcements.
///
/// `start` spawns the listener task; `stop` aborts it. Unreadable packets
/// and receive errors are logged and skipped.
pub struct BroadcastBackend {
    port: u16,
    sink: SightingSink,
    listener: Option<JoinHandle<()>>,
}

impl BroadcastBackend {
    /// Create a backend listening on `port`.
    pub fn new(port: u16, sink: SightingSink) -> Self {
        Self {
            port,
            sink,
            listener: None,
        }
    }

    async fn listen(port: u16, sink: SightingSink) {
        let socket = match UdpSocket::bind(("0.0.0.0", port)).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!(port, error = %e, "broadcast: bind failed, backend going silent");
                return;
            }
        };
        debug!(port, "broadcast: listening");

        let mut buf = vec![0u8; MAX_PACKET];
        loop {
            let (len, peer) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "broadcast: receive failed");
                    continue;
                }
            };
            let announcement: Announcement = match serde_json::from_slice(&buf[..len]) {
                Ok(announcement) => announcement,
                Err(e) => {
                    debug!(%peer, error = %e, "broadcast: unreadable announcement");
                    continue;
                }
            };
            let sighting = Sighting {
                address: peer.ip().to_string(),
                port: announcement.port.unwrap_or(port),
                descriptor: announcement.descriptor(),
            };
            debug!(address = %sighting.address, port = sighting.port, "broadcast: announcement");
            if sink
                .send(Report {
                    sighting,
                    source: SOURCE,
                })
                .is_err()
            {
                return;
            }
        }
    }
}

impl DiscoveryBackend for BroadcastBackend {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn start(&mut self) -> Result<()> {
        if self.listener.is_some() {
            return Ok(());
        }
        let (port, sink) = (self.port, self.sink.clone());
        self.listener = Some(tokio::spawn(Self::listen(port, sink)));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
