//! Discovery coordinator: backend lifecycle, registry ownership, persistence.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::device::{Device, Sighting};
use crate::discovery::{
    BroadcastBackend, DiscoveryBackend, DnssdProvider, MdnsBackend, Report, ResolverQueue,
    SimulatedBackend,
};
use crate::pool;
use crate::registry::Registry;
use crate::shortcuts::{self, Shortcut, ShortcutSource};
use crate::store::SettingsStore;

/// Callbacks delivered to the presentation layer.
///
/// Always invoked with the canonical, merged device, never a raw sighting.
/// Delivery happens on the coordinator's own tasks; implementations should
/// hand the event off rather than block.
pub trait HomeListener: Send + Sync {
    /// The previously selected device was recovered at session start.
    fn on_device_selected(&self, device: &Device);

    /// A device was detected or re-detected by some backend.
    fn on_device_detected(&self, device: &Device);

    /// Shortcuts for the detected box model were loaded.
    fn on_shortcuts_loaded(&self, shortcuts: &[Shortcut]) {
        let _ = shortcuts;
    }
}

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct HomeConfig {
    /// UDP port watched by the broadcast backend.
    pub broadcast_port: u16,
    /// Service type advertising the devices themselves.
    pub device_service: String,
    /// Service type carrying metadata-only gateway announcements.
    pub gateway_service: String,
    /// Script for the simulated backend; `None` leaves it out.
    pub simulated: Option<Vec<Sighting>>,
    /// Delay before the simulated backend replays its script.
    pub simulated_delay: Duration,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            broadcast_port: 24322,
            device_service: "_hid._udp".to_string(),
            gateway_service: "_fbx-api._tcp".to_string(),
            simulated: None,
            simulated_delay: Duration::from_millis(100),
        }
    }
}

enum State {
    Idle,
    Active,
}

/// Owns the registry and every discovery backend for one session.
///
/// `open` recovers the persisted pool and starts discovery; `close` stops
/// discovery, persists the pool and empties the registry. Both are no-ops
/// when the coordinator is already in the requested state.
pub struct Home {
    config: HomeConfig,
    provider: Arc<dyn DnssdProvider>,
    listener: Arc<dyn HomeListener>,
    store: Arc<dyn SettingsStore>,
    shortcuts: Option<Arc<dyn ShortcutSource>>,
    registry: Arc<Mutex<Registry>>,
    backends: Vec<Box<dyn DiscoveryBackend>>,
    drain: Option<JoinHandle<()>>,
    state: State,
}

impl Home {
    /// Create an idle coordinator.
    pub fn new(
        provider: Arc<dyn DnssdProvider>,
        listener: Arc<dyn HomeListener>,
        store: Arc<dyn SettingsStore>,
        config: HomeConfig,
    ) -> Self {
        Self {
            config,
            provider,
            listener,
            store,
            shortcuts: None,
            registry: Arc::new(Mutex::new(Registry::new())),
            backends: Vec::new(),
            drain: None,
            state: State::Idle,
        }
    }

    /// Configure the shortcut source consulted for gateway announcements.
    pub fn set_shortcut_source(&mut self, source: Arc<dyn ShortcutSource>) {
        self.shortcuts = Some(source);
    }

    /// Recover the persisted pool, then start every backend.
    ///
    /// Must be called inside a tokio runtime. A no-op when already active.
    pub fn open(&mut self) {
        if matches!(self.state, State::Active) {
            return;
        }
        self.state = State::Active;

        self.recover_saved();

        let (tx, rx) = mpsc::unbounded_channel();
        self.drain = Some(tokio::spawn(drain(
            rx,
            Arc::clone(&self.registry),
            Arc::clone(&self.listener),
            self.shortcuts.clone(),
            format!(".{}", self.config.gateway_service),
        )));

        let resolver = ResolverQueue::new(Arc::clone(&self.provider), tx.clone());
        let mut backends: Vec<Box<dyn DiscoveryBackend>> = vec![
            Box::new(BroadcastBackend::new(self.config.broadcast_port, tx.clone())),
            Box::new(MdnsBackend::new(
                self.config.device_service.clone(),
                Arc::clone(&self.provider),
                resolver.clone(),
            )),
            Box::new(MdnsBackend::new(
                self.config.gateway_service.clone(),
                Arc::clone(&self.provider),
                resolver,
            )),
        ];
        if let Some(script) = self.config.simulated.clone() {
            backends.push(Box::new(SimulatedBackend::new(
                script,
                self.config.simulated_delay,
                tx,
            )));
        }

        for backend in &mut backends {
            if let Err(e) = backend.start() {
                warn!(backend = backend.name(), error = %e, "backend failed to start");
            }
        }
        self.backends = backends;
    }

    /// Stop every backend, persist the pool, clear the registry.
    ///
    /// A no-op when already idle.
    pub fn close(&mut self) {
        if matches!(self.state, State::Idle) {
            return;
        }
        self.state = State::Idle;

        for backend in &mut self.backends {
            backend.stop();
        }
        self.backends.clear();
        // Reports still in flight must not reach the registry past this point.
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }

        let mut registry = self.registry.lock();
        self.store
            .store(pool::POOL_KEY, &pool::encode(registry.devices()));
        debug!(devices = registry.len(), "pool persisted");
        registry.clear();
    }

    /// Devices in first-seen order.
    pub fn devices(&self) -> Vec<Device> {
        self.registry.lock().devices().to_vec()
    }

    /// First reachable device after `of` in first-seen order.
    pub fn next_reachable(&self, of: &Device) -> Option<Device> {
        self.registry.lock().next_reachable(of).cloned()
    }

    /// Nearest reachable device before `of` in first-seen order.
    pub fn previous_reachable(&self, of: &Device) -> Option<Device> {
        self.registry.lock().previous_reachable(of).cloned()
    }

    /// Record `of` as the user-selected device for the next session.
    pub fn set_focus(&self, of: &Device) {
        self.registry.lock().set_focus(of);
    }

    fn recover_saved(&mut self) {
        let Some(raw) = self.store.load(pool::POOL_KEY) else {
            return;
        };
        let recovered = pool::decode(&raw);

        let mut focus: Option<Device> = None;
        for device in &recovered {
            if device.has_focus() || focus.is_none() {
                focus = Some(device.clone());
            }
        }

        let mut registry = self.registry.lock();
        for device in recovered {
            registry.recover(device);
        }
        debug!(devices = registry.len(), "recovered saved pool");
        let selected = focus.and_then(|focus| {
            registry
                .devices()
                .iter()
                .find(|device| device.same_identity(&focus))
                .cloned()
        });
        drop(registry);

        if let Some(device) = selected {
            self.listener.on_device_selected(&device);
        }
    }
}

impl Drop for Home {
    fn drop(&mut self) {
        for backend in &mut self.backends {
            backend.stop();
        }
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
    }
}

/// Single consumer of every backend's reports; the only registry writer.
async fn drain(
    rx: mpsc::UnboundedReceiver<Report>,
    registry: Arc<Mutex<Registry>>,
    listener: Arc<dyn HomeListener>,
    shortcuts: Option<Arc<dyn ShortcutSource>>,
    gateway_marker: String,
) {
    let mut reports = UnboundedReceiverStream::new(rx);
    while let Some(report) = reports.next().await {
        let sighting = report.sighting;
        if sighting.description_contains(&gateway_marker) {
            configure_shortcuts(&sighting, shortcuts.as_deref(), listener.as_ref());
            continue;
        }

        let outcome = registry.lock().merge(sighting);
        debug!(
            source = report.source,
            address = %outcome.device.address(),
            port = outcome.device.port(),
            new = outcome.is_new,
            "device detected"
        );
        listener.on_device_detected(&outcome.device);
    }
}

fn configure_shortcuts(
    sighting: &Sighting,
    source: Option<&dyn ShortcutSource>,
    listener: &dyn HomeListener,
) {
    let Some(source) = source else {
        return;
    };
    let Some(model) = sighting.description_field("box_model") else {
        debug!("gateway announcement without box_model");
        return;
    };
    debug!(model = %model, "gateway announcement");

    let family = shortcuts::model_family(&model);
    match source.load(family).and_then(|raw| shortcuts::parse(&raw)) {
        Ok(loaded) if !loaded.is_empty() => listener.on_shortcuts_loaded(&loaded),
        Ok(_) => debug!(model = %model, "no shortcuts"),
        Err(e) => debug!(model = %model, error = %e, "no shortcuts"),
    }
}
