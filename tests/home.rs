use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use boxscout::discovery::{DnssdProvider, FoundService, ResolvedService};
use boxscout::shortcuts::{DirShortcutSource, Shortcut};
use boxscout::{Device, Home, HomeConfig, HomeListener, MemoryStore, SettingsStore, Sighting};

/// Records every callback for later assertions.
#[derive(Default)]
struct Recorder {
    selected: Mutex<Vec<Device>>,
    detected: Mutex<Vec<Device>>,
    shortcuts: Mutex<Vec<Vec<Shortcut>>>,
}

impl HomeListener for Recorder {
    fn on_device_selected(&self, device: &Device) {
        self.selected.lock().push(device.clone());
    }

    fn on_device_detected(&self, device: &Device) {
        self.detected.lock().push(device.clone());
    }

    fn on_shortcuts_loaded(&self, shortcuts: &[Shortcut]) {
        self.shortcuts.lock().push(shortcuts.to_vec());
    }
}

/// Provider replaying canned advertisements for whatever types are browsed.
struct ScriptedProvider {
    entries: Vec<(FoundService, ResolvedService)>,
}

impl ScriptedProvider {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

#[async_trait]
impl DnssdProvider for ScriptedProvider {
    fn start_browse(
        &self,
        service_type: &str,
        found: mpsc::UnboundedSender<FoundService>,
    ) -> boxscout::Result<()> {
        for (service, _) in &self.entries {
            if service.service_type.starts_with(service_type) {
                let _ = found.send(service.clone());
            }
        }
        Ok(())
    }

    fn stop_browse(&self, _service_type: &str) {}

    async fn resolve(&self, found: &FoundService) -> boxscout::Result<ResolvedService> {
        self.entries
            .iter()
            .find(|(service, _)| service.fullname == found.fullname)
            .map(|(_, resolved)| resolved.clone())
            .ok_or_else(|| boxscout::Error::resolve("unknown service"))
    }
}

/// Quiet config: ephemeral broadcast port, no simulated backend.
fn quiet_config() -> HomeConfig {
    HomeConfig {
        broadcast_port: 0,
        ..HomeConfig::default()
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached in time");
}

#[test_log::test(tokio::test)]
async fn recovered_focus_fires_exactly_one_selected_event() {
    let store = Arc::new(MemoryStore::new());
    store.store(
        boxscout::pool::POOL_KEY,
        r#"[{"address":"192.168.1.1","port":80,"descriptor":"","color":"red","reachable":true,"focus":true}]"#,
    );
    let recorder = Arc::new(Recorder::default());
    let mut home = Home::new(
        Arc::new(ScriptedProvider::empty()),
        recorder.clone(),
        store,
        quiet_config(),
    );

    home.open();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let selected = recorder.selected.lock().clone();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].address(), "192.168.1.1");
    assert_eq!(selected[0].port(), 80);
    assert_eq!(selected[0].color(), Some("red"));
    assert!(
        !selected[0].reachable(),
        "a recovered device is unreachable until re-seen"
    );
    assert!(recorder.detected.lock().is_empty());

    home.close();
}

#[test_log::test(tokio::test)]
async fn first_recovered_device_is_selected_when_none_has_focus() {
    let store = Arc::new(MemoryStore::new());
    store.store(
        boxscout::pool::POOL_KEY,
        r#"[
            {"address":"192.168.1.1","port":80,"descriptor":""},
            {"address":"192.168.1.2","port":80,"descriptor":""}
        ]"#,
    );
    let recorder = Arc::new(Recorder::default());
    let mut home = Home::new(
        Arc::new(ScriptedProvider::empty()),
        recorder.clone(),
        store,
        quiet_config(),
    );

    home.open();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let selected = recorder.selected.lock().clone();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].address(), "192.168.1.1");

    home.close();
}

#[test_log::test(tokio::test)]
async fn simulated_discovery_persists_and_recovers_with_stable_colors() {
    let store = Arc::new(MemoryStore::new());
    let recorder = Arc::new(Recorder::default());
    let config = HomeConfig {
        simulated: Some(vec![
            Sighting {
                address: "10.0.0.1".into(),
                port: 80,
                descriptor: "name=one".into(),
            },
            Sighting {
                address: "10.0.0.2".into(),
                port: 80,
                descriptor: "name=two".into(),
            },
        ]),
        simulated_delay: Duration::from_millis(10),
        ..quiet_config()
    };
    let mut home = Home::new(
        Arc::new(ScriptedProvider::empty()),
        recorder.clone(),
        store.clone(),
        config,
    );

    home.open();
    wait_until(|| recorder.detected.lock().len() >= 2).await;

    let devices = home.devices();
    assert_eq!(devices.len(), 2);
    let colors: Vec<String> = devices
        .iter()
        .map(|d| d.color().expect("color assigned").to_string())
        .collect();
    assert_ne!(colors[0], colors[1]);
    assert!(devices.iter().all(|d| d.reachable()));

    home.set_focus(&devices[1]);
    home.close();
    assert!(home.devices().is_empty());

    let saved = store.load(boxscout::pool::POOL_KEY).expect("pool saved");
    assert_eq!(boxscout::pool::decode(&saved).len(), 2);

    // Second session: recovery first, then re-detection by the same script.
    home.open();
    wait_until(|| recorder.selected.lock().len() == 1).await;
    {
        let selected = recorder.selected.lock().clone();
        assert_eq!(selected[0].address(), "10.0.0.2");
        assert_eq!(selected[0].color().unwrap(), colors[1]);
        assert!(!selected[0].reachable());
    }

    wait_until(|| home.devices().iter().all(|d| d.reachable())).await;
    let recovered: Vec<String> = home
        .devices()
        .iter()
        .map(|d| d.color().unwrap().to_string())
        .collect();
    assert_eq!(recovered, colors, "colors survive the round trip");

    home.close();
}

#[test_log::test(tokio::test)]
async fn same_identity_from_two_backends_merges_into_one_device() {
    let provider = ScriptedProvider {
        entries: vec![(
            FoundService {
                service_type: "_hid._udp.local.".into(),
                fullname: "Player._hid._udp.local.".into(),
            },
            ResolvedService {
                address: "10.0.0.9".into(),
                port: 80,
                descriptor: "fullname=Player._hid._udp.local., name=mdns".into(),
            },
        )],
    };
    let recorder = Arc::new(Recorder::default());
    let config = HomeConfig {
        simulated: Some(vec![Sighting {
            address: "10.0.0.9".into(),
            port: 80,
            descriptor: "name=sim".into(),
        }]),
        simulated_delay: Duration::from_millis(10),
        ..quiet_config()
    };
    let mut home = Home::new(
        Arc::new(provider),
        recorder.clone(),
        Arc::new(MemoryStore::new()),
        config,
    );

    home.open();
    wait_until(|| recorder.detected.lock().len() >= 2).await;

    let devices = home.devices();
    assert_eq!(devices.len(), 1, "one identity, one device");
    assert!(
        devices[0].description_contains("mdns") || devices[0].description_contains("sim"),
        "descriptor comes from whichever report merged last"
    );

    home.close();
}

#[test_log::test(tokio::test)]
async fn gateway_announcements_configure_shortcuts_without_joining_the_pool() {
    let assets = tempfile::tempdir().expect("tempdir");
    let family = assets.path().join("fbx8am");
    std::fs::create_dir(&family).expect("family dir");
    std::fs::write(
        family.join("shortcuts.json"),
        r#"[{"power":"0x01,0x77"},{"mute":""}]"#,
    )
    .expect("shortcuts file");

    let provider = ScriptedProvider {
        entries: vec![(
            FoundService {
                service_type: "_fbx-api._tcp.local.".into(),
                fullname: "Server._fbx-api._tcp.local.".into(),
            },
            ResolvedService {
                address: "192.168.1.254".into(),
                port: 80,
                descriptor: "fullname=Server._fbx-api._tcp.local., box_model=fbx8am-r1".into(),
            },
        )],
    };
    let recorder = Arc::new(Recorder::default());
    let mut home = Home::new(
        Arc::new(provider),
        recorder.clone(),
        Arc::new(MemoryStore::new()),
        quiet_config(),
    );
    home.set_shortcut_source(Arc::new(DirShortcutSource::new(assets.path())));

    home.open();
    wait_until(|| !recorder.shortcuts.lock().is_empty()).await;

    let loaded = recorder.shortcuts.lock().clone();
    assert_eq!(
        loaded[0],
        vec![Shortcut {
            control: "power".into(),
            sequence: "0x01,0x77".into()
        }],
        "empty sequences are dropped"
    );
    assert!(
        home.devices().is_empty(),
        "metadata announcements never join the pool"
    );
    assert!(recorder.detected.lock().is_empty());

    home.close();
}

#[test_log::test(tokio::test)]
async fn open_and_close_are_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let recorder = Arc::new(Recorder::default());
    let mut home = Home::new(
        Arc::new(ScriptedProvider::empty()),
        recorder.clone(),
        store,
        quiet_config(),
    );

    home.open();
    home.open();
    home.close();
    home.close();

    assert!(home.devices().is_empty());
    assert!(recorder.selected.lock().is_empty());
}
