//! Scan the local network for boxes and print whatever turns up.
//!
//! ```sh
//! cargo run --example scan -- --duration 15
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use boxscout::discovery::MdnsSdProvider;
use boxscout::shortcuts::Shortcut;
use boxscout::{Device, FileStore, Home, HomeConfig, HomeListener};

#[derive(Parser)]
#[command(about = "Scan the local network for boxes")]
struct Args {
    /// How long to scan, in seconds.
    #[arg(long, default_value_t = 10)]
    duration: u64,

    /// UDP port watched for broadcast announcements.
    #[arg(long, default_value_t = 24322)]
    port: u16,

    /// File the discovered pool is persisted into.
    #[arg(long, default_value = "boxscout-pool.json")]
    pool: String,
}

struct Printer;

impl HomeListener for Printer {
    fn on_device_selected(&self, device: &Device) {
        println!(
            "selected  {}:{} color={}",
            device.address(),
            device.port(),
            device.color().unwrap_or("-")
        );
    }

    fn on_device_detected(&self, device: &Device) {
        println!(
            "detected  {}:{} color={}",
            device.address(),
            device.port(),
            device.color().unwrap_or("-")
        );
    }

    fn on_shortcuts_loaded(&self, shortcuts: &[Shortcut]) {
        println!("shortcuts {} controls configured", shortcuts.len());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let provider = Arc::new(MdnsSdProvider::new()?);
    let store = Arc::new(FileStore::new(&args.pool));
    let config = HomeConfig {
        broadcast_port: args.port,
        ..HomeConfig::default()
    };
    let mut home = Home::new(provider, Arc::new(Printer), store, config);

    home.open();
    tokio::time::sleep(Duration::from_secs(args.duration)).await;

    println!("--");
    for device in home.devices() {
        println!(
            "{}:{} color={} reachable={}",
            device.address(),
            device.port(),
            device.color().unwrap_or("-"),
            device.reachable()
        );
    }
    home.close();
    Ok(())
}
