//! Simulated backend for environments without working discovery.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::device::Sighting;
use crate::error::Result;

use super::{DiscoveryBackend, Report, SightingSink};

const SOURCE: &str = "simulated";

/// Replays a scripted set of sightings shortly after start.
pub struct SimulatedBackend {
    script: Vec<Sighting>,
    delay: Duration,
    sink: SightingSink,
    task: Option<JoinHandle<()>>,
}

impl SimulatedBackend {
    /// Create a backend replaying `script` once, `delay` after start.
    pub fn new(script: Vec<Sighting>, delay: Duration, sink: SightingSink) -> Self {
        Self {
            script,
            delay,
            sink,
            task: None,
        }
    }
}

impl DiscoveryBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn start(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Ok(());
        }
        let script = self.script.clone();
        let delay = self.delay;
        let sink = self.sink.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            for sighting in script {
                debug!(address = %sighting.address, port = sighting.port, "simulated sighting");
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
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
