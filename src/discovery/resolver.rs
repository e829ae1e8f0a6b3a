//! Serializing resolution queue for the DNS-SD provider.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::dnssd::{DnssdProvider, FoundService};
use super::{Report, SightingSink};

const SOURCE: &str = "dns-sd";

/// Serializes resolution requests against the shared provider.
///
/// The provider tolerates a single in-flight resolution. Advertisements are
/// queued as they arrive and resolved one at a time, in submission order; a
/// failed resolution drops that advertisement and moves straight on to the
/// next. Safe under submits racing completions from the resolution task.
#[derive(Clone)]
pub struct ResolverQueue {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn DnssdProvider>,
    sink: SightingSink,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    pending: VecDeque<FoundService>,
    in_progress: bool,
}

impl ResolverQueue {
    /// Create a queue resolving through `provider` and reporting into `sink`.
    pub fn new(provider: Arc<dyn DnssdProvider>, sink: SightingSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                sink,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Enqueue an advertisement; resolution begins immediately when the
    /// provider is free.
    pub fn submit(&self, found: FoundService) {
        let next = {
            let mut state = self.inner.state.lock();
            state.pending.push_back(found);
            if state.in_progress {
                None
            } else {
                state.in_progress = true;
                state.pending.pop_front()
            }
        };
        if let Some(found) = next {
            self.resolve(found);
        }
    }

    /// Number of advertisements waiting behind the in-flight one.
    pub fn backlog(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    fn completed(&self) {
        let next = {
            let mut state = self.inner.state.lock();
            state.in_progress = false;
            match state.pending.pop_front() {
                Some(found) => {
                    state.in_progress = true;
                    Some(found)
                }
                None => None,
            }
        };
        if let Some(found) = next {
            self.resolve(found);
        }
    }

    fn resolve(&self, found: FoundService) {
        let queue = self.clone();
        tokio::spawn(async move {
            match queue.inner.provider.resolve(&found).await {
                Ok(resolved) => {
                    debug!(service = %found.fullname, address = %resolved.address, "service resolved");
                    let _ = queue.inner.sink.send(Report {
                        sighting: resolved.into(),
                        source: SOURCE,
                    });
                }
                Err(e) => warn!(service = %found.fullname, error = %e, "resolve failed"),
            }
            queue.completed();
        });
    }
}
