//! Per-run client event log
//!
//! The run publishes into the hub; clients subscribe from any offset and
//! replay. The log is append-only and outlives subscribers, so a client that
//! drops its stream never affects the run, and a late client still sees the
//! whole run. A subscription ends after the first terminal event.
//!
//! The hub remembers when its terminal event arrived so the runtime can evict
//! it once a retention window has passed.

use super::translator::ClientEvent;
use futures::Stream;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Log {
    events: Vec<ClientEvent>,
    closed: bool,
    closed_at: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct EventHub {
    log: Mutex<Log>,
    notify: Notify,
}

impl EventHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Append an event. Events after a terminal one are dropped.
    pub fn publish(&self, event: ClientEvent) {
        {
            let mut log = self.log.lock();
            if log.closed {
                tracing::debug!(kind = event.kind(), "Dropping event published after close");
                return;
            }
            if event.is_terminal() {
                log.closed = true;
                log.closed_at = Some(Instant::now());
            }
            log.events.push(event);
        }
        self.notify.notify_waiters();
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ClientEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.log.lock().closed
    }

    /// Time since the terminal event, `None` while the run is live
    pub fn closed_for(&self) -> Option<Duration> {
        self.log.lock().closed_at.map(|at| at.elapsed())
    }

    pub fn len(&self) -> usize {
        self.log.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of everything published so far
    pub fn snapshot(&self) -> Vec<ClientEvent> {
        self.log.lock().events.clone()
    }

    /// Replay from `offset`, then follow live events until the terminal one
    pub fn subscribe(self: &Arc<Self>, offset: usize) -> impl Stream<Item = ClientEvent> + Send + 'static {
        let hub = Arc::clone(self);
        async_stream::stream! {
            let mut offset = offset;
            loop {
                // register before reading so a publish in between still wakes us
                let notified = hub.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                let (batch, closed) = {
                    let log = hub.log.lock();
                    let start = offset.min(log.events.len());
                    (log.events[start..].to_vec(), log.closed)
                };
                offset += batch.len();
                for event in batch {
                    yield event;
                }
                if closed {
                    break;
                }
                notified.await;
            }
        }
    }
}
