use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::job::JobState;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::subtitle::format_timestamp;

/// Per-subscriber queue depth. A subscriber this far behind is dropped.
const SUBSCRIBER_BUFFER: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogColor {
    Green,
    Red,
    Yellow,
    Cyan,
}

/// Events fanned out to every connected observer, serialised as
/// `{"type": "log" | "progress" | "status", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    Log {
        message: String,
        color: Option<LogColor>,
    },
    Progress {
        current: f64,
        total: f64,
        percent: u8,
    },
    Status {
        job_id: Uuid,
        state: JobState,
    },
}

pub struct Subscription {
    pub id: Uuid,
    pub events: mpsc::Receiver<HubEvent>,
}

/// Tracks every connected observer and fans events out to all of them.
///
/// Delivery never waits on a subscriber: events go into a bounded
/// per-subscriber queue, and a subscriber whose queue is full or closed is
/// removed.
pub struct BroadcastHub {
    subscribers: DashMap<Uuid, mpsc::Sender<HubEvent>>,
    buffer: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_buffer(SUBSCRIBER_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            buffer: buffer.max(1),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        self.subscribers.insert(id, tx);
        debug!(%id, "Observer subscribed");
        Subscription { id, events: rx }
    }

    pub fn unsubscribe(&self, id: &Uuid) -> bool {
        let removed = self.subscribers.remove(id).is_some();
        if removed {
            debug!(%id, "Observer unsubscribed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Drops every subscriber; their receivers observe a closed channel.
    pub fn clear(&self) {
        self.subscribers.clear();
    }

    /// Delivers `event` to a snapshot of current subscribers and returns how
    /// many accepted it.
    pub fn broadcast(&self, event: HubEvent) -> usize {
        let snapshot: Vec<(Uuid, mpsc::Sender<HubEvent>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (id, tx) in snapshot {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(%id, %e, "Dropping observer");
                    self.subscribers.remove(&id);
                }
            }
        }
        delivered
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit_log(message.into(), None);
    }

    pub fn log_colored(&self, message: impl Into<String>, color: LogColor) {
        self.emit_log(message.into(), Some(color));
    }

    fn emit_log(&self, message: String, color: Option<LogColor>) {
        info!(target: "subforge::console", "{}", message);
        self.broadcast(HubEvent::Log { message, color });
    }

    /// Coarse progress (`current` of `total` steps), percent floored.
    pub fn progress(&self, current: f64, total: f64) {
        let percent = if total > 0.0 {
            ((current / total) * 100.0).floor().clamp(0.0, 100.0) as u8
        } else {
            0
        };
        self.broadcast(HubEvent::Progress {
            current,
            total,
            percent,
        });
    }

    /// Broadcasts a progress event as is, percent included.
    pub fn publish(&self, event: &ProgressEvent) {
        self.broadcast(HubEvent::Progress {
            current: event.current,
            total: event.total,
            percent: event.percent,
        });
    }

    pub fn status(&self, job_id: Uuid, state: JobState) {
        self.broadcast(HubEvent::Status { job_id, state });
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BroadcastHub {
    fn deliver(&self, event: &ProgressEvent) {
        self.publish(event);
        log_segment(self, event);
    }
}

/// Forwards worker progress as log lines only, for jobs whose progress bar
/// counts something other than media seconds.
pub struct SegmentLog(pub Arc<BroadcastHub>);

impl ProgressSink for SegmentLog {
    fn deliver(&self, event: &ProgressEvent) {
        log_segment(&self.0, event);
    }
}

fn log_segment(hub: &BroadcastHub, event: &ProgressEvent) {
    hub.log(format!(
        "  [{}] {}",
        format_timestamp(event.current),
        event.label
    ));
}
