//! Hand-off of progress events from a blocking worker thread to async
//! observers.
//!
//! The worker side ([`ProgressReporter`]) pushes into an unbounded queue and
//! never blocks. A [`ProgressPoller`] task drains the queue on a fixed
//! cadence and forwards events to a [`ProgressSink`]. Stopping the poller
//! flushes whatever is still queued, so each event is delivered exactly once.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::TimedSegment;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub current: f64,
    pub total: f64,
    /// 0..=99 while work is in flight, 100 only via [`ProgressEvent::complete`].
    pub percent: u8,
    pub label: String,
}

impl ProgressEvent {
    pub fn in_flight(current: f64, total: f64, label: impl Into<String>) -> Self {
        let percent = if total > 0.0 {
            ((current / total) * 100.0).floor().clamp(0.0, 99.0) as u8
        } else {
            0
        };
        Self {
            current,
            total,
            percent,
            label: label.into(),
        }
    }

    pub fn complete(total: f64, label: impl Into<String>) -> Self {
        Self {
            current: total,
            total,
            percent: 100,
            label: label.into(),
        }
    }

    /// Completion of a pass over media, in the seconds its segments were
    /// reported in. Never behind the last segment event.
    pub fn media_complete(duration: f64, segments: &[TimedSegment], label: impl Into<String>) -> Self {
        let end = segments.iter().map(|s| s.end).fold(duration, f64::max);
        Self::complete(round_tenth(end.max(0.0)), label)
    }
}

/// Receives drained progress events on the async side.
pub trait ProgressSink: Send + Sync + 'static {
    fn deliver(&self, event: &ProgressEvent);
}

/// Worker-side handle. Cloneable and usable from any thread.
#[derive(Clone)]
pub struct ProgressReporter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressReporter {
    pub fn report(&self, event: ProgressEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("Progress poller gone, dropping event: {}", e.0.label);
        }
    }

    /// Reports a finished segment against the media duration. Positions are
    /// rounded to a tenth of a second; nothing is sent when the duration is
    /// unknown.
    pub fn segment(&self, segment: &TimedSegment, media_duration: f64) {
        if media_duration > 0.0 {
            self.report(ProgressEvent::in_flight(
                round_tenth(segment.end),
                round_tenth(media_duration),
                segment.text.clone(),
            ));
        }
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn channel() -> (ProgressReporter, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressReporter { tx }, rx)
}

/// Async task draining a progress queue every `interval`.
pub struct ProgressPoller {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<usize>,
}

impl ProgressPoller {
    pub fn spawn(
        rx: mpsc::UnboundedReceiver<ProgressEvent>,
        interval: Duration,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(poll_loop(rx, stop_rx, interval, sink));
        Self { stop, handle }
    }

    /// Stops polling, flushes remaining events and returns the total number
    /// of events delivered over the poller's lifetime.
    pub async fn finish(self) -> usize {
        let _ = self.stop.send(());
        match self.handle.await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("Progress poller task failed: {}", e);
                0
            }
        }
    }
}

async fn poll_loop(
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
    mut stop_rx: oneshot::Receiver<()>,
    interval: Duration,
    sink: Arc<dyn ProgressSink>,
) -> usize {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut delivered = 0;

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => delivered += drain(&mut rx, sink.as_ref()),
        }
    }

    let flushed = drain(&mut rx, sink.as_ref());
    if flushed > 0 {
        debug!(flushed, "Flushed queued progress events");
    }
    delivered + flushed
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>, sink: &dyn ProgressSink) -> usize {
    let mut count = 0;
    while let Ok(event) = rx.try_recv() {
        sink.deliver(&event);
        count += 1;
    }
    count
}
