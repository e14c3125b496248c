use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::progress::{self, ProgressPoller, ProgressReporter, ProgressSink};

/// Runs blocking units of work (model inference, model loads, diarization)
/// off the async executor.
///
/// `submit_tracked` pairs the unit with a progress queue that is drained to a
/// sink while the work runs and flushed once it returns, whether it succeeded
/// or not.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    poll_interval: Duration,
}

impl WorkerPool {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub async fn submit<T, F>(&self, work: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| anyhow::anyhow!("Worker task join error: {}", e))
    }

    pub async fn submit_tracked<T, F>(
        &self,
        sink: Arc<dyn ProgressSink>,
        work: F,
    ) -> anyhow::Result<T>
    where
        F: FnOnce(ProgressReporter) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reporter, rx) = progress::channel();
        let poller = ProgressPoller::spawn(rx, self.poll_interval, sink);

        let result = self.submit(move || work(reporter)).await;

        let delivered = poller.finish().await;
        debug!(delivered, "Progress poller stopped");

        result?
    }
}
