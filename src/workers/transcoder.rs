use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::infrastructure::queue::JobQueue;
use crate::modules::transcode::orchestrator::{JobOutcome, TranscodeOrchestrator};
use crate::modules::video::events::EncodingJob;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub published: usize,
    pub failed: usize,
    pub unrecorded: usize,
    pub discarded: usize,
    pub queue_errors: usize,
}

/// Pulls jobs one at a time and runs each to completion before asking for the next.
/// Several workers may share a queue; each pop goes to exactly one of them.
pub struct TranscoderWorker {
    queue: Arc<dyn JobQueue>,
    orchestrator: Arc<TranscodeOrchestrator>,
    dequeue_timeout: Option<Duration>,
    retry_backoff: Duration,
    abort: CancellationToken,
}

impl TranscoderWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        orchestrator: Arc<TranscodeOrchestrator>,
        dequeue_timeout: Option<Duration>,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            queue,
            orchestrator,
            dequeue_timeout,
            retry_backoff,
            abort: CancellationToken::new(),
        }
    }

    /// Token that cancels the job currently being encoded. Shutdown alone never does.
    pub fn abort_handle(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Runs until `shutdown` fires. Queue errors are retried forever after a fixed backoff;
    /// a job already dequeued is always finished first.
    pub async fn run(&self, shutdown: CancellationToken) -> WorkerStats {
        let mut stats = WorkerStats::default();
        info!("🎥 Transcoder worker waiting for jobs...");

        while !shutdown.is_cancelled() {
            match self.queue.dequeue_blocking(self.dequeue_timeout, &shutdown).await {
                Ok(Some(payload)) => self.handle_payload(&payload, &mut stats).await,
                Ok(None) => continue,
                Err(e) => {
                    stats.queue_errors += 1;
                    error!(
                        "Failed to fetch job from queue: {}. Retrying in {:?}",
                        e, self.retry_backoff
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_backoff) => {}
                        _ = shutdown.cancelled() => break,
                    }
                }
            }
        }

        info!("Transcoder worker stopped: {:?}", stats);
        stats
    }

    async fn handle_payload(&self, payload: &str, stats: &mut WorkerStats) {
        let job = match serde_json::from_str::<EncodingJob>(payload) {
            Ok(job) => job,
            Err(e) => {
                warn!("❌ Discarding malformed job payload: {}", e);
                stats.discarded += 1;
                return;
            }
        };

        info!(video_id = %job.video_id, "📦 Received encoding job");
        let report = self.orchestrator.process(&job, &self.abort).await;
        match report.outcome {
            JobOutcome::Published { .. } => stats.published += 1,
            JobOutcome::Failed { .. } => stats.failed += 1,
            JobOutcome::Unrecorded { .. } => stats.unrecorded += 1,
        }
    }
}
