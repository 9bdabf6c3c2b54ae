//! In-memory stand-ins for the store, queue, counter and encoder.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::common::error::{CounterError, QueueError, StoreError};
use crate::config::settings::MASTER_MANIFEST_NAME;
use crate::infrastructure::queue::JobQueue;
use crate::modules::transcode::engine::{EngineError, TranscodeEngine};
use crate::modules::transcode::ladder::Rendition;
use crate::modules::video::events::EncodingJob;
use crate::modules::video::identifier::SequenceCounter;
use crate::modules::video::model::{
    Finalization, NewVideo, VideoRecord, VideoStatus, parse_display_sequence,
};
use crate::modules::video::repository::VideoStore;

#[derive(Default)]
pub struct MemoryVideoStore {
    records: Mutex<Vec<VideoRecord>>,
    fail_finalize: AtomicBool,
    fail_insert: AtomicBool,
}

impl MemoryVideoStore {
    pub fn fail_finalize(&self, fail: bool) {
        self.fail_finalize.store(fail, Ordering::SeqCst);
    }

    pub fn fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub async fn get(&self, id: Uuid) -> Option<VideoRecord> {
        self.records.lock().await.iter().find(|r| r.id == id).cloned()
    }

    pub async fn all(&self) -> Vec<VideoRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn insert(&self, video: &NewVideo) -> Result<VideoRecord, StoreError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("insert disabled".into()));
        }
        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|r| r.id == video.id || r.display_id == video.display_id)
        {
            return Err(StoreError::Unavailable(format!(
                "duplicate key for {}",
                video.display_id
            )));
        }
        let record = VideoRecord {
            id: video.id,
            display_id: video.display_id.clone(),
            title: video.title.clone(),
            description: video.description.clone(),
            status: VideoStatus::Processing,
            thumbnail_path: None,
            stream_manifest_path: None,
            created_at: OffsetDateTime::now_utc(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn finalize(&self, id: Uuid, finalization: &Finalization) -> Result<(), StoreError> {
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("finalize disabled".into()));
        }
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;

        record.status = record.status.transition(id, finalization.target_status())?;
        if let Finalization::Active {
            thumbnail_path,
            stream_manifest_path,
        } = finalization
        {
            record.thumbnail_path = thumbnail_path.clone();
            record.stream_manifest_path = Some(stream_manifest_path.clone());
        }
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<VideoRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.status == VideoStatus::Active)
            .cloned()
            .collect())
    }

    async fn find_active_by_display_id(
        &self,
        display_id: &str,
    ) -> Result<Option<VideoRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .find(|r| r.display_id == display_id && r.status == VideoStatus::Active)
            .cloned())
    }

    async fn max_display_sequence(&self) -> Result<i64, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter_map(|r| parse_display_sequence(&r.display_id))
            .max()
            .unwrap_or(0))
    }
}

#[derive(Default)]
pub struct MemoryCounter {
    value: Mutex<Option<i64>>,
    unreachable: bool,
    seed_calls: AtomicUsize,
}

impl MemoryCounter {
    pub fn starting_at(value: i64) -> Self {
        Self {
            value: Mutex::new(Some(value)),
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn seed_calls(&self) -> usize {
        self.seed_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), CounterError> {
        if self.unreachable {
            return Err(CounterError::Unavailable("counter offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SequenceCounter for MemoryCounter {
    async fn exists(&self) -> Result<bool, CounterError> {
        self.check()?;
        Ok(self.value.lock().await.is_some())
    }

    async fn seed_if_absent(&self, value: i64) -> Result<bool, CounterError> {
        self.check()?;
        self.seed_calls.fetch_add(1, Ordering::SeqCst);
        let mut current = self.value.lock().await;
        if current.is_some() {
            return Ok(false);
        }
        *current = Some(value);
        Ok(true)
    }

    async fn increment(&self) -> Result<i64, CounterError> {
        self.check()?;
        let mut current = self.value.lock().await;
        let next = current.unwrap_or(0) + 1;
        *current = Some(next);
        Ok(next)
    }
}

#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<String>>,
    notify: Notify,
    failing_dequeues: AtomicUsize,
    fail_enqueue: AtomicBool,
    dequeue_attempts: AtomicUsize,
}

impl MemoryQueue {
    pub async fn push_raw(&self, payload: impl Into<String>) {
        self.items.lock().await.push_back(payload.into());
        self.notify.notify_one();
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn payloads(&self) -> Vec<String> {
        self.items.lock().await.iter().cloned().collect()
    }

    /// The next `n` dequeue calls fail as if the queue were unreachable.
    pub fn fail_next_dequeues(&self, n: usize) {
        self.failing_dequeues.store(n, Ordering::SeqCst);
    }

    pub fn fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::SeqCst);
    }

    pub fn dequeue_attempts(&self) -> usize {
        self.dequeue_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: &EncodingJob) -> Result<(), QueueError> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("enqueue disabled".into()));
        }
        self.push_raw(serde_json::to_string(job)?).await;
        Ok(())
    }

    async fn dequeue_blocking(
        &self,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, QueueError> {
        self.dequeue_attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_dequeues.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_dequeues.store(failing - 1, Ordering::SeqCst);
            return Err(QueueError::Unavailable("queue offline".into()));
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(payload) = self.items.lock().await.pop_front() {
                return Ok(Some(payload));
            }
            let notified = self.notify.notified();
            let sleep = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = notified => {}
                _ = cancel.cancelled() => return Ok(None),
                _ = sleep => return Ok(None),
            }
        }
    }
}

#[derive(Default)]
pub struct FakeEngine {
    pub fail_thumbnail: bool,
    pub fail_encode: bool,
    /// Puts a directory where the master manifest should go so writing it fails.
    pub block_master_manifest: bool,
    pub encode_delay: Option<Duration>,
    pub(crate) thumbnail_calls: AtomicUsize,
    pub(crate) encode_calls: AtomicUsize,
    pub(crate) encoded_inputs: std::sync::Mutex<Vec<PathBuf>>,
}

impl FakeEngine {
    pub fn thumbnail_calls(&self) -> usize {
        self.thumbnail_calls.load(Ordering::SeqCst)
    }

    pub fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }

    pub fn encoded_inputs(&self) -> Vec<PathBuf> {
        self.encoded_inputs
            .lock()
            .map(|inputs| inputs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn extract_thumbnail(
        &self,
        _input: &Path,
        output: &Path,
        _cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.thumbnail_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_thumbnail {
            return Err(EngineError::Failed {
                status: Some(1),
                diagnostics: "no video stream".into(),
            });
        }
        tokio::fs::write(output, b"jpeg").await?;
        Ok(())
    }

    async fn encode_ladder(
        &self,
        input: &Path,
        output_dir: &Path,
        ladder: &[Rendition],
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut inputs) = self.encoded_inputs.lock() {
            inputs.push(input.to_path_buf());
        }

        if let Some(delay) = self.encode_delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            }
        }
        if self.fail_encode {
            return Err(EngineError::Failed {
                status: Some(1),
                diagnostics: "Invalid data found when processing input".into(),
            });
        }

        for rendition in ladder {
            tokio::fs::write(output_dir.join(rendition.playlist_name()), b"#EXTM3U\n").await?;
        }
        if self.block_master_manifest {
            tokio::fs::create_dir_all(output_dir.join(MASTER_MANIFEST_NAME)).await?;
        }
        Ok(())
    }
}
