//! Drives one encoding job from staged source to published stream.
//!
//! Stages run in a fixed order: source check, best-effort thumbnail, ladder encode,
//! master manifest, record finalization. The staged source is removed after every run,
//! whichever stage it stopped at.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::engine::{EngineError, TranscodeEngine};
use super::ladder::{LADDER, master_manifest};
use crate::config::settings::MediaLayout;
use crate::modules::video::events::EncodingJob;
use crate::modules::video::model::Finalization;
use crate::modules::video::repository::VideoStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    MissingSource,
    Encode,
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Published {
        thumbnail_url: Option<String>,
        manifest_url: String,
    },
    Failed {
        stage: FailureStage,
        reason: String,
    },
    /// Artifacts are on disk but the record could not be moved to `active`.
    /// The record stays in `processing`; nothing retries it.
    Unrecorded { reason: String },
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub video_id: Uuid,
    pub outcome: JobOutcome,
    /// Set when thumbnail extraction failed. Never affects `outcome`.
    pub thumbnail_warning: Option<String>,
    /// Whether the staged source is gone after the run.
    pub source_removed: bool,
}

pub struct TranscodeOrchestrator {
    store: Arc<dyn VideoStore>,
    engine: Arc<dyn TranscodeEngine>,
    media: MediaLayout,
    encode_timeout: Option<Duration>,
}

impl TranscodeOrchestrator {
    pub fn new(
        store: Arc<dyn VideoStore>,
        engine: Arc<dyn TranscodeEngine>,
        media: MediaLayout,
        encode_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            engine,
            media,
            encode_timeout,
        }
    }

    pub async fn process(&self, job: &EncodingJob, cancel: &CancellationToken) -> JobReport {
        let mut thumbnail_warning = None;
        let outcome = self.run_stages(job, cancel, &mut thumbnail_warning).await;
        let source_removed = remove_staged_file(&job.staged_file_path).await;

        match &outcome {
            JobOutcome::Published { manifest_url, .. } => {
                info!(video_id = %job.video_id, "Published {}", manifest_url)
            }
            JobOutcome::Failed { stage, reason } => {
                error!(video_id = %job.video_id, ?stage, "Job failed: {}", reason)
            }
            JobOutcome::Unrecorded { reason } => {
                error!(video_id = %job.video_id, "Encoded but record not updated: {}", reason)
            }
        }

        JobReport {
            video_id: job.video_id,
            outcome,
            thumbnail_warning,
            source_removed,
        }
    }

    async fn run_stages(
        &self,
        job: &EncodingJob,
        cancel: &CancellationToken,
        thumbnail_warning: &mut Option<String>,
    ) -> JobOutcome {
        let id = job.video_id;
        let source = job.staged_file_path.as_path();

        if !fs::try_exists(source).await.unwrap_or(false) {
            let reason = format!("staged file not found: {}", source.display());
            return self.fail(id, FailureStage::MissingSource, reason).await;
        }

        let stream_dir = self.media.stream_dir(id);
        if let Err(e) = fs::create_dir_all(&stream_dir).await {
            let reason = format!("cannot create {}: {}", stream_dir.display(), e);
            return self.fail(id, FailureStage::Encode, reason).await;
        }

        let thumbnail_url = match self.extract_thumbnail(id, source, cancel).await {
            Ok(()) => Some(self.media.thumbnail_url(id)),
            Err(reason) => {
                warn!(video_id = %id, "Thumbnail extraction failed, continuing: {}", reason);
                *thumbnail_warning = Some(reason);
                None
            }
        };

        if let Err(e) = self.encode(source, &stream_dir, cancel).await {
            self.discard_artifacts(id).await;
            return self.fail(id, FailureStage::Encode, e.to_string()).await;
        }

        let manifest_path = self.media.master_manifest_file(id);
        if let Err(e) = fs::write(&manifest_path, master_manifest(&LADDER)).await {
            let reason = format!("cannot write {}: {}", manifest_path.display(), e);
            self.discard_artifacts(id).await;
            return self.fail(id, FailureStage::Manifest, reason).await;
        }
        info!(video_id = %id, "HLS encode complete");

        let manifest_url = self.media.master_manifest_url(id);
        let finalization = Finalization::Active {
            thumbnail_path: thumbnail_url.clone(),
            stream_manifest_path: manifest_url.clone(),
        };
        match self.store.finalize(id, &finalization).await {
            Ok(()) => JobOutcome::Published {
                thumbnail_url,
                manifest_url,
            },
            Err(e) => JobOutcome::Unrecorded {
                reason: e.to_string(),
            },
        }
    }

    async fn extract_thumbnail(
        &self,
        id: Uuid,
        source: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), String> {
        fs::create_dir_all(self.media.thumbnails_root())
            .await
            .map_err(|e| e.to_string())?;
        self.engine
            .extract_thumbnail(source, &self.media.thumbnail_file(id), cancel)
            .await
            .map_err(|e| e.to_string())
    }

    async fn encode(
        &self,
        source: &Path,
        stream_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let encode = self.engine.encode_ladder(source, stream_dir, &LADDER, cancel);
        match self.encode_timeout {
            Some(limit) => tokio::time::timeout(limit, encode)
                .await
                .unwrap_or(Err(EngineError::TimedOut(limit))),
            None => encode.await,
        }
    }

    /// Drops partial renditions and the thumbnail of a job that will never be published.
    async fn discard_artifacts(&self, id: Uuid) {
        let stream_dir = self.media.stream_dir(id);
        if let Err(e) = fs::remove_dir_all(&stream_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(video_id = %id, "Failed to remove {}: {}", stream_dir.display(), e);
            }
        }
        let thumbnail = self.media.thumbnail_file(id);
        if let Err(e) = fs::remove_file(&thumbnail).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(video_id = %id, "Failed to remove {}: {}", thumbnail.display(), e);
            }
        }
    }

    async fn fail(&self, id: Uuid, stage: FailureStage, reason: String) -> JobOutcome {
        if let Err(e) = self.store.finalize(id, &Finalization::Failed).await {
            error!(video_id = %id, "Failed to mark video as failed: {}", e);
        }
        JobOutcome::Failed { stage, reason }
    }
}

/// Removes the staged source. An already-missing file counts as removed.
async fn remove_staged_file(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Failed to remove staged file {}: {}", path.display(), e);
            false
        }
    }
}
