use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::config::env::{self, EnvKey};

pub const THUMBNAILS_DIR: &str = "thumbnails";
pub const STREAMS_DIR: &str = "streams";
pub const STAGING_DIR: &str = "temp";
pub const MASTER_MANIFEST_NAME: &str = "master.m3u8";

/// Where published artifacts and staged uploads live, and how they are addressed publicly.
#[derive(Clone, Debug, Deserialize)]
pub struct MediaLayout {
    pub root: PathBuf,
    pub public_prefix: String,
}

impl MediaLayout {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn thumbnails_root(&self) -> PathBuf {
        self.root.join(THUMBNAILS_DIR)
    }

    pub fn streams_root(&self) -> PathBuf {
        self.root.join(STREAMS_DIR)
    }

    pub fn staging_root(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn staged_file(&self, id: Uuid) -> PathBuf {
        self.staging_root().join(format!("{}.mp4", id))
    }

    pub fn thumbnail_file(&self, id: Uuid) -> PathBuf {
        self.thumbnails_root().join(format!("{}.jpg", id))
    }

    pub fn stream_dir(&self, id: Uuid) -> PathBuf {
        self.streams_root().join(id.to_string())
    }

    pub fn master_manifest_file(&self, id: Uuid) -> PathBuf {
        self.stream_dir(id).join(MASTER_MANIFEST_NAME)
    }

    pub fn thumbnail_url(&self, id: Uuid) -> String {
        format!("{}/{}/{}.jpg", self.public_prefix, THUMBNAILS_DIR, id)
    }

    pub fn master_manifest_url(&self, id: Uuid) -> String {
        format!(
            "{}/{}/{}/{}",
            self.public_prefix, STREAMS_DIR, id, MASTER_MANIFEST_NAME
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub media: MediaLayout,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        let max_upload_mb: usize = env::get_parsed(EnvKey::MaxUploadMb, 500);
        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            database_url: env::get(EnvKey::DatabaseUrl)?,
            redis_url: env::get(EnvKey::RedisUrl)?,
            media: media_from_env(),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: String,
    pub media: MediaLayout,
    pub ffmpeg_bin: String,
    pub hwaccel: bool,
    pub db_connect_retries: u32,
    pub db_connect_retry_delay: Duration,
    pub queue_retry_backoff: Duration,
    /// `None` blocks on the queue forever.
    pub dequeue_timeout: Option<Duration>,
    /// `None` lets the encoder run unbounded.
    pub encode_timeout: Option<Duration>,
}

impl WorkerConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            database_url: env::get(EnvKey::DatabaseUrl)?,
            redis_url: env::get(EnvKey::RedisUrl)?,
            media: media_from_env(),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, "ffmpeg"),
            hwaccel: env::get_parsed(EnvKey::FfmpegHwaccel, false),
            db_connect_retries: env::get_parsed(EnvKey::DbConnectRetries, 5),
            db_connect_retry_delay: Duration::from_secs(env::get_parsed(
                EnvKey::DbConnectRetryDelaySecs,
                3,
            )),
            queue_retry_backoff: Duration::from_secs(env::get_parsed(
                EnvKey::QueueRetryBackoffSecs,
                5,
            )),
            dequeue_timeout: env::get_optional_secs(EnvKey::DequeueTimeoutSecs),
            encode_timeout: env::get_optional_secs(EnvKey::EncodeTimeoutSecs),
        })
    }
}

fn media_from_env() -> MediaLayout {
    MediaLayout::new(
        env::get_or(EnvKey::MediaRoot, "static"),
        env::get_or(EnvKey::PublicMediaPrefix, ""),
    )
}
