use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    RedisUrl,
    MediaRoot,
    PublicMediaPrefix,
    MaxUploadMb,
    FfmpegBin,
    FfmpegHwaccel,
    DbConnectRetries,
    DbConnectRetryDelaySecs,
    QueueRetryBackoffSecs,
    DequeueTimeoutSecs,
    EncodeTimeoutSecs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::RedisUrl => "REDIS_URL",
            EnvKey::MediaRoot => "MEDIA_ROOT",
            EnvKey::PublicMediaPrefix => "PUBLIC_MEDIA_PREFIX",
            EnvKey::MaxUploadMb => "MAX_UPLOAD_MB",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::FfmpegHwaccel => "FFMPEG_HWACCEL",
            EnvKey::DbConnectRetries => "DB_CONNECT_RETRIES",
            EnvKey::DbConnectRetryDelaySecs => "DB_CONNECT_RETRY_DELAY_SECS",
            EnvKey::QueueRetryBackoffSecs => "QUEUE_RETRY_BACKOFF_SECS",
            EnvKey::DequeueTimeoutSecs => "DEQUEUE_TIMEOUT_SECS",
            EnvKey::EncodeTimeoutSecs => "ENCODE_TIMEOUT_SECS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Reads a number of seconds where `0` (or absence) means "no limit".
pub fn get_optional_secs(key: EnvKey) -> Option<std::time::Duration> {
    match get_parsed::<u64>(key, 0) {
        0 => None,
        secs => Some(std::time::Duration::from_secs(secs)),
    }
}
