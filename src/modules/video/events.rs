use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Queue message handed from ingestion to a worker. Exactly one per created record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingJob {
    pub video_id: Uuid,
    pub staged_file_path: PathBuf,
}
