use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::StoreError;

/// Prefix of every human-readable display id (`tm1`, `tm2`, ...).
pub const DISPLAY_ID_PREFIX: &str = "tm";

/// Lifecycle of a video. `Processing` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Processing,
    Active,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Active => "active",
            VideoStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, VideoStatus::Processing)
    }

    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        !self.is_terminal() && next.is_terminal()
    }

    /// Validates a move of record `id` to `target`.
    pub fn transition(self, id: Uuid, target: VideoStatus) -> Result<VideoStatus, StoreError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(StoreError::InvalidTransition {
                id,
                current: self,
                target,
            })
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for VideoStatus {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "processing" => Ok(VideoStatus::Processing),
            "active" => Ok(VideoStatus::Active),
            "failed" => Ok(VideoStatus::Failed),
            _ => Err(StoreError::UnknownStatus(s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, ToSchema)]
pub struct VideoRecord {
    #[sqlx(rename = "uuid")]
    pub id: Uuid,
    pub display_id: String,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: VideoStatus,
    pub thumbnail_path: Option<String>,
    pub stream_manifest_path: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Everything needed to insert a record in `processing`.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub id: Uuid,
    pub display_id: String,
    pub title: String,
    pub description: Option<String>,
}

/// The single terminal mutation a worker applies to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalization {
    Active {
        thumbnail_path: Option<String>,
        stream_manifest_path: String,
    },
    Failed,
}

impl Finalization {
    pub fn target_status(&self) -> VideoStatus {
        match self {
            Finalization::Active { .. } => VideoStatus::Active,
            Finalization::Failed => VideoStatus::Failed,
        }
    }
}

pub fn format_display_id(sequence: i64) -> String {
    format!("{}{}", DISPLAY_ID_PREFIX, sequence)
}

/// Numeric suffix of a well-formed display id.
pub fn parse_display_sequence(display_id: &str) -> Option<i64> {
    let digits = display_id.strip_prefix(DISPLAY_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_processing_may_transition() {
        use VideoStatus::*;

        assert!(Processing.can_transition_to(Active));
        assert!(Processing.can_transition_to(Failed));
        for terminal in [Active, Failed] {
            assert!(terminal.is_terminal());
            for next in [Processing, Active, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn rejected_transition_names_both_states() {
        let id = Uuid::new_v4();
        assert_eq!(
            VideoStatus::Processing.transition(id, VideoStatus::Active).unwrap(),
            VideoStatus::Active
        );

        let err = VideoStatus::Failed
            .transition(id, VideoStatus::Active)
            .unwrap_err();
        match err {
            StoreError::InvalidTransition {
                id: err_id,
                current,
                target,
            } => {
                assert_eq!(err_id, id);
                assert_eq!(current, VideoStatus::Failed);
                assert_eq!(target, VideoStatus::Active);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn status_parses_from_column_text() {
        assert_eq!(
            VideoStatus::try_from("active".to_string()).unwrap(),
            VideoStatus::Active
        );
        assert!(VideoStatus::try_from("READY".to_string()).is_err());
    }

    #[test]
    fn display_ids_round_through_sequence() {
        assert_eq!(format_display_id(1), "tm1");
        assert_eq!(parse_display_sequence("tm42"), Some(42));
        assert_eq!(parse_display_sequence("tm"), None);
        assert_eq!(parse_display_sequence("tmx3"), None);
        assert_eq!(parse_display_sequence("xx3"), None);
    }
}
