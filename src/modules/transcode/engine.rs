use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ladder::{Rendition, SEGMENT_SECONDS};

const THUMBNAIL_SEEK: &str = "00:00:02";
const DIAGNOSTIC_LINES: usize = 40;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to launch encoder: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Encoder exited with {status:?}: {diagnostics}")]
    Failed {
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("Encoder cancelled")]
    Cancelled,

    #[error("Encoder exceeded {0:?}")]
    TimedOut(Duration),
}

/// The external multi-rendition encoder, treated as a black box.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    async fn extract_thumbnail(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError>;

    /// Produces one sub-manifest plus segment set per rendition inside `output_dir`,
    /// in a single invocation. Any failure means nothing is published.
    async fn encode_ladder(
        &self,
        input: &Path,
        output_dir: &Path,
        ladder: &[Rendition],
        cancel: &CancellationToken,
    ) -> Result<(), EngineError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    bin: PathBuf,
    hwaccel: bool,
}

impl FfmpegEngine {
    pub fn new(bin: impl Into<PathBuf>, hwaccel: bool) -> Self {
        Self {
            bin: bin.into(),
            hwaccel,
        }
    }

    async fn run(&self, args: Vec<String>, cancel: &CancellationToken) -> Result<(), EngineError> {
        debug!("Running {} {}", self.bin.display(), args.join(" "));

        let child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the wait future on cancellation kills the child.
        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
        };

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(EngineError::Failed {
            status: output.status.code(),
            diagnostics: tail_lines(&combined, DIAGNOSTIC_LINES),
        })
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn extract_thumbnail(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.run(thumbnail_args(input, output), cancel).await
    }

    async fn encode_ladder(
        &self,
        input: &Path,
        output_dir: &Path,
        ladder: &[Rendition],
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.run(ladder_args(input, output_dir, ladder, self.hwaccel), cancel)
            .await
    }
}

fn thumbnail_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-i".into(),
        input.display().to_string(),
        "-ss".into(),
        THUMBNAIL_SEEK.into(),
        "-vframes".into(),
        "1".into(),
        "-f".into(),
        "image2".into(),
        "-y".into(),
        output.display().to_string(),
    ]
}

/// One ffmpeg invocation with an output group per rendition.
fn ladder_args(
    input: &Path,
    output_dir: &Path,
    ladder: &[Rendition],
    hwaccel: bool,
) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    if hwaccel {
        args.extend(["-hwaccel".to_string(), "cuda".to_string()]);
    }
    args.extend([
        "-i".to_string(),
        input.display().to_string(),
        "-hide_banner".to_string(),
        "-y".to_string(),
    ]);

    for rendition in ladder {
        let (filter, codec) = if hwaccel {
            (
                format!("hwupload_cuda,scale_cuda=-2:{}", rendition.height),
                vec!["-c:v", "h264_nvenc", "-preset", "p5", "-rc", "vbr"],
            )
        } else {
            (
                format!("scale=-2:{}", rendition.height),
                vec!["-c:v", "libx264", "-preset", "veryfast"],
            )
        };

        args.extend(["-vf".to_string(), filter]);
        args.extend(codec.into_iter().map(String::from));
        args.extend([
            "-b:v".to_string(),
            format!("{}k", rendition.video_kbps),
            "-maxrate".to_string(),
            format!("{}k", rendition.max_kbps),
            "-bufsize".to_string(),
            format!("{}k", rendition.buffer_kbps),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", rendition.audio_kbps),
            "-hls_time".to_string(),
            SEGMENT_SECONDS.to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-hls_segment_filename".to_string(),
            output_dir.join(rendition.segment_pattern()).display().to_string(),
            output_dir.join(rendition.playlist_name()).display().to_string(),
        ]);
    }
    args
}

fn tail_lines(text: &str, limit: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(limit);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::transcode::ladder::LADDER;

    fn position(args: &[String], needle: &str) -> usize {
        args.iter().position(|a| a == needle).unwrap()
    }

    #[test]
    fn software_ladder_emits_one_output_per_rendition_in_order() {
        let args = ladder_args(Path::new("in.mp4"), Path::new("out"), &LADDER, false);

        let playlists: Vec<&str> = args
            .iter()
            .map(String::as_str)
            .filter(|a| a.ends_with(".m3u8"))
            .collect();
        assert_eq!(
            playlists,
            ["out/1080p.m3u8", "out/720p.m3u8", "out/480p.m3u8", "out/360p.m3u8", "out/144p.m3u8"]
        );
        assert!(!args.contains(&"cuda".to_string()));
        assert_eq!(args.iter().filter(|a| a.as_str() == "-hls_time").count(), LADDER.len());
        assert!(position(&args, "in.mp4") < position(&args, "out/1080p.m3u8"));
    }

    #[test]
    fn hwaccel_selects_nvenc() {
        let args = ladder_args(Path::new("in.mp4"), Path::new("out"), &LADDER[..1], true);

        assert_eq!(&args[..2], ["-hwaccel", "cuda"]);
        assert!(args.contains(&"h264_nvenc".to_string()));
        assert!(args.contains(&"hwupload_cuda,scale_cuda=-2:1080".to_string()));
        assert!(args.contains(&"10000k".to_string()));
    }

    #[test]
    fn thumbnail_grabs_single_frame() {
        let args = thumbnail_args(Path::new("in.mp4"), Path::new("thumb.jpg"));
        assert_eq!(args[position(&args, "-vframes") + 1], "1");
        assert_eq!(args.last().unwrap(), "thumb.jpg");
    }

    #[test]
    fn diagnostics_keep_the_tail() {
        let text = (1..=100).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        let tail = tail_lines(&text, 3);
        assert_eq!(tail, "98\n99\n100");
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let engine = FfmpegEngine::new("/nonexistent/ffmpeg-binary", false);
        let err = engine
            .extract_thumbnail(
                Path::new("in.mp4"),
                Path::new("out.jpg"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn(_)));
    }
}
