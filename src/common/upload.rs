use anyhow::{Result, anyhow};
use axum::extract::multipart::Field;
use futures_util::StreamExt;
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, warn};

/// Streams one multipart field to `dest` without buffering the whole upload in memory.
/// A partially written file is removed on failure.
pub async fn stream_to_staging(mut field: Field<'_>, dest: &Path) -> Result<u64> {
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    if !content_type.starts_with("video/") && content_type != "application/octet-stream" {
        return Err(anyhow!("Invalid content type: only video/* allowed"));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut writer = BufWriter::new(File::create(dest).await?);
    let mut written: u64 = 0;

    while let Some(chunk) = field.next().await {
        let result = match chunk {
            Ok(bytes) => {
                written += bytes.len() as u64;
                writer.write_all(&bytes).await.map_err(anyhow::Error::from)
            }
            Err(e) => Err(anyhow!("Stream interrupted: {}", e)),
        };

        if let Err(e) = result {
            error!("Staging upload to {} failed: {}", dest.display(), e);
            drop(writer);
            let _ = fs::remove_file(dest).await;
            return Err(e);
        }
    }

    if let Err(e) = writer.flush().await {
        let _ = fs::remove_file(dest).await;
        return Err(e.into());
    }

    info!("Staged {} bytes at {}", written, dest.display());
    Ok(written)
}

/// Deletes a staged upload that will never reach a worker. A missing file is not an error.
pub async fn discard_staged_file(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to discard staged file {}: {}", path.display(), e);
        }
    }
}
