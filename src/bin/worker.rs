use std::sync::Arc;

use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tecuvideo::config::settings::WorkerConfig;
use tecuvideo::infrastructure::db::pool::{connect_with_retry, ensure_schema};
use tecuvideo::infrastructure::queue::RedisJobQueue;
use tecuvideo::infrastructure::redis::client::RedisService;
use tecuvideo::modules::transcode::engine::FfmpegEngine;
use tecuvideo::modules::transcode::orchestrator::TranscodeOrchestrator;
use tecuvideo::modules::video::repository::VideoRepository;
use tecuvideo::workers::transcoder::TranscoderWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting transcoder worker...");

    let config = WorkerConfig::new()?;

    let pool = match connect_with_retry(
        &config.database_url,
        config.db_connect_retries,
        config.db_connect_retry_delay,
    )
    .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("❌ Could not reach PostgreSQL, giving up: {}", e);
            std::process::exit(1);
        }
    };
    ensure_schema(&pool).await?;

    let redis = match RedisService::new(&config.redis_url).await {
        Ok(redis) => redis,
        Err(e) => {
            error!("❌ Failed to connect to Redis: {}", e);
            std::process::exit(1);
        }
    };

    tokio::fs::create_dir_all(config.media.staging_root()).await?;

    let engine = Arc::new(FfmpegEngine::new(config.ffmpeg_bin.as_str(), config.hwaccel));
    let orchestrator = Arc::new(TranscodeOrchestrator::new(
        Arc::new(VideoRepository::new(pool)),
        engine,
        config.media.clone(),
        config.encode_timeout,
    ));
    let worker = TranscoderWorker::new(
        Arc::new(RedisJobQueue::new(redis)),
        orchestrator,
        config.dequeue_timeout,
        config.queue_retry_backoff,
    );

    let shutdown = CancellationToken::new();
    let abort = worker.abort_handle();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            info!("Shutdown requested, finishing current job. Press Ctrl-C again to abort it.");
            shutdown.cancel();

            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Aborting current job");
                abort.cancel();
            }
        });
    }

    let stats = worker.run(shutdown).await;
    info!(
        published = stats.published,
        failed = stats.failed,
        unrecorded = stats.unrecorded,
        "Worker exited"
    );
    Ok(())
}
