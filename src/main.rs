use std::sync::Arc;

use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tecuvideo::app;
use tecuvideo::config::settings::AppConfig;
use tecuvideo::infrastructure::db::pool::{connect_to_db, ensure_schema};
use tecuvideo::infrastructure::queue::RedisJobQueue;
use tecuvideo::infrastructure::redis::client::RedisService;
use tecuvideo::infrastructure::redis::counter::RedisCounter;
use tecuvideo::modules::video::identifier::IdentifierGenerator;
use tecuvideo::modules::video::repository::VideoRepository;
use tecuvideo::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new()?;

    let pool = connect_to_db(&config.database_url).await?;
    ensure_schema(&pool).await?;

    let redis = match RedisService::new(&config.redis_url).await {
        Ok(redis) => redis,
        Err(e) => {
            error!("❌ Failed to connect to Redis: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(VideoRepository::new(pool));
    let queue = Arc::new(RedisJobQueue::new(redis.clone()));
    let generator = Arc::new(IdentifierGenerator::new(
        Arc::new(RedisCounter::new(redis)),
        store.clone(),
    ));

    if let Err(e) = generator.ensure_initialized().await {
        error!("❌ Failed to initialize video counter: {}", e);
        std::process::exit(1);
    }

    let port = config.server_port;
    let state = AppState::new(config, store, queue, generator);
    let app = app::create_app(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
