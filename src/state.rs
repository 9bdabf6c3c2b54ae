use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::queue::JobQueue;
use crate::modules::video::identifier::IdentifierGenerator;
use crate::modules::video::repository::VideoStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn VideoStore>,
    pub queue: Arc<dyn JobQueue>,
    pub generator: Arc<IdentifierGenerator>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn VideoStore>,
        queue: Arc<dyn JobQueue>,
        generator: Arc<IdentifierGenerator>,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            generator,
        }
    }
}

#[cfg(test)]
pub fn test_state(
    media_root: &std::path::Path,
    store: Arc<dyn VideoStore>,
    queue: Arc<dyn JobQueue>,
    counter: Arc<dyn crate::modules::video::identifier::SequenceCounter>,
) -> AppState {
    use crate::config::settings::MediaLayout;

    let config = AppConfig {
        server_port: 0,
        database_url: String::new(),
        redis_url: String::new(),
        media: MediaLayout::new(media_root, ""),
        max_upload_bytes: 16 * 1024 * 1024,
    };
    let generator = Arc::new(IdentifierGenerator::new(counter, store.clone()));
    AppState::new(config, store, queue, generator)
}
