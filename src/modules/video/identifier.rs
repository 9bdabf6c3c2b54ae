//! Internal keys and monotonically increasing display ids.
//!
//! The sequence lives in a durable counter. When that counter is absent (fresh deployment,
//! cache flush) it is reseeded from the largest suffix already present in the record store,
//! so numbering continues instead of restarting at 1.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use super::model::format_display_id;
use super::repository::VideoStore;
use crate::common::error::CounterError;

/// A single named, atomically incremented integer.
#[async_trait]
pub trait SequenceCounter: Send + Sync {
    async fn exists(&self) -> Result<bool, CounterError>;

    /// Sets the counter only if it does not exist yet. Returns whether this call seeded it.
    async fn seed_if_absent(&self, value: i64) -> Result<bool, CounterError>;

    /// Atomically increments and returns the new value.
    async fn increment(&self) -> Result<i64, CounterError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedId {
    pub id: Uuid,
    pub sequence: i64,
    pub display_id: String,
}

pub struct IdentifierGenerator {
    counter: Arc<dyn SequenceCounter>,
    store: Arc<dyn VideoStore>,
    initialized: OnceCell<()>,
}

impl IdentifierGenerator {
    pub fn new(counter: Arc<dyn SequenceCounter>, store: Arc<dyn VideoStore>) -> Self {
        Self {
            counter,
            store,
            initialized: OnceCell::new(),
        }
    }

    /// Seeds the counter from the store when it is missing. Safe to call repeatedly and
    /// from several processes: the seed only lands if the key is still absent.
    pub async fn ensure_initialized(&self) -> Result<(), CounterError> {
        self.initialized
            .get_or_try_init(|| self.recover_counter())
            .await
            .map(|_| ())
    }

    async fn recover_counter(&self) -> Result<(), CounterError> {
        if self.counter.exists().await? {
            info!("Video counter present, no recovery needed");
            return Ok(());
        }

        let max = self.store.max_display_sequence().await?;
        if self.counter.seed_if_absent(max).await? {
            info!("Video counter seeded at {}", max);
        } else {
            info!("Video counter was seeded concurrently, keeping existing value");
        }
        Ok(())
    }

    pub async fn next(&self) -> Result<GeneratedId, CounterError> {
        self.ensure_initialized().await?;

        let sequence = self.counter.increment().await?;
        Ok(GeneratedId {
            id: Uuid::new_v4(),
            sequence,
            display_id: format_display_id(sequence),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::video::model::NewVideo;
    use crate::testing::{MemoryCounter, MemoryVideoStore};

    async fn insert_batch(
        store: &MemoryVideoStore,
        generator: &IdentifierGenerator,
        n: usize,
    ) -> Vec<i64> {
        let mut sequences = Vec::new();
        for i in 0..n {
            let generated = generator.next().await.unwrap();
            store
                .insert(&NewVideo {
                    id: generated.id,
                    display_id: generated.display_id.clone(),
                    title: format!("video {}", i),
                    description: None,
                })
                .await
                .unwrap();
            sequences.push(generated.sequence);
        }
        sequences
    }

    #[tokio::test]
    async fn first_ever_id_is_tm1() {
        let store = Arc::new(MemoryVideoStore::default());
        let generator = IdentifierGenerator::new(Arc::new(MemoryCounter::default()), store);

        let generated = generator.next().await.unwrap();
        assert_eq!(generated.display_id, "tm1");
        assert_eq!(generated.sequence, 1);
    }

    #[tokio::test]
    async fn reset_counter_resumes_after_existing_max() {
        let store = Arc::new(MemoryVideoStore::default());
        let first = IdentifierGenerator::new(Arc::new(MemoryCounter::default()), store.clone());
        insert_batch(&store, &first, 7).await;

        // Counter state lost: a fresh counter and a fresh generator.
        let generator = IdentifierGenerator::new(Arc::new(MemoryCounter::default()), store.clone());
        let generated = generator.next().await.unwrap();
        assert_eq!(generated.display_id, "tm8");
    }

    #[tokio::test]
    async fn sequences_strictly_increase_across_resets() {
        let store = Arc::new(MemoryVideoStore::default());
        let mut all = Vec::new();
        for batch in [3, 1, 4] {
            let generator =
                IdentifierGenerator::new(Arc::new(MemoryCounter::default()), store.clone());
            all.extend(insert_batch(&store, &generator, batch).await);
        }

        assert_eq!(all.len(), 8);
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn existing_counter_is_not_overwritten() {
        let store = Arc::new(MemoryVideoStore::default());
        let counter = Arc::new(MemoryCounter::starting_at(41));
        let generator = IdentifierGenerator::new(counter.clone(), store);

        generator.ensure_initialized().await.unwrap();
        generator.ensure_initialized().await.unwrap();

        assert_eq!(generator.next().await.unwrap().display_id, "tm42");
        assert_eq!(counter.seed_calls(), 0);
    }

    #[tokio::test]
    async fn unreachable_counter_fails_initialization() {
        let store = Arc::new(MemoryVideoStore::default());
        let generator = IdentifierGenerator::new(Arc::new(MemoryCounter::unreachable()), store);

        assert!(generator.ensure_initialized().await.is_err());
        assert!(generator.next().await.is_err());
    }
}
