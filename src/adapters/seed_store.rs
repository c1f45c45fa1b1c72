use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::common::{Clock, SeedStore};
use crate::errors::{LotteryError, LotteryResult};

struct StoredSeed {
    seed: String,
    expires_at: DateTime<Utc>,
}

/// Expiring seed cache keyed by draw id
pub struct InMemorySeedStore {
    seeds: DashMap<Uuid, StoredSeed>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
}

impl InMemorySeedStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            seeds: DashMap::new(),
            clock,
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage; every call fails with `SeedStoreUnavailable` while false
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Drop a seed as if it had been evicted
    pub fn evict(&self, draw_id: Uuid) -> bool {
        self.seeds.remove(&draw_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    fn ensure_available(&self) -> LotteryResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LotteryError::SeedStoreUnavailable(
                "in-memory seed store switched off".to_string(),
            ))
        }
    }
}

#[async_trait]
impl SeedStore for InMemorySeedStore {
    async fn store(&self, draw_id: Uuid, seed: &str, ttl: Duration) -> LotteryResult<()> {
        self.ensure_available()?;
        let expires_at = self.clock.now() + ttl;
        self.seeds.insert(
            draw_id,
            StoredSeed {
                seed: seed.to_string(),
                expires_at,
            },
        );
        tracing::debug!(draw_id = %draw_id, expires_at = %expires_at, "Server seed stored");
        Ok(())
    }

    async fn get(&self, draw_id: Uuid) -> LotteryResult<Option<String>> {
        self.ensure_available()?;
        let now = self.clock.now();

        let expired = match self.seeds.get(&draw_id) {
            None => return Ok(None),
            Some(entry) if now < entry.expires_at => return Ok(Some(entry.seed.clone())),
            Some(_) => true,
        };
        if expired {
            self.seeds.remove(&draw_id);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ManualClock;

    #[tokio::test]
    async fn test_seed_expires_with_clock() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = InMemorySeedStore::new(clock.clone());
        let draw_id = Uuid::new_v4();

        store.store(draw_id, "secret", Duration::minutes(10)).await.unwrap();
        assert_eq!(store.get(draw_id).await.unwrap().as_deref(), Some("secret"));

        clock.advance(Duration::minutes(10));
        assert_eq!(store.get(draw_id).await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_outage_is_reported() {
        let store = InMemorySeedStore::new(Arc::new(crate::common::SystemClock));
        store.set_available(false);

        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code(), "SeedStoreUnavailable");
        assert!(err.is_retryable());
    }
}
