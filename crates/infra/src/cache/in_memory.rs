use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{CacheError, CacheStore};

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Process-local cache with per-key expiry.
///
/// Expired slots are dropped lazily on read.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots
            .read()
            .map(|slots| slots.values().filter(|s| s.is_live(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CacheError {
    CacheError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let slots = self.slots.read().map_err(|_| poisoned())?;
            match slots.get(key) {
                None => return Ok(None),
                Some(slot) if slot.is_live(now) => return Ok(Some(slot.value.clone())),
                Some(_) => {}
            }
        }

        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        if slots.get(key).is_some_and(|s| !s.is_live(now)) {
            slots.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        // A TTL past the clock's range never expires.
        let slot = Slot {
            value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        };
        self.slots
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), slot);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.slots.write().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }
}
