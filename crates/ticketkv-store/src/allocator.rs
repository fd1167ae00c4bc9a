//! Identifier allocation from the per-collection `idx_<collection>` counter.

use std::sync::Arc;
use std::time::Duration;

use ticketkv_core::{Collection, RecordId};

use crate::deadline::{within, DEFAULT_TIMEOUT};
use crate::error::{Result, StoreError};
use crate::traits::KvBackend;

/// Hands out strictly increasing ids, one counter per collection.
///
/// Allocation is a single atomic increment, so concurrent callers never
/// receive the same id. An id whose create later fails is not reused.
pub struct IdAllocator<B: ?Sized> {
    backend: Arc<B>,
    timeout: Duration,
}

impl<B: ?Sized> Clone for IdAllocator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            timeout: self.timeout,
        }
    }
}

impl<B: KvBackend + ?Sized> IdAllocator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Advance the collection counter and return the new value.
    pub async fn next_id(&self, collection: Collection) -> Result<RecordId> {
        let key = collection.counter_key();
        let value = within("incr", self.timeout, self.backend.incr(&key)).await?;
        u64::try_from(value)
            .ok()
            .filter(|v| *v > 0)
            .map(RecordId::new)
            .ok_or_else(|| StoreError::InvalidData(format!("counter {} holds {}", key, value)))
    }

    /// The last id handed out, or 0 before the first allocation.
    pub async fn current(&self, collection: Collection) -> Result<u64> {
        let key = collection.counter_key();
        let value = within("get_int", self.timeout, self.backend.get_int(&key)).await?;
        match value {
            None => Ok(0),
            Some(v) => u64::try_from(v)
                .map_err(|_| StoreError::InvalidData(format!("counter {} holds {}", key, v))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[tokio::test]
    async fn test_ids_start_at_one_and_increase() {
        let allocator = IdAllocator::new(Arc::new(MemoryBackend::new()));
        assert_eq!(allocator.current(Collection::User).await.unwrap(), 0);

        assert_eq!(allocator.next_id(Collection::User).await.unwrap(), RecordId::new(1));
        assert_eq!(allocator.next_id(Collection::User).await.unwrap(), RecordId::new(2));
        assert_eq!(allocator.next_id(Collection::Event).await.unwrap(), RecordId::new(1));
        assert_eq!(allocator.current(Collection::User).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_distinct() {
        let allocator = IdAllocator::new(Arc::new(MemoryBackend::new()));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let allocator = allocator.clone();
            handles.push(tokio::spawn(async move {
                allocator.next_id(Collection::Transaction).await.unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().get());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=32).collect::<Vec<_>>());
    }
}
