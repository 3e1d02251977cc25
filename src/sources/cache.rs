//! In-memory TTL cache in front of a [`MetadataSource`].
//!
//! Keys come from [`MetadataQuery::cache_key`]. Both hits and confirmed misses
//! (`Ok(None)`) are cached; errors never are.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use tracing::debug;

use super::{BibRecord, MetadataQuery, MetadataSource};
use crate::layers::LayerError;

pub struct CachedSource {
    inner: Arc<dyn MetadataSource>,
    entries: Cache<String, Option<BibRecord>>,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn MetadataSource>, ttl: Duration, capacity: u64) -> Self {
        Self {
            inner,
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Returns the number of cached entries.
    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl std::fmt::Debug for CachedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSource")
            .field("inner", &self.inner.name())
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl MetadataSource for CachedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports(&self, query: &MetadataQuery) -> bool {
        self.inner.supports(query)
    }

    async fn lookup(&self, query: &MetadataQuery) -> Result<Option<BibRecord>, LayerError> {
        let key = query.cache_key();
        if let Some(hit) = self.entries.get(&key) {
            debug!(source = self.inner.name(), key = %key, "Metadata cache hit");
            return Ok(hit);
        }

        let record = self.inner.lookup(query).await?;
        self.entries.insert(key, record.clone());
        Ok(record)
    }
}
