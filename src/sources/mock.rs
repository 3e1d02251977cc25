//! In-memory metadata source for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::{BibRecord, MetadataQuery, MetadataSource};
use crate::layers::LayerError;

/// Answers from a fixed table. Queries missing from the table are "not found".
///
/// Set [`MockMetadataSource::failing`] to simulate an unreachable API: every
/// lookup then returns [`LayerError::Transient`].
#[derive(Debug, Clone, Default)]
pub struct MockMetadataSource {
    records: Arc<RwLock<HashMap<MetadataQuery, BibRecord>>>,
    failure: Option<String>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_record(self, query: MetadataQuery, record: BibRecord) -> Self {
        self.records
            .write()
            .expect("lock poisoned")
            .insert(query, record);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for MockMetadataSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports(&self, _query: &MetadataQuery) -> bool {
        true
    }

    async fn lookup(&self, query: &MetadataQuery) -> Result<Option<BibRecord>, LayerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(reason) = &self.failure {
            return Err(LayerError::transient(reason.clone()));
        }
        Ok(self
            .records
            .read()
            .expect("lock poisoned")
            .get(query)
            .cloned())
    }
}
