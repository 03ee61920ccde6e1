use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sigcon_models::research::{ResearchCategory, ResearchRecord};

use crate::error::StoreError;
use crate::repository::{new_record, ResearchRepository};

/// In-memory research repository backed by moka.
///
/// Bounded by capacity and TTL, so a long-running process without a SQLite
/// file does not grow without limit. Records are evicted silently.
pub struct MemoryRepository {
    inner: Cache<String, ResearchRecord>,
}

impl MemoryRepository {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, path: &str) -> Option<ResearchRecord> {
        self.inner.get(path).await
    }

    /// All live records in a category, oldest first.
    pub fn records(&self, category: ResearchCategory) -> Vec<ResearchRecord> {
        let mut records: Vec<ResearchRecord> = self
            .inner
            .iter()
            .filter(|(_, record)| record.category == category)
            .map(|(_, record)| record)
            .collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[async_trait]
impl ResearchRepository for MemoryRepository {
    async fn store_research(
        &self,
        title: &str,
        category: ResearchCategory,
        data: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Result<String, StoreError> {
        let record = new_record(title, category, data, metadata);
        let path = record.path.clone();
        self.inner.insert(path.clone(), record).await;
        Ok(path)
    }
}
