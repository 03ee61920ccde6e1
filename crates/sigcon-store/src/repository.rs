use async_trait::async_trait;
use chrono::Utc;
use sigcon_models::research::{record_path, ResearchCategory, ResearchRecord};
use uuid::Uuid;

use crate::error::StoreError;

/// Opaque persistence sink for research output.
///
/// The core writes to it once per cycle per aggregation level and never
/// reads back synchronously. Returns the storage path of the new record.
#[async_trait]
pub trait ResearchRepository: Send + Sync {
    async fn store_research(
        &self,
        title: &str,
        category: ResearchCategory,
        data: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Result<String, StoreError>;
}

/// Stamp a new record with its path and creation time.
pub fn new_record(
    title: &str,
    category: ResearchCategory,
    data: serde_json::Value,
    metadata: serde_json::Value,
) -> ResearchRecord {
    let created_at = Utc::now();
    ResearchRecord {
        path: record_path(category, title, created_at, Uuid::new_v4()),
        title: title.to_string(),
        category,
        data,
        metadata,
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_path_uses_category_and_title() {
        let record = new_record(
            "Executive Summary",
            ResearchCategory::Reports,
            serde_json::json!({"insights": []}),
            serde_json::Value::Null,
        );
        assert!(record.path.starts_with("reports/executive-summary/"));
        assert_eq!(record.title, "Executive Summary");
    }
}
