use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use sigcon_models::research::{ResearchCategory, ResearchRecord, RESEARCH_TABLE_DDL};
use tracing::debug;

use crate::error::StoreError;
use crate::repository::{new_record, ResearchRepository};

/// SQLite-backed research repository.
///
/// Access is synchronized via `Mutex` since `rusqlite::Connection` is not
/// `Sync`. The lock is never held across an await point.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) the database file. Creates the schema if it doesn't
    /// exist and enables WAL so readers can follow along while cycles write.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(RESEARCH_TABLE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(RESEARCH_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    pub fn insert(&self, record: &ResearchRecord) -> Result<(), StoreError> {
        let data_json = serde_json::to_string(&record.data)?;
        let meta_json = serde_json::to_string(&record.metadata)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO research_entries \
             (path, title, category, data_json, meta_json, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                record.path,
                record.title,
                record.category.as_str(),
                data_json,
                meta_json,
                record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    /// Most recent records in a category, newest first.
    pub fn recent(
        &self,
        category: ResearchCategory,
        limit: usize,
    ) -> Result<Vec<ResearchRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT path, title, data_json, meta_json, created_at \
             FROM research_entries WHERE category = ?1 \
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![category.as_str(), limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (path, title, data_json, meta_json, created_at) in rows {
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::Unavailable(format!("bad timestamp on {path}: {e}")))?;
            records.push(ResearchRecord {
                path,
                title,
                category,
                data: serde_json::from_str(&data_json)?,
                metadata: serde_json::from_str(&meta_json)?,
                created_at,
            });
        }
        Ok(records)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: usize =
            conn.query_row("SELECT COUNT(*) FROM research_entries", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl ResearchRepository for SqliteRepository {
    async fn store_research(
        &self,
        title: &str,
        category: ResearchCategory,
        data: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Result<String, StoreError> {
        let record = new_record(title, category, data, metadata);
        self.insert(&record)?;
        debug!(path = %record.path, category = %category, "Stored research record");
        Ok(record.path)
    }
}
