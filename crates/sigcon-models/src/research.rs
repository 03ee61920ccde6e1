use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Categories for organizing persisted research.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResearchCategory {
    /// Per-cycle buffer snapshots from Directors and the Kernel.
    Analysis,
    /// Executive summaries.
    Reports,
    /// Full consensus decisions with every evaluation.
    Consensus,
}

impl ResearchCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ResearchCategory::Analysis => "analysis",
            ResearchCategory::Reports => "reports",
            ResearchCategory::Consensus => "consensus",
        }
    }
}

impl std::fmt::Display for ResearchCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The SQLite table the research repository writes to.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS research_entries (
///     path        TEXT PRIMARY KEY,
///     title       TEXT NOT NULL,
///     category    TEXT NOT NULL,
///     data_json   TEXT NOT NULL,
///     meta_json   TEXT NOT NULL,
///     created_at  TEXT NOT NULL
/// );
/// ```
pub const RESEARCH_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS research_entries (
    path        TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    category    TEXT NOT NULL,
    data_json   TEXT NOT NULL,
    meta_json   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_research_category ON research_entries(category);
CREATE INDEX IF NOT EXISTS idx_research_created ON research_entries(created_at);
";

/// One stored research entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchRecord {
    pub path: String,
    pub title: String,
    pub category: ResearchCategory,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Storage path for a record: `{category}/{slug}/{timestamp}-{id}`, with
/// the first 8 hex digits of the id.
///
/// The slug lowercases the title and collapses anything that is not
/// alphanumeric into single dashes, e.g. `Signals - Wall Street` becomes
/// `signals-wall-street`.
pub fn record_path(
    category: ResearchCategory,
    title: &str,
    at: DateTime<Utc>,
    id: Uuid,
) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "untitled" } else { slug };
    let id = id.simple().to_string();
    format!(
        "{category}/{slug}/{}-{}",
        at.format("%Y%m%dT%H%M%S%.6fZ"),
        &id[..8]
    )
}
