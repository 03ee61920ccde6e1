use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use sigcon_agents::{AgentError, FeedSource};
use sigcon_models::signal::RawSignal;
use tracing::{debug, warn};

const DONE_SUFFIX: &str = "done";
const REJECTED_SUFFIX: &str = "rejected";

/// A spool file holds either one raw signal or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum SpoolPayload {
    Many(Vec<RawSignal>),
    One(RawSignal),
}

/// Feed backed by a directory of JSON files dropped by an external scorer.
///
/// Each poll reads every `*.json` file in name order. The files read are only
/// renamed to `*.json.done` on acknowledge, after their signals are buffered;
/// a fetch cut short by the poll timeout leaves them in place for the next
/// poll. Files that do not parse are renamed to `*.json.rejected` right away
/// so they are not retried.
pub struct SpoolFeed {
    name: String,
    domain: String,
    dir: PathBuf,
    read: Mutex<Vec<PathBuf>>,
}

impl SpoolFeed {
    pub fn new(name: impl Into<String>, domain: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            dir: dir.into(),
            read: Mutex::new(Vec::new()),
        }
    }

    fn read_files(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.read.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn pending_files(&self) -> Result<Vec<PathBuf>, AgentError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            AgentError::Feed(format!("cannot read spool {}: {e}", self.dir.display()))
        })?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AgentError::Feed(format!("cannot list spool {}: {e}", self.dir.display())))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn retire(&self, path: &Path, suffix: &str) {
        let mut target = path.as_os_str().to_owned();
        target.push(".");
        target.push(suffix);
        if let Err(e) = tokio::fs::rename(path, &target).await {
            warn!(feed = %self.name, file = %path.display(), error = %e, "Failed to retire spool file");
        }
    }
}

#[async_trait]
impl FeedSource for SpoolFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    async fn process_data(&self) -> Result<Vec<RawSignal>, AgentError> {
        self.read_files().clear();
        let mut signals = Vec::new();
        for path in self.pending_files().await? {
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) => {
                    warn!(feed = %self.name, file = %path.display(), error = %e, "Failed to read spool file");
                    continue;
                }
            };
            match serde_json::from_str::<SpoolPayload>(&contents) {
                Ok(SpoolPayload::Many(batch)) => {
                    debug!(feed = %self.name, file = %path.display(), count = batch.len(), "Spool batch read");
                    signals.extend(batch);
                    self.read_files().push(path);
                }
                Ok(SpoolPayload::One(signal)) => {
                    signals.push(signal);
                    self.read_files().push(path);
                }
                Err(e) => {
                    warn!(feed = %self.name, file = %path.display(), error = %e, "Rejected malformed spool file");
                    self.retire(&path, REJECTED_SUFFIX).await;
                }
            }
        }
        Ok(signals)
    }

    async fn acknowledge(&self) -> Result<(), AgentError> {
        let consumed = std::mem::take(&mut *self.read_files());
        for path in &consumed {
            self.retire(path, DONE_SUFFIX).await;
        }
        debug!(feed = %self.name, files = consumed.len(), "Spool files consumed");
        Ok(())
    }
}
