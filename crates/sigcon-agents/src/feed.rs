use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sigcon_models::config::BufferConfig;
use sigcon_models::signal::{RawSignal, Signal};
use tracing::{debug, warn};

use crate::buffer::SignalBuffer;
use crate::error::AgentError;

/// Anything that can produce raw signals: news scoring, market polling,
/// macro scraping. Mockable for testing.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn name(&self) -> &str;
    fn domain(&self) -> &str;

    async fn process_data(&self) -> Result<Vec<RawSignal>, AgentError>;

    /// Called once the last fetch is buffered. Sources that consume their
    /// input (files, queues) commit here, so a fetch dropped by the timeout
    /// is delivered again on the next poll.
    async fn acknowledge(&self) -> Result<(), AgentError> {
        Ok(())
    }
}

/// The lowest aggregation level: one source plus its buffer.
pub struct FeedAgent {
    source: Box<dyn FeedSource>,
    buffer: Mutex<SignalBuffer>,
    fetch_timeout: Duration,
    cycle: tokio::sync::Mutex<()>,
}

impl FeedAgent {
    pub fn new(source: Box<dyn FeedSource>, config: &BufferConfig) -> Self {
        let buffer = SignalBuffer::new(
            source.name(),
            source.domain(),
            config.signal_threshold,
            config.max_buffer_size,
        );
        Self {
            source,
            buffer: Mutex::new(buffer),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_seconds),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn domain(&self) -> &str {
        self.source.domain()
    }

    fn buffer(&self) -> MutexGuard<'_, SignalBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch once from the source and buffer the results. Returns how many
    /// signals were added. A failed or slow fetch leaves the buffer untouched.
    pub async fn poll(&self) -> Result<usize, AgentError> {
        let _guard = self
            .cycle
            .try_lock()
            .map_err(|_| AgentError::CycleInProgress(self.name().to_string()))?;

        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.process_data()).await;
        let raw = match fetched {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(feed = %self.name(), error = %e, "Feed fetch failed");
                return Err(e);
            }
            Err(_) => {
                let secs = self.fetch_timeout.as_secs();
                warn!(feed = %self.name(), timeout_secs = secs, "Feed fetch timed out");
                return Err(AgentError::Timeout(secs));
            }
        };

        let count = raw.len();
        {
            let mut buffer = self.buffer();
            for signal in raw {
                buffer.add_signal(signal);
            }
            debug!(feed = %self.name(), count, buffered = buffer.len(), "Feed polled");
        }

        if let Err(e) = self.source.acknowledge().await {
            warn!(feed = %self.name(), error = %e, "Feed acknowledge failed");
        }
        Ok(count)
    }

    /// Buffer a single raw signal directly.
    pub fn add_signal(&self, raw: RawSignal) -> Signal {
        self.buffer().add_signal(raw)
    }

    pub fn significant_signals(&self) -> Vec<Signal> {
        self.buffer().significant_signals()
    }

    pub fn all_signals(&self) -> Vec<Signal> {
        self.buffer().all_signals()
    }

    pub fn clear_buffer(&self) {
        self.buffer().clear();
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.buffer().last_update()
    }
}
