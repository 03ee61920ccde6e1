use std::path::Path;

use serde::{Deserialize, Serialize};
use sigcon_models::config::SigconConfig;

use crate::error::DaemonError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    #[serde(flatten)]
    pub core: SigconConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Spool-directory feeds, each attached to one director.
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    /// Seconds between feed polls.
    #[serde(default = "default_feed_poll")]
    pub feed_poll_seconds: u64,
    #[serde(default = "default_cycle")]
    pub director_interval_seconds: u64,
    #[serde(default = "default_cycle")]
    pub kernel_interval_seconds: u64,
    /// Seconds between tournament trading cycles.
    #[serde(default = "default_cycle")]
    pub trading_cycle_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            feed_poll_seconds: default_feed_poll(),
            director_interval_seconds: default_cycle(),
            kernel_interval_seconds: default_cycle(),
            trading_cycle_seconds: default_cycle(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    pub name: String,
    pub domain: String,
    /// Name of the director this feed reports to.
    pub director: String,
    /// Directory watched for `*.json` signal files.
    pub spool_dir: String,
}

impl DaemonConfig {
    /// Everything the core validates, plus the schedule and the feed wiring.
    pub fn validate(&self) -> Result<(), DaemonError> {
        self.core.validate()?;

        let schedule = [
            ("schedule.feed_poll_seconds", self.schedule.feed_poll_seconds),
            (
                "schedule.director_interval_seconds",
                self.schedule.director_interval_seconds,
            ),
            (
                "schedule.kernel_interval_seconds",
                self.schedule.kernel_interval_seconds,
            ),
            (
                "schedule.trading_cycle_seconds",
                self.schedule.trading_cycle_seconds,
            ),
        ];
        if let Some((field, _)) = schedule.iter().find(|(_, secs)| *secs == 0) {
            return Err(DaemonError::Config(format!("{field} must be greater than zero")));
        }

        for feed in &self.feeds {
            if !self.core.directors.iter().any(|d| d.name == feed.director) {
                return Err(DaemonError::Config(format!(
                    "feed {} reports to unknown director {}",
                    feed.name, feed.director
                )));
            }
            if !Path::new(&feed.spool_dir).is_dir() {
                return Err(DaemonError::Config(format!(
                    "spool directory for feed {} does not exist: {}",
                    feed.name, feed.spool_dir
                )));
            }
        }
        Ok(())
    }
}

fn default_feed_poll() -> u64 {
    60
}
fn default_cycle() -> u64 {
    300
}
