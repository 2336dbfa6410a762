use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Error;
use crate::Result;

/// Event dispatcher settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Execution budget for a single handler callback. A handler still running
    /// after this long is abandoned and delivery moves on.
    ///
    /// **Default**: 5000
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,

    /// Queue depth at which a warning is logged
    ///
    /// **Default**: 10000
    #[serde(default = "default_queue_warn_threshold")]
    pub queue_warn_threshold: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            handler_timeout_ms: default_handler_timeout_ms(),
            queue_warn_threshold: default_queue_warn_threshold(),
        }
    }
}

impl DispatcherConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.handler_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "dispatcher.handler_timeout_ms must be at least 1ms".into(),
            )));
        }

        if self.queue_warn_threshold == 0 {
            return Err(Error::Config(ConfigError::Message(
                "dispatcher.queue_warn_threshold must be greater than 0".into(),
            )));
        }

        if self.handler_timeout_ms > 60_000 {
            warn!(
                "dispatcher.handler_timeout_ms ({}) is above one minute; a stuck handler will hold up every later event for that long",
                self.handler_timeout_ms
            );
        }

        Ok(())
    }
}

fn default_handler_timeout_ms() -> u64 {
    5000
}

fn default_queue_warn_threshold() -> usize {
    10_000
}
