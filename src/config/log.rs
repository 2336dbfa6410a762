use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Dn;
use crate::DnPattern;
use crate::Error;
use crate::Result;

/// A watch registered by the daemon's logging handler
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    pub dn: String,

    #[serde(default)]
    pub pattern: String,

    #[serde(default)]
    pub download: bool,
}

/// Daemon log output and the watches whose events it records
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default)]
    pub watch: Vec<WatchSpec>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            watch: Vec::new(),
        }
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_file.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message("log.log_file cannot be empty".into())));
        }

        for spec in &self.watch {
            let base = Dn::parse(&spec.dn).map_err(|e| {
                Error::Config(ConfigError::Message(format!("log.watch: {e}")))
            })?;
            DnPattern::scoped(&base, &spec.pattern).map_err(|e| {
                Error::Config(ConfigError::Message(format!("log.watch: {e}")))
            })?;
        }

        Ok(())
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_file() -> String {
    "dme.log".to_string()
}
