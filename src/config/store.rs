use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Object store and commit engine settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Reject every property write on objects that match no schema class
    #[serde(default)]
    pub strict_schema: bool,

    /// Upper bound on mutations staged in one transaction
    #[serde(default = "default_max_transaction_size")]
    pub max_transaction_size: usize,

    /// TOML schema file loaded at startup
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// JSON object tree (`{dn: {prop: value}}`) imported at startup
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            strict_schema: false,
            max_transaction_size: default_max_transaction_size(),
            schema_path: None,
            seed_path: None,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_transaction_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "store.max_transaction_size must be greater than 0".into(),
            )));
        }

        for (name, path) in [("schema_path", &self.schema_path), ("seed_path", &self.seed_path)] {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(Error::Config(ConfigError::Message(format!(
                        "store.{name} {} does not exist",
                        path.display()
                    ))));
                }
            }
        }

        Ok(())
    }
}

fn default_max_transaction_size() -> usize {
    10_000
}
