//! Configuration types for the ledger and its store backend.

use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result, constants};

/// Top-level ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Which Ledger Store backend to open.
    #[serde(default)]
    pub store: StoreConfig,
}

impl LedgerConfig {
    /// Parse a JSON configuration document and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LedgerError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no backend can run with.
    pub fn validate(&self) -> Result<()> {
        self.store.validate()
    }
}

/// Ledger Store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Volatile in-process store.
    Memory,
    /// SQLite database file.
    Sqlite {
        /// Path to the database file.
        #[serde(default = "default_db_path")]
        path: String,
        /// How long a write waits on a locked database before failing.
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

impl StoreConfig {
    /// SQLite at `path` with the default busy timeout.
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::Sqlite {
            path: path.into(),
            busy_timeout_ms: constants::DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Memory => Ok(()),
            Self::Sqlite {
                path,
                busy_timeout_ms,
            } => {
                if path.trim().is_empty() {
                    return Err(LedgerError::Configuration(
                        "sqlite path must not be empty".into(),
                    ));
                }
                if *busy_timeout_ms == 0 {
                    return Err(LedgerError::Configuration(
                        "sqlite busy_timeout_ms must be > 0".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::sqlite(constants::DEFAULT_DB_PATH)
    }
}

fn default_db_path() -> String {
    constants::DEFAULT_DB_PATH.to_string()
}

fn default_busy_timeout_ms() -> u64 {
    constants::DEFAULT_BUSY_TIMEOUT_MS
}
