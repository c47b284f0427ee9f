//! Engine options loaded from TOML
//!
//! ```toml
//! log_level = "debug"
//! stream_cache = true
//!
//! [persistence]
//! default = 60.0
//!
//! [persistence.per_kind]
//! texture = 120.0
//! sound = 15.0
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Idle-time budgets (seconds) for unreferenced cached resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceOptions {
    /// Budget for any resource kind without its own entry
    pub default: f64,
    /// Budget by resource kind ("texture", "material", "sound", ...)
    pub per_kind: BTreeMap<String, f64>,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self {
            default: 60.0,
            per_kind: BTreeMap::new(),
        }
    }
}

/// Engine-wide options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub log_level: String,
    /// Route document reads through the in-memory stream cache
    pub stream_cache: bool,
    pub persistence: PersistenceOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stream_cache: false,
            persistence: PersistenceOptions::default(),
        }
    }
}

impl EngineOptions {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let options = Self::from_toml_str(&text).map_err(|e| e.with_path(path))?;
        tracing::info!("Loaded engine options from {}", path.display());
        Ok(options)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::FileFormat {
            path: Default::default(),
            reason: e.to_string(),
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::FileFormat {
            path: Default::default(),
            reason: e.to_string(),
        })
    }

    /// Persistence budget for a resource kind
    pub fn persistence_for(&self, kind: &str) -> f64 {
        self.persistence
            .per_kind
            .get(kind)
            .copied()
            .unwrap_or(self.persistence.default)
    }
}
