//! On-disk state format
//!
//! A single JSON document, schema version 3:
//!
//! ```json
//! { "version": 3, "vectors": {"panic": 0.1, ...}, "energy": 1.0,
//!   "active_mode": "RATIONALIZATION", "trust": 50.0,
//!   "last_transition_time": 0.0,
//!   "memory": { "episodes": [...], "facts": {...} } }
//! ```
//!
//! Older files used `_v`, `defense`, `last_defense_change` and `semantic`;
//! those spellings are still read. Every field is optional on the way in and
//! a field that fails to parse is treated as missing, so a damaged file
//! degrades to defaults field by field instead of failing as a whole.

use crate::error::{PersistError, Result};
use crate::store::MemorySnapshot;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Files without a version marker predate versioning.
const UNVERSIONED: u32 = 1;

fn unversioned() -> u32 {
    UNVERSIONED
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(alias = "_v", default = "unversioned", deserialize_with = "lenient_version")]
    pub version: u32,
    #[serde(default, deserialize_with = "lenient_numbers")]
    pub vectors: BTreeMap<String, f32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub energy: Option<f32>,
    #[serde(
        alias = "defense",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub trust: Option<f32>,
    #[serde(
        alias = "last_defense_change",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySnapshot>,
}

/// Parse anything; keep it only if it has the expected shape.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            tracing::warn!("Ignoring malformed field in persisted state: {}", e);
            Ok(None)
        }
    }
}

fn lenient_version<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .or_else(|| value.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64))
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(UNVERSIONED))
}

/// A name -> number map where non-numeric entries are dropped.
fn lenient_numbers<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let Some(object) = value.as_object() else {
        tracing::warn!("Persisted vectors are not a mapping, ignoring");
        return Ok(BTreeMap::new());
    };
    Ok(object
        .iter()
        .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n as f32)))
        .collect())
}

impl PersistedState {
    /// Files older than `current` only carry the scalar state; their memory
    /// section is not trusted.
    pub fn is_legacy(&self, current: u32) -> bool {
        self.version < current
    }
}

/// Read a state file. A missing, unreadable or malformed file yields `None`
/// and is logged, never raised.
pub fn read_state(path: &Path) -> Option<PersistedState> {
    if !path.exists() {
        tracing::info!("No persisted state at {}, using defaults", path.display());
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read state file {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<PersistedState>(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!("Malformed state file {}, using defaults: {}", path.display(), e);
            None
        }
    }
}

/// Write `state` to `path` atomically: a temporary file in the same
/// directory is written in full, then renamed over the target.
pub fn write_state(path: &Path, state: &PersistedState) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    serde_json::to_writer_pretty(&mut tmp, state)?;
    tmp.flush().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
