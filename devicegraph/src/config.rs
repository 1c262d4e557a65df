//! Editor settings, read from an optional JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::DeviceGraphError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one file per category.
    pub data_dir: PathBuf,
    pub tick_interval_ms: u64,
    pub scheme_extension: String,
    pub report_extension: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            tick_interval_ms: 1000,
            scheme_extension: "sch".to_string(),
            report_extension: "txt".to_string(),
        }
    }
}

impl Settings {
    /// Read settings from `path`; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, DeviceGraphError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map_err(|e| DeviceGraphError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
