//! Application settings.
//!
//! Settings are read from a JSON file and never written back. The file is
//! optional: without one, compiled defaults apply. Command-line flags always
//! win over anything loaded here.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the settings file inside the configuration directory.
const SETTINGS_FILE: &str = "settings.json";

/// Default location of the settings file (`~/.config/portprobe/settings.json`
/// on Linux), if a home directory can be determined.
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "portprobe").map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

/// Defaults for scan options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    /// Maximum probes in flight.
    pub concurrency: usize,
    /// Per-probe connect timeout in milliseconds.
    pub timeout_ms: u64,
    /// Probe dispatches per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Extra attempts for filtered or failed probes.
    pub retries: u32,
    /// How long to wait for a banner on open ports, in milliseconds.
    pub banner_wait_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            concurrency: 500,
            timeout_ms: 3000,
            rate_limit: 0,
            retries: 0,
            banner_wait_ms: 1000,
        }
    }
}

impl AppSettings {
    /// Load settings.
    ///
    /// An explicit `path` must exist. Without one the default location is
    /// tried and a missing file there simply yields the defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match default_settings_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => {
                    debug!("no settings file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| read_failed(path, &e))?;
        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}

fn read_failed(path: &Path, e: &io::Error) -> ConfigError {
    ConfigError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
