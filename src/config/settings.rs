//! Engine settings and paths.
//!
//! Manages the XDG-compliant location of the settings file.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{ScanType, DEFAULT_TIMEOUT, MAX_CONCURRENCY};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application directory paths following XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/gort)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the configuration directory. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("com", "gort", "gort").ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Defaults applied to every scan unless overridden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Default timeout in milliseconds.
    pub default_timeout_ms: u64,
    /// Default scan type.
    pub default_scan_type: ScanType,
    /// Ceiling on in-flight probes.
    pub max_concurrency: usize,
    /// Port specification such as "22,80,8000-8100". Common ports when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ports: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            default_scan_type: ScanType::Connect,
            max_concurrency: MAX_CONCURRENCY,
            default_ports: None,
        }
    }
}

impl EngineSettings {
    /// Load settings from the default location, or defaults if there is no file.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::discover()?.settings_file();

        if !file.exists() {
            debug!(path = %file.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}
