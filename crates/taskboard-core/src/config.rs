use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const DEFAULT_RECURRENCE_INTERVAL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// JSON store used when no `--file` is given.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub recurrence_interval_secs: Option<u64>,
    /// Project used by sprint commands when none is passed explicitly.
    #[serde(default)]
    pub default_project_id: Option<Uuid>,
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/taskboard/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("taskboard/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("taskboard\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Read a config file, falling back to defaults when it is missing or malformed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Could not read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn effective_recurrence_interval_secs(&self) -> u64 {
        self.recurrence_interval_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_RECURRENCE_INTERVAL_SECS)
    }
}
