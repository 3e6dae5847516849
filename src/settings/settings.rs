// Settings management and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::SettingsError;
use crate::library::SongSortType;

/// Local library settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    pub scan_paths: Vec<String>,
    pub folder_sort: SongSortType,
    pub folder_sort_descending: bool,
    pub collapse_storage_root: bool, // Show a single storage volume as "/storage"
    pub trim_root: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            scan_paths: vec![],
            folder_sort: SongSortType::Name,
            folder_sort_descending: false,
            collapse_storage_root: true,
            trim_root: false,
        }
    }
}

/// Queue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub persistent_queue: bool,
    pub max_queues: usize,
    pub save_delay_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            persistent_queue: true,
            max_queues: 20,
            save_delay_ms: 5000,
        }
    }
}

impl QueueSettings {
    pub fn max_queues(&self) -> usize {
        self.max_queues.max(1)
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }
}

/// Remote catalog settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub base_url: String, // Empty disables the remote catalog
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 10,
            user_agent: concat!("queueboard/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub version: i32, // Settings schema version for future migrations
    pub library: LibrarySettings,
    pub queue: QueueSettings,
    pub catalog: CatalogSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            library: LibrarySettings::default(),
            queue: QueueSettings::default(),
            catalog: CatalogSettings::default(),
        }
    }
}

impl AppSettings {
    /// Application data directory, falling back to the working directory
    pub fn default_app_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("queueboard")
    }

    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self, SettingsError> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            info!("no settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let settings: AppSettings = serde_json::from_str(&content)?;

        info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<(), SettingsError> {
        fs::create_dir_all(app_dir)?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;

        info!("saved settings to {}", path.display());
        Ok(())
    }
}
