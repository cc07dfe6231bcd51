// Application settings
// Loaded from ~/.config/eurostock/config.toml

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use eurostock_recon::aggregate::DEFAULT_PLACEHOLDERS;
use eurostock_recon::{AggregateOptions, Category, CodelessPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("cannot parse {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite file holding records and the prefix table.
    /// `None` = platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Default tracing filter, overridden by `EUROSTOCK_LOG`.
    pub log_level: String,

    /// Stored codes that mean "unidentified stock".
    pub placeholder_codes: Vec<String>,

    /// Whether captures without a code may be saved.
    pub codeless_records: CodelessPolicy,

    /// Location used when a capture does not name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_location: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            log_level: "info".to_string(),
            placeholder_codes: DEFAULT_PLACEHOLDERS.iter().map(|s| s.to_string()).collect(),
            codeless_records: CodelessPolicy::Confirm,
            default_location: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eurostock")
            .join("config.toml")
    }

    /// Load settings from the default location, falling back to defaults.
    ///
    /// A missing file is created with commented defaults; an unreadable or
    /// malformed one is logged and ignored.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "using default settings");
                Self::default()
            }
        }
    }

    /// Load settings from an explicit path. Errors are returned, not swallowed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Save current settings to `path`
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Write { path: parent.to_path_buf(), source })?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
    }

    /// Effective database location.
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("eurostock")
                .join("inventory.db")
        })
    }

    /// Aggregation options honouring the configured placeholders.
    pub fn aggregate_options(&self, category: Option<Category>) -> AggregateOptions {
        AggregateOptions {
            category,
            placeholders: self.placeholder_codes.clone(),
        }
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!(error = %e, "cannot create config directory");
                return;
            }
        }

        let default_config = r#"# eurostock settings

# SQLite file for captured records and the prefix table.
# Omit to use the platform data directory.
# database = "/var/lib/eurostock/inventory.db"

# Log filter when EUROSTOCK_LOG is unset: error, warn, info, debug, trace
log_level = "info"

# Stored codes that stand for unidentified stock
placeholder_codes = ["—", "-"]

# Captures with no code: "confirm" (ask the operator) or "reject" (never save)
codeless_records = "confirm"

# Location used when a capture does not name one
# default_location = "LOJA1"
"#;

        if let Err(e) = fs::write(path, default_config) {
            tracing::warn!(error = %e, path = %path.display(), "cannot write default config");
        }
    }
}
