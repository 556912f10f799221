//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/restree/restree.toml`
//! 3. Local config: `.restree.toml` next to the record file
//! 4. Environment variables: `RESTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::LinkFields;

/// Raw settings for intermediate parsing (every field optional to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub id_field: Option<String>,
    pub parent_field: Option<String>,
    pub label_field: Option<String>,
    pub strict: Option<bool>,
}

/// Unified configuration for restree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Field holding a record's id (default: "id")
    pub id_field: String,
    /// Field holding a record's parent id (default: "pid")
    pub parent_field: String,
    /// Field shown when rendering records; whole record when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,
    /// Reject malformed records instead of absorbing them
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let fields = LinkFields::default();
        Self {
            id_field: fields.id,
            parent_field: fields.parent,
            label_field: None,
            strict: false,
        }
    }
}

/// Get the XDG config directory for restree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "restree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("restree.toml"))
}

/// Get the path to the local config file in a data directory.
pub fn local_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(".restree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Linking field names for the tree builder.
    pub fn link_fields(&self) -> LinkFields {
        LinkFields::new(self.id_field.clone(), self.parent_field.clone())
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            id_field: overlay
                .id_field
                .clone()
                .unwrap_or_else(|| self.id_field.clone()),
            parent_field: overlay
                .parent_field
                .clone()
                .unwrap_or_else(|| self.parent_field.clone()),
            label_field: overlay
                .label_field
                .clone()
                .or_else(|| self.label_field.clone()),
            strict: overlay.strict.unwrap_or(self.strict),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `data_dir` - Optional directory holding the record file, searched for a local config
    pub fn load(data_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = data_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        Self::apply_env_overrides(current)
    }

    /// Apply RESTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("RESTREE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("id_field") {
            settings.id_field = val;
        }
        if let Ok(val) = config.get_string("parent_field") {
            settings.parent_field = val;
        }
        if let Ok(val) = config.get_string("label_field") {
            settings.label_field = Some(val);
        }
        if let Ok(val) = config.get_bool("strict") {
            settings.strict = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# restree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/restree/restree.toml
#   Local:  .restree.toml next to the record file
#   Env:    RESTREE_* environment variables

# Field holding a record's own id
# id_field = "id"

# Field holding the parent's id (0, "" or null mean "no parent")
# parent_field = "pid"

# Field shown when rendering trees and flat lists
# label_field = "title"

# Reject missing/duplicate ids and cyclic parent chains
# strict = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
