//! Application configuration for ProtocolBuilder.
//!
//! User config lives at `~/.protocolbuilder/protocolbuilder.toml`.
//! Caller-supplied options override config file values, which override
//! defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolBuilderError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "protocolbuilder.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".protocolbuilder";

// ---------------------------------------------------------------------------
// Config structs (matching protocolbuilder.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Builder settings.
    #[serde(default)]
    pub builder: BuilderConfig,
}

/// `[registry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Whether path resolution registers named entities it navigates to
    /// that are missing from the identity maps.
    #[serde(default)]
    pub auto_register_on_path_miss: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auto_register_on_path_miss: false,
        }
    }
}

/// How the builder mints ids for entities created without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStyle {
    /// `"{Type}{separator}{counter}"` — deterministic within a pass.
    Sequential,
    /// UUID v7 strings — unique across passes and processes.
    Uuid,
}

/// `[builder]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Id assignment style.
    #[serde(default = "default_id_style")]
    pub id_style: IdStyle,

    /// Separator between type tag and counter for sequential ids.
    #[serde(default = "default_id_separator")]
    pub id_separator: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            id_style: default_id_style(),
            id_separator: default_id_separator(),
        }
    }
}

fn default_id_style() -> IdStyle {
    IdStyle::Sequential
}
fn default_id_separator() -> String {
    "_".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.protocolbuilder/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProtocolBuilderError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.protocolbuilder/protocolbuilder.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ProtocolBuilderError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ProtocolBuilderError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ProtocolBuilderError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config)
        .map_err(|e| ProtocolBuilderError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ProtocolBuilderError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("auto_register_on_path_miss"));
        assert!(toml_str.contains("id_style"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert!(!parsed.registry.auto_register_on_path_miss);
        assert_eq!(parsed.builder.id_style, IdStyle::Sequential);
        assert_eq!(parsed.builder.id_separator, "_");
    }

    #[test]
    fn config_with_overrides() {
        let toml_str = r#"
[registry]
auto_register_on_path_miss = true

[builder]
id_style = "uuid"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.registry.auto_register_on_path_miss);
        assert_eq!(config.builder.id_style, IdStyle::Uuid);
        // Untouched fields keep their defaults
        assert_eq!(config.builder.id_separator, "_");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").expect("parse empty");
        assert!(!config.registry.auto_register_on_path_miss);
        assert_eq!(config.builder.id_style, IdStyle::Sequential);
    }
}
