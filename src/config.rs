//! Configuration management for the models builder
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (models-builder.toml)
//! - Environment variables (MODELS_BUILDER__*)
//!
//! ## Example config file (models-builder.toml):
//! ```toml
//! [source]
//! schema_path = "schema.json"
//!
//! [models]
//! default_namespace = "Umbraco.Cms.Web.Common.PublishedModels"
//! models_path = "umbraco/models"
//! use_directories = true
//! delete_generated_files = true
//!
//! [models.editor_config]
//! indent_size = 4
//! indent_style = "space"
//!
//! [[models.containers]]
//! directory = "Blog"
//! root_ids = [1050]
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{BuildError, Result};
use crate::model::ContentTypeKind;

/// Main configuration for the models builder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsBuilderConfig {
    /// Where the schema is read from
    #[serde(default)]
    pub source: SourceConfig,

    /// Generator settings
    #[serde(default)]
    pub models: GeneratorSettings,
}

/// Schema source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the JSON schema export
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,
}

/// How models are produced, reported by status queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelsMode {
    Nothing,
    #[default]
    SourceCodeManual,
    SourceCodeAuto,
}

impl fmt::Display for ModelsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "Nothing"),
            Self::SourceCodeManual => write!(f, "SourceCodeManual"),
            Self::SourceCodeAuto => write!(f, "SourceCodeAuto"),
        }
    }
}

/// Indentation style of generated files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    #[default]
    Space,
    Tab,
}

/// Editor preferences applied to generated source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfigSettings {
    #[serde(default = "default_indent_size")]
    pub indent_size: usize,

    #[serde(default)]
    pub indent_style: IndentStyle,
}

/// A configured container: types it includes are generated below `directory`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSettings {
    /// Sub-directory (and namespace segment) for included types
    pub directory: String,

    /// Only include types of this kind
    #[serde(default)]
    pub kind: Option<ContentTypeKind>,

    /// Include types with one of these aliases
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Include types that are, or descend from, one of these ids
    #[serde(default)]
    pub root_ids: Vec<i32>,
}

/// Settings for a single generator run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Namespace of generated models (kind suffixes are appended)
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Root directory of generated files
    #[serde(default = "default_models_path")]
    pub models_path: PathBuf,

    /// Nest models in directories/namespaces by kind
    #[serde(default = "default_true")]
    pub use_directories: bool,

    /// Delete previously generated files before writing new ones
    #[serde(default)]
    pub delete_generated_files: bool,

    /// Emit Newtonsoft.Json attributes from property serialization settings
    #[serde(default = "default_true")]
    pub emit_json_attributes: bool,

    #[serde(default)]
    pub mode: ModelsMode,

    #[serde(default)]
    pub editor_config: EditorConfigSettings,

    /// Ordered inclusion containers
    #[serde(default)]
    pub containers: Vec<ContainerSettings>,
}

// Default value functions
fn default_schema_path() -> PathBuf {
    PathBuf::from("schema.json")
}

fn default_namespace() -> String {
    "Umbraco.Cms.Web.Common.PublishedModels".to_string()
}

fn default_models_path() -> PathBuf {
    PathBuf::from("umbraco/models")
}

fn default_indent_size() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            schema_path: default_schema_path(),
        }
    }
}

impl Default for EditorConfigSettings {
    fn default() -> Self {
        Self {
            indent_size: default_indent_size(),
            indent_style: IndentStyle::Space,
        }
    }
}

impl EditorConfigSettings {
    /// One level of indentation
    pub fn indent_unit(&self) -> String {
        match self.indent_style {
            IndentStyle::Space => " ".repeat(self.indent_size),
            IndentStyle::Tab => "\t".to_string(),
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
            models_path: default_models_path(),
            use_directories: true,
            delete_generated_files: false,
            emit_json_attributes: true,
            mode: ModelsMode::default(),
            editor_config: EditorConfigSettings::default(),
            containers: Vec::new(),
        }
    }
}

impl GeneratorSettings {
    pub fn new(default_namespace: impl Into<String>, models_path: impl Into<PathBuf>) -> Self {
        Self {
            default_namespace: default_namespace.into(),
            models_path: models_path.into(),
            ..Self::default()
        }
    }

    /// Reject settings a run cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.default_namespace.trim().is_empty() {
            return Err(BuildError::Configuration("default_namespace is not set".to_string()));
        }
        if self.models_path.as_os_str().is_empty() {
            return Err(BuildError::Configuration("models_path is not set".to_string()));
        }
        if self.editor_config.indent_style == IndentStyle::Space && self.editor_config.indent_size == 0 {
            return Err(BuildError::Configuration("editor_config.indent_size must be positive".to_string()));
        }
        Ok(())
    }

    /// The models root, resolving relative paths against the working directory
    pub fn models_path_absolute(&self) -> PathBuf {
        if self.models_path.is_absolute() {
            self.models_path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.models_path)
        }
    }
}

impl ModelsBuilderConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "models-builder.toml",
            ".models-builder.toml",
            "config/models-builder.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "models-builder", "models-builder") {
            let xdg_config = config_dir.config_dir().join("models-builder.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // MODELS_BUILDER__MODELS__DEFAULT_NAMESPACE=...
        builder = builder.add_source(
            Environment::with_prefix("MODELS_BUILDER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> std::io::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelsBuilderConfig::default();
        assert!(config.models.use_directories);
        assert!(!config.models.delete_generated_files);
        assert_eq!(config.models.editor_config.indent_size, 4);
        assert!(config.models.validate().is_ok());
    }

    #[test]
    fn test_serialize_config() {
        let config = ModelsBuilderConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[models]"));
    }

    #[test]
    fn test_parse_containers() {
        let toml_str = r#"
            [models]
            default_namespace = "My.Models"

            [[models.containers]]
            directory = "Blog"
            kind = "content"
            root_ids = [1050]
        "#;
        let config: ModelsBuilderConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.models.default_namespace, "My.Models");
        assert_eq!(config.models.containers.len(), 1);
        assert_eq!(config.models.containers[0].kind, Some(ContentTypeKind::Content));
        assert_eq!(config.models.models_path, PathBuf::from("umbraco/models"));
    }

    #[test]
    fn test_validate_rejects_empty_settings() {
        let settings = GeneratorSettings::new("  ", "models");
        assert!(matches!(settings.validate(), Err(BuildError::Configuration(_))));

        let settings = GeneratorSettings::new("My.Models", "");
        assert!(matches!(settings.validate(), Err(BuildError::Configuration(_))));
    }

    #[test]
    fn test_indent_unit() {
        let mut editor = EditorConfigSettings::default();
        assert_eq!(editor.indent_unit(), "    ");
        editor.indent_style = IndentStyle::Tab;
        assert_eq!(editor.indent_unit(), "\t");
    }
}
