//! Error types for the models builder

use std::path::PathBuf;

use thiserror::Error;

/// Result type for models builder operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Models builder errors
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Published property type not found: {content_type}.{property}")]
    PublishedPropertyTypeNotFound { content_type: String, property: String },

    #[error("Cyclic parent/composition relation involving content type '{alias}'")]
    CyclicRelation { alias: String },

    #[error("Don't know how to map model type with content type alias '{alias}' (referenced from '{model}')")]
    UnresolvedModelType { alias: String, model: String },

    #[error("Content type '{model}' references type id {id} which is not in the model list")]
    UnresolvedRelation { model: String, id: i32 },

    #[error("A build is already running for {0}")]
    BuildInProgress(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
