//! Error types for `specatlas-registry`.

use thiserror::Error;

/// Main error type for registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The spec id is not present in the registry.
    #[error("Spec not found: {0}")]
    SpecNotFound(String),

    #[error("Load error: failed to fetch spec from '{url}': {message}")]
    SpecFetch { url: String, message: String },

    #[error("Load error: failed to read spec body from '{url}': {message}")]
    SpecReadBody { url: String, message: String },

    #[error("Load error: failed to read spec file '{path}': {source}")]
    SpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Load error: failed to parse spec from '{location}': {source}")]
    SpecParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Document-shape errors (unrecognized version, missing paths, bad URLs).
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// `$ref` resolution errors.
    #[error("Reference error: {0}")]
    Reference(String),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML errors.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
