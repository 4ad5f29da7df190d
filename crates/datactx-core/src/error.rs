//! Error types for datactx-core

/// Result type for datactx-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in datactx-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or missing configuration field
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A top-level config key is absent and no legacy layout could stand in for it
    #[error("{message}")]
    InvalidTopLevelConfigKey { message: String },

    /// A store referenced by name is not configured
    #[error("Store configuration error: {message}")]
    StoreConfiguration { message: String },

    /// Operation not supported by, or failed inside, a store backend
    #[error("Store backend error: {message}")]
    Backend { message: String },

    /// Key absent on read
    #[error("Key not found: {key}")]
    KeyLookup { key: String },

    /// Key does not follow the schema of the backend it was given to
    #[error("Invalid key {key}: {message}")]
    InvalidKey { key: String, message: String },

    /// Caller supplied an unusable argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Datasource construction failed
    #[error("Cannot initialize datasource {name}, error: {message}")]
    DatasourceInitialization { name: String, message: String },

    /// Context-level operation rejected
    #[error("{message}")]
    DataContext { message: String },

    /// Requested metric is not present in a validation result
    #[error("Metric unavailable: {message}")]
    UnavailableMetric { message: String },

    /// Required credential fields were not supplied
    #[error("Missing credentials for {target}: {missing}")]
    MissingCredentials { target: String, missing: String },

    /// Remote store request failed
    #[error("Cloud request failed: {message}")]
    Cloud { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from datactx-fs
    #[error(transparent)]
    Fs(#[from] datactx_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn key_lookup(key: impl std::fmt::Display) -> Self {
        Self::KeyLookup {
            key: key.to_string(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn data_context(message: impl Into<String>) -> Self {
        Self::DataContext {
            message: message.into(),
        }
    }

    pub fn unavailable_metric(message: impl Into<String>) -> Self {
        Self::UnavailableMetric {
            message: message.into(),
        }
    }

    /// Whether the error reports an absent key, either from a store or the filesystem.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::KeyLookup { .. } => true,
            Self::Fs(e) => e.is_not_found(),
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
