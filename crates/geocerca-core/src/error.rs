use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid coordinate ({lat}, {lng}): {reason}")]
    InvalidCoordinate { lat: f64, lng: f64, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read hierarchy file {path}: {source}")]
    HierarchyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse hierarchy file: {0}")]
    HierarchyFileParse(#[from] serde_yaml::Error),

    #[error("hierarchy validation failed: {0}")]
    Validation(String),
}
