use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a scan before any analysis happens.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Path '{}' does not exist", .0.display())]
    RootNotFound(PathBuf),

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to read directory '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config file '{}': {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("Failed to read baseline file '{}': {source}", path.display())]
    BaselineRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse baseline file '{}': {message}", path.display())]
    BaselineParse { path: PathBuf, message: String },
}

/// Per-file failures. The loader logs these and moves on.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
