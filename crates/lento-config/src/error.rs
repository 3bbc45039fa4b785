//! Errors from settings and scenario files and from scripted runs.

use std::path::PathBuf;
use thiserror::Error;

/// Why a settings file, scenario file or scenario run failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A settings or scenario file could not be read.
    #[error("cannot read '{path}': {source}")]
    ReadFile {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A settings or scenario file could not be written.
    #[error("cannot write '{path}': {source}")]
    WriteFile {
        /// Destination file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The directory a file is saved into could not be created.
    #[error("cannot create parent directory '{path}': {source}")]
    CreateDir {
        /// Directory that `save` tried to create.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A document is not valid TOML or does not match its schema.
    #[error("invalid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Settings or a scenario could not be rendered as TOML.
    #[error("cannot encode TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The document parsed but describes settings or curves the engine
    /// cannot run.
    #[error("validation failed: {0}")]
    Validation(#[from] crate::validation::ValidationError),

    /// The smoother refused the configuration or a scripted block.
    #[error("engine error: {0}")]
    Engine(#[from] lento_core::EngineError),
}

impl ConfigError {
    /// Wrap a failed read of `path`.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Wrap a failed write of `path`.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Wrap a failure to create the parent directory `path`.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
