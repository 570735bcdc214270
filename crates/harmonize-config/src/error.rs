use std::path::{Path, PathBuf};

use harmonize_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read project file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project file {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse project: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    #[error("project {project} declares no entities")]
    NoEntities { project: String },

    #[error("invalid entity: {0}")]
    Model(#[from] ModelError),
}

impl ConfigError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
