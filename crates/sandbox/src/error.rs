use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no free sandbox name for `{prefix}` after {attempts} attempts")]
    AttemptsExhausted { prefix: String, attempts: u32 },
    #[error("could not canonicalise '{path}': {source}")]
    PathResolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not create new file '{path}': {source}")]
    FileCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("sandbox root is already configured as {current}")]
    RootAlreadyConfigured { current: PathBuf },
    #[error(transparent)]
    Config(#[from] testdirs_config::Error),
}

impl Error {
    #[must_use]
    pub fn directory_creation(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DirectoryCreation {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn path_resolution(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PathResolution {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn file_creation(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileCreation {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
