use std::{error::Error as StdError, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("unsupported config format: .{extension}")]
    UnsupportedFormat { extension: String },
    #[error("invalid value for {variable}: {value:?}")]
    InvalidEnv {
        variable: &'static str,
        value: String,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Error {
    #[must_use]
    pub fn parse<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Parse {
            path: path.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn invalid_env(variable: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnv {
            variable,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
