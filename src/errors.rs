use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheNameError>;

#[derive(Error, Debug)]
pub enum CacheNameError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown file kind: {0}")]
    UnknownFileKind(String),
    #[error("Could not run header fetcher: {0}")]
    FetcherUnavailable(String),
    #[error("No cached name assigned to file {0:?}")]
    NameNotAssigned(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Parsing error: {0}")]
    Parse(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for CacheNameError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<tokio::task::JoinError> for CacheNameError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Other(anyhow::anyhow!("blocking task failed: {}", e))
    }
}
