use std::{
    fs,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::remote::{CurlHeaderFetcher, HeaderFetcher, HttpHeaderFetcher};
use crate::{CacheNameError, Result};

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// How response headers of URLs are retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Native HTTP client
    Http,
    /// External `curl` program
    Curl,
}

/// Settings of a [`CacheNamer`](crate::CacheNamer).
///
/// Every field has a default, so a configuration file only lists what it
/// changes:
///
/// ```json
/// { "fetcher": "curl", "fetch_timeout_secs": 10 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamerConfig {
    pub fetcher: FetcherKind,
    /// Program run by the `curl` fetcher
    pub curl_program: PathBuf,
    /// Time allowed to a single header retrieval
    pub fetch_timeout_secs: u64,
    /// Header retrievals running at the same time
    pub max_concurrent_fetches: usize,
    /// Descriptors named at the same time by batch assignment
    pub max_concurrent_names: usize,
}

impl Default for NamerConfig {
    fn default() -> Self {
        NamerConfig {
            fetcher: FetcherKind::Http,
            curl_program: PathBuf::from("curl"),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            max_concurrent_names: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl NamerConfig {
    /// Reads a JSON configuration file and validates it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::debug!("Loading namer configuration from {:?}", path.as_ref());

        let file = fs::File::open(path.as_ref())?;
        let config: NamerConfig =
            serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(CacheNameError::Config(
                "fetch_timeout_secs must be positive".to_owned(),
            ));
        }
        if self.max_concurrent_fetches == 0
            || self.max_concurrent_fetches > Semaphore::MAX_PERMITS
        {
            return Err(CacheNameError::Config(format!(
                "max_concurrent_fetches must be between 1 and {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.max_concurrent_names == 0 {
            return Err(CacheNameError::Config(
                "max_concurrent_names must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Builds the header fetcher selected by this configuration
    pub fn build_fetcher(&self) -> Result<Arc<dyn HeaderFetcher>> {
        Ok(match self.fetcher {
            FetcherKind::Http => Arc::new(HttpHeaderFetcher::new()?),
            FetcherKind::Curl => {
                Arc::new(CurlHeaderFetcher::new(self.curl_program.clone()))
            }
        })
    }
}
