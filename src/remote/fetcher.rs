use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use reqwest::header::HeaderValue;

use crate::{CacheNameError, Result};

/// Outcome of a header-only retrieval that could be attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Raw `Name: value` lines. Curl reports every response of a redirect
    /// chain, the native client only the final one, so the two may name a
    /// redirecting URL differently.
    Headers(Vec<String>),
    /// The target could not be reached or answered with an error status
    Failed(String),
}

/// Retrieves the response headers of a URL without its body.
///
/// `Err` is reserved for a broken environment where the retrieval cannot be
/// attempted at all. Anything that goes wrong with the target itself is a
/// [`FetchOutcome::Failed`].
#[async_trait]
pub trait HeaderFetcher: Send + Sync {
    async fn fetch_headers(&self, url: &str) -> Result<FetchOutcome>;
}

/// Native HEAD request, following redirects.
pub struct HttpHeaderFetcher {
    client: reqwest::Client,
}

impl HttpHeaderFetcher {
    pub fn new() -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_static(concat!(
                "vine-cached-name/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| CacheNameError::FetcherUnavailable(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        HttpHeaderFetcher { client }
    }
}

#[async_trait]
impl HeaderFetcher for HttpHeaderFetcher {
    async fn fetch_headers(&self, url: &str) -> Result<FetchOutcome> {
        let response = match self.client.head(url).send().await {
            Ok(response) => response,
            Err(e) => return Ok(FetchOutcome::Failed(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(FetchOutcome::Failed(format!("status {}", status)));
        }

        let lines = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| format!("{}: {}", name, value))
            })
            .collect();
        Ok(FetchOutcome::Headers(lines))
    }
}

/// Runs `curl -I -L` and reads the headers from its output.
///
/// The URL is handed over with `--url`, so a source starting with `-` is never
/// taken for an option. The child process is killed if the retrieval is
/// dropped before it exits.
pub struct CurlHeaderFetcher {
    program: PathBuf,
}

impl CurlHeaderFetcher {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        CurlHeaderFetcher {
            program: program.into(),
        }
    }
}

impl Default for CurlHeaderFetcher {
    fn default() -> Self {
        Self::new("curl")
    }
}

#[async_trait]
impl HeaderFetcher for CurlHeaderFetcher {
    async fn fetch_headers(&self, url: &str) -> Result<FetchOutcome> {
        let output = tokio::process::Command::new(&self.program)
            .args(["-I", "-L", "--silent", "--show-error", "--fail"])
            .args(["--url", url])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CacheNameError::FetcherUnavailable(format!(
                    "{}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(FetchOutcome::Failed(format!(
                "{}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let lines = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim_end().to_owned())
            .collect();
        Ok(FetchOutcome::Headers(lines))
    }
}
