use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use url::Url;

use super::evidence::{scan_headers, url_cached_name, Evidence};
use super::fetcher::{FetchOutcome, HeaderFetcher};
use crate::checksum::hash_path;
use crate::{CacheNameError, Result};

const FILE_SCHEME: &str = "file://";

/// Finds identity evidence for URLs.
///
/// Header retrievals are bounded both in number, by a semaphore shared by
/// every caller of the resolver, and in duration.
pub struct UrlResolver {
    fetcher: Arc<dyn HeaderFetcher>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl UrlResolver {
    pub fn new(
        fetcher: Arc<dyn HeaderFetcher>,
        max_concurrent_fetches: usize,
        timeout: Duration,
    ) -> Self {
        UrlResolver {
            fetcher,
            permits: Arc::new(Semaphore::new(max_concurrent_fetches)),
            timeout,
        }
    }

    /// Returns the strongest evidence available for `url`.
    ///
    /// `file://` URLs are checksummed on the manager's side instead, since
    /// they only tell workers to read from a shared filesystem. An
    /// unreachable target, a timeout or an absence of usable headers all
    /// yield [`Evidence::None`]. Only a fetcher that cannot run is an error.
    pub async fn resolve(&self, url: &str) -> Result<Evidence> {
        if let Some(path) = local_redirect_path(url) {
            return self.resolve_local(url, path).await;
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| CacheNameError::Other(anyhow::anyhow!(e)))?;

        log::debug!("fetching headers for url {}", url);
        let fetch = self.fetcher.fetch_headers(url);
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(FetchOutcome::Headers(lines))) => Ok(scan_headers(lines)),
            Ok(Ok(FetchOutcome::Failed(reason))) => {
                log::warn!(
                    "Unable to fetch properties of url {} ({}), \
                     continuing optimistically",
                    url,
                    reason
                );
                Ok(Evidence::None)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                log::warn!(
                    "Fetching properties of url {} timed out after {:?}, \
                     continuing optimistically",
                    url,
                    self.timeout
                );
                Ok(Evidence::None)
            }
        }
    }

    /// Method tag and checksum naming `url`, without the `url-` prefix.
    pub async fn cached_name(&self, url: &str) -> Result<String> {
        let evidence = self.resolve(url).await?;
        log::debug!(
            "using checksum method {} for url {}",
            evidence.class().method(),
            url
        );
        Ok(url_cached_name(url, &evidence))
    }

    async fn resolve_local(
        &self,
        url: &str,
        path: PathBuf,
    ) -> Result<Evidence> {
        log::debug!("checksumming {} locally for url {}", path.display(), url);
        match tokio::task::spawn_blocking(move || hash_path(path)).await? {
            Ok(digest) => Ok(Evidence::ContentMd5(digest.checksum.0)),
            Err(e) => {
                log::warn!(
                    "Unable to checksum local target of url {} ({}), \
                     continuing optimistically",
                    url,
                    e
                );
                Ok(Evidence::None)
            }
        }
    }
}

/// Path on the manager's filesystem that a `file://` URL points to.
pub(crate) fn local_redirect_path(url: &str) -> Option<PathBuf> {
    let scheme = url.get(..FILE_SCHEME.len())?;
    if !scheme.eq_ignore_ascii_case(FILE_SCHEME) {
        return None;
    }

    let path = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(&url[FILE_SCHEME.len()..]));
    Some(path)
}
