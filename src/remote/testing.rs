//! Header fetcher doubles for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::fetcher::{FetchOutcome, HeaderFetcher};
use crate::{CacheNameError, Result};

/// Answers every URL with the same outcome.
pub(crate) struct StaticFetcher {
    outcome: FetchOutcome,
}

impl StaticFetcher {
    pub(crate) fn headers(lines: &[&str]) -> Self {
        StaticFetcher {
            outcome: FetchOutcome::Headers(
                lines.iter().map(|line| line.to_string()).collect(),
            ),
        }
    }

    pub(crate) fn failed(reason: &str) -> Self {
        StaticFetcher {
            outcome: FetchOutcome::Failed(reason.to_owned()),
        }
    }
}

#[async_trait]
impl HeaderFetcher for StaticFetcher {
    async fn fetch_headers(&self, _url: &str) -> Result<FetchOutcome> {
        Ok(self.outcome.clone())
    }
}

/// Behaves like a fetcher whose program is missing.
pub(crate) struct BrokenFetcher;

#[async_trait]
impl HeaderFetcher for BrokenFetcher {
    async fn fetch_headers(&self, _url: &str) -> Result<FetchOutcome> {
        Err(CacheNameError::FetcherUnavailable(
            "curl: No such file or directory".into(),
        ))
    }
}

/// Never answers before `delay`.
pub(crate) struct SlowFetcher {
    delay: Duration,
}

impl SlowFetcher {
    pub(crate) fn new(delay: Duration) -> Self {
        SlowFetcher { delay }
    }
}

#[async_trait]
impl HeaderFetcher for SlowFetcher {
    async fn fetch_headers(&self, _url: &str) -> Result<FetchOutcome> {
        tokio::time::sleep(self.delay).await;
        Ok(FetchOutcome::Headers(vec!["ETag: \"late\"".into()]))
    }
}

/// Records how many retrievals ran and how many overlapped.
pub(crate) struct CountingFetcher {
    delay: Duration,
    in_flight: AtomicUsize,
    pub(crate) calls: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl CountingFetcher {
    pub(crate) fn new(delay: Duration) -> Self {
        CountingFetcher {
            delay,
            in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl HeaderFetcher for CountingFetcher {
    async fn fetch_headers(&self, url: &str) -> Result<FetchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(FetchOutcome::Headers(vec![format!("ETag: \"{}\"", url)]))
    }
}
