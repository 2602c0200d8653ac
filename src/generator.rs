use std::path::Path;
use std::sync::{Arc, OnceLock};

use futures::stream::{self, StreamExt};
use tokio::runtime::Runtime;

use crate::checksum::{hash_path, Checksum, PathDigest};
use crate::config::NamerConfig;
use crate::descriptor::{CachedName, FileDescriptor, FileSource};
use crate::random::{ThreadRngTokens, TokenSource, RANDOM_TOKEN_LEN};
use crate::remote::{HeaderFetcher, UrlResolver};
use crate::task::mini_task_checksum;
use crate::{CacheNameError, Result};

const CONTENT_METHOD: &str = "md5";
const RANDOM_METHOD: &str = "rnd";

/// Computes the names under which files are stored in worker caches.
///
/// Names are `<kind prefix>-<method>-<hash or token>`, so names of different
/// kinds never collide:
///
/// | Kind            | Name                                      |
/// |-----------------|-------------------------------------------|
/// | local file/dir  | `file-md5-<content>`                      |
/// | unreadable path | `file-rnd-<token>`                        |
/// | empty directory | `empty`                                   |
/// | mini task       | `task-md5-<task and output>`              |
/// | URL             | `url-<evidence method>-<hash>`            |
/// | temporary       | `temp-rnd-<token>`                        |
/// | buffer          | `buffer-md5-<content>`                    |
/// | pending buffer  | `buffer-rnd-<token>`                      |
///
/// A namer that has served [`CacheNamer::assign_blocking`] owns a runtime,
/// and must then be dropped outside of async code.
pub struct CacheNamer {
    resolver: UrlResolver,
    tokens: Arc<dyn TokenSource>,
    max_concurrent_names: usize,
    // Kept across blocking calls: pooled connections of the fetcher are
    // driven by tasks of the runtime that opened them.
    blocking_runtime: OnceLock<Runtime>,
}

impl CacheNamer {
    /// Creates a namer using the header fetcher selected by `config`
    pub fn new(config: &NamerConfig) -> Result<Self> {
        let fetcher = config.build_fetcher()?;
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(
        config: &NamerConfig,
        fetcher: Arc<dyn HeaderFetcher>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(CacheNamer {
            resolver: UrlResolver::new(
                fetcher,
                config.max_concurrent_fetches,
                config.fetch_timeout(),
            ),
            tokens: Arc::new(ThreadRngTokens),
            max_concurrent_names: config.max_concurrent_names,
            blocking_runtime: OnceLock::new(),
        })
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Computes a fresh name for `file` without storing it.
    ///
    /// Kinds without a fingerprint get a new random name on every call; use
    /// [`CacheNamer::assign`] to name a descriptor.
    pub async fn generate(&self, file: &FileDescriptor) -> Result<CachedName> {
        let kind = file.kind();
        let (suffix, total_size) = match file.file_source() {
            FileSource::Local(path) => match self.checksum_local(path).await? {
                Some(digest) => (
                    format!("{}-{}", CONTENT_METHOD, digest.checksum),
                    Some(digest.total_size),
                ),
                None => (self.random_suffix(), None),
            },
            FileSource::EmptyDirectory => {
                // All empty directories have the same content.
                return Ok(CachedName::new(kind.prefix(), None));
            }
            FileSource::MiniTask { task, output } => {
                let checksum = mini_task_checksum(task.as_ref(), output)?;
                (format!("{}-{}", CONTENT_METHOD, checksum), None)
            }
            FileSource::Url(url) => {
                (self.resolver.cached_name(url).await?, None)
            }
            FileSource::Temporary => (self.random_suffix(), None),
            FileSource::Buffer(Some(data)) if !data.is_empty() => (
                format!("{}-{}", CONTENT_METHOD, Checksum::from_bytes(data)),
                Some(data.len() as u64),
            ),
            FileSource::Buffer(_) => (self.random_suffix(), None),
        };

        let name = format!("{}-{}", kind.prefix(), suffix);
        log::debug!("cached name of {} {:?} is {}", kind, file.source(), name);
        Ok(CachedName::new(name, total_size))
    }

    /// Names `file` once and for all.
    ///
    /// Concurrent calls on the same descriptor wait for the first one and
    /// share its result. If the call fails or is dropped before completing,
    /// the descriptor stays unnamed.
    pub async fn assign<'a>(
        &self,
        file: &'a FileDescriptor,
    ) -> Result<&'a CachedName> {
        file.cached_name_cell()
            .get_or_try_init(|| self.generate(file))
            .await
    }

    /// Names many descriptors concurrently.
    ///
    /// Returns the first fatal error once every descriptor has been tried.
    pub async fn assign_all(&self, files: &[FileDescriptor]) -> Result<()> {
        log::debug!(
            "assigning cached names to {} files, {} at a time",
            files.len(),
            self.max_concurrent_names
        );

        let results: Vec<Result<&CachedName>> = stream::iter(files)
            .map(|file| self.assign(file))
            .buffer_unordered(self.max_concurrent_names)
            .collect()
            .await;
        results
            .into_iter()
            .try_for_each(|result| result.map(|_| ()))
    }

    /// Synchronous version of [`CacheNamer::assign`].
    ///
    /// Runs on a runtime owned by the namer, built on first use and reused
    /// by later calls, so it must not be called from async code.
    pub fn assign_blocking(&self, file: &FileDescriptor) -> Result<CachedName> {
        self.blocking_runtime()?
            .block_on(self.assign(file))
            .cloned()
    }

    fn blocking_runtime(&self) -> Result<&Runtime> {
        if let Some(runtime) = self.blocking_runtime.get() {
            return Ok(runtime);
        }
        let runtime = Runtime::new()?;
        log::debug!("started runtime for blocking assignments");
        // A runtime built by a racing caller is dropped here, outside async
        // code.
        Ok(self.blocking_runtime.get_or_init(|| runtime))
    }

    async fn checksum_local(&self, path: &Path) -> Result<Option<PathDigest>> {
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || hash_path(owned)).await? {
            Ok(digest) => Ok(Some(digest)),
            Err(CacheNameError::Io(e)) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    log::debug!("{} does not exist yet", path.display());
                } else {
                    log::warn!("Unable to read {}: {}", path.display(), e);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn random_suffix(&self) -> String {
        format!("{}-{}", RANDOM_METHOD, self.tokens.token(RANDOM_TOKEN_LEN))
    }
}
