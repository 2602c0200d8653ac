use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use core::{fmt::Display, str::FromStr};
use tokio::sync::OnceCell;

use crate::task::CanonicalTask;
use crate::CacheNameError;

/// Tag of a [`FileSource`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Local,
    EmptyDirectory,
    MiniTask,
    Url,
    Temporary,
    Buffer,
}

impl FileKind {
    /// Prefix namespacing the cache names of this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            FileKind::Local => "file",
            FileKind::EmptyDirectory => "empty",
            FileKind::MiniTask => "task",
            FileKind::Url => "url",
            FileKind::Temporary => "temp",
            FileKind::Buffer => "buffer",
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            FileKind::Local => "file",
            FileKind::EmptyDirectory => "empty_dir",
            FileKind::MiniTask => "mini_task",
            FileKind::Url => "url",
            FileKind::Temporary => "temp",
            FileKind::Buffer => "buffer",
        }
    }
}

impl FromStr for FileKind {
    type Err = CacheNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(FileKind::Local),
            "empty_dir" => Ok(FileKind::EmptyDirectory),
            "mini_task" => Ok(FileKind::MiniTask),
            "url" => Ok(FileKind::Url),
            "temp" => Ok(FileKind::Temporary),
            "buffer" => Ok(FileKind::Buffer),
            other => Err(CacheNameError::UnknownFileKind(other.to_owned())),
        }
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Where the content of a file comes from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file or directory on the manager's filesystem
    Local(PathBuf),
    EmptyDirectory,
    /// The file `output` produced by running `task` on the worker
    MiniTask {
        task: Arc<dyn CanonicalTask>,
        output: String,
    },
    Url(String),
    /// Output of a task that has not run yet
    Temporary,
    /// Bytes held in memory, `None` until they are provided
    Buffer(Option<Vec<u8>>),
}

impl FileSource {
    pub fn kind(&self) -> FileKind {
        match self {
            FileSource::Local(_) => FileKind::Local,
            FileSource::EmptyDirectory => FileKind::EmptyDirectory,
            FileSource::MiniTask { .. } => FileKind::MiniTask,
            FileSource::Url(_) => FileKind::Url,
            FileSource::Temporary => FileKind::Temporary,
            FileSource::Buffer(_) => FileKind::Buffer,
        }
    }
}

/// Name under which a file is stored in a worker cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CachedName {
    name: String,
    /// Number of bytes the name was derived from, when content was read
    total_size: Option<u64>,
}

impl CachedName {
    pub fn new<S: Into<String>>(name: S, total_size: Option<u64>) -> Self {
        CachedName {
            name: name.into(),
            total_size,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }
}

impl Display for CachedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A file-like object declared by the manager.
///
/// The cached name is assigned once by
/// [`CacheNamer::assign`](crate::CacheNamer::assign) and never changes
/// afterwards. To rename, declare a new descriptor.
#[derive(Debug)]
pub struct FileDescriptor {
    source: FileSource,
    cached_name: OnceCell<CachedName>,
}

impl FileDescriptor {
    pub fn new(source: FileSource) -> Self {
        FileDescriptor {
            source,
            cached_name: OnceCell::new(),
        }
    }

    pub fn local<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(FileSource::Local(path.into()))
    }

    pub fn empty_dir() -> Self {
        Self::new(FileSource::EmptyDirectory)
    }

    pub fn mini_task<S: Into<String>>(
        task: Arc<dyn CanonicalTask>,
        output: S,
    ) -> Self {
        Self::new(FileSource::MiniTask {
            task,
            output: output.into(),
        })
    }

    pub fn url<S: Into<String>>(url: S) -> Self {
        Self::new(FileSource::Url(url.into()))
    }

    pub fn temp() -> Self {
        Self::new(FileSource::Temporary)
    }

    pub fn buffer<B: Into<Vec<u8>>>(data: B) -> Self {
        Self::new(FileSource::Buffer(Some(data.into())))
    }

    pub fn pending_buffer() -> Self {
        Self::new(FileSource::Buffer(None))
    }

    pub fn kind(&self) -> FileKind {
        self.source.kind()
    }

    pub fn file_source(&self) -> &FileSource {
        &self.source
    }

    /// The declared origin: the local path, the URL or the mini task output
    /// path. Empty for the other kinds.
    pub fn source(&self) -> Cow<'_, str> {
        match &self.source {
            FileSource::Local(path) => path.to_string_lossy(),
            FileSource::MiniTask { output, .. } => Cow::Borrowed(output),
            FileSource::Url(url) => Cow::Borrowed(url),
            FileSource::EmptyDirectory
            | FileSource::Temporary
            | FileSource::Buffer(_) => Cow::Borrowed(""),
        }
    }

    /// Size of the in-memory data of a buffer
    pub fn size(&self) -> Option<usize> {
        match &self.source {
            FileSource::Buffer(Some(data)) => Some(data.len()),
            _ => None,
        }
    }

    /// The assigned cached name, `None` until assignment
    pub fn cached_name(&self) -> Option<&CachedName> {
        self.cached_name.get()
    }

    pub(crate) fn cached_name_cell(&self) -> &OnceCell<CachedName> {
        &self.cached_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::MiniTask;
    use rstest::rstest;

    #[rstest]
    #[case("file", FileKind::Local)]
    #[case("empty_dir", FileKind::EmptyDirectory)]
    #[case("mini_task", FileKind::MiniTask)]
    #[case("url", FileKind::Url)]
    #[case("temp", FileKind::Temporary)]
    #[case("buffer", FileKind::Buffer)]
    fn kind_tags_parse_back(#[case] tag: &str, #[case] kind: FileKind) {
        assert_eq!(tag.parse::<FileKind>().unwrap(), kind);
        assert_eq!(kind.to_string(), tag);
    }

    #[test]
    fn unknown_kind_tag_is_rejected() {
        match "symlink".parse::<FileKind>() {
            Err(CacheNameError::UnknownFileKind(tag)) => {
                assert_eq!(tag, "symlink")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn source_follows_variant() {
        let task = Arc::new(MiniTask::new("echo hi > out"));

        assert_eq!(
            FileDescriptor::local("/data/in.txt").source(),
            "/data/in.txt"
        );
        assert_eq!(
            FileDescriptor::url("https://example.org/x").source(),
            "https://example.org/x"
        );
        assert_eq!(FileDescriptor::mini_task(task, "out").source(), "out");
        assert_eq!(FileDescriptor::temp().source(), "");
        assert_eq!(FileDescriptor::empty_dir().source(), "");
        assert_eq!(FileDescriptor::buffer("abc").source(), "");
    }

    #[test]
    fn buffer_size_is_known_only_when_populated() {
        assert_eq!(FileDescriptor::buffer("hello").size(), Some(5));
        assert_eq!(FileDescriptor::pending_buffer().size(), None);
        assert_eq!(FileDescriptor::temp().size(), None);
    }

    #[test]
    fn fresh_descriptor_has_no_cached_name() {
        let file = FileDescriptor::temp();
        assert!(file.cached_name().is_none());
        assert_eq!(file.kind(), FileKind::Temporary);
    }
}
