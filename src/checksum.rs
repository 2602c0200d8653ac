use std::{
    fs,
    io::{BufRead, BufReader},
    path::Path,
};

use core::{fmt::Display, str::FromStr};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{CacheNameError, Result};

const KILOBYTE: u64 = 1024;
const MEGABYTE: u64 = 1024 * KILOBYTE;
const BUFFER_CAPACITY: usize = 512 * KILOBYTE as usize;

/// Length of a rendered [`Checksum`].
pub const CHECKSUM_LEN: usize = 32;

/// MD5 digest of some content, rendered as lowercase hex.
///
/// Uses [`md5`] crate to compute the hash value.
#[derive(
    Debug, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct Checksum(pub String);

impl Checksum {
    /// Computes the checksum of bytes already resident in memory
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Checksum(format!("{:x}", md5::compute(bytes)))
    }

    fn from_context(context: md5::Context) -> Self {
        Checksum(format!("{:x}", context.compute()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Checksum {
    type Err = CacheNameError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let well_formed = s.len() == CHECKSUM_LEN
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(CacheNameError::Parse(format!(
                "not an md5 checksum: {}",
                s
            )));
        }
        Ok(Checksum(s.to_string()))
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checksum of a file or directory tree together with the number of bytes
/// that went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDigest {
    pub checksum: Checksum,
    pub total_size: u64,
}

/// Checksums a file or a directory, whichever `path` points to.
///
/// Symbolic links are followed.
pub fn hash_path<P: AsRef<Path>>(path: P) -> Result<PathDigest> {
    let metadata = fs::metadata(path.as_ref())?;
    if metadata.is_dir() {
        hash_directory(path)
    } else {
        hash_file(path)
    }
}

/// Streams the content of a single file through MD5.
pub fn hash_file<P: AsRef<Path>>(file_path: P) -> Result<PathDigest> {
    let source = fs::File::open(file_path.as_ref())?;
    log::trace!(
        "Calculating hash of {} (given size is {} megabytes)",
        file_path.as_ref().display(),
        source.metadata()?.len() / MEGABYTE
    );

    let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, source);
    let mut context = md5::Context::new();
    let mut bytes_read: u64 = 0;
    loop {
        let chunk = reader.fill_buf()?;
        let chunk_len = chunk.len();
        if chunk_len == 0 {
            break;
        }
        context.consume(chunk);
        reader.consume(chunk_len);
        bytes_read += chunk_len as u64;
    }

    let checksum = Checksum::from_context(context);
    log::trace!("{} bytes has been read", bytes_read);
    log::trace!("checksum: {}", checksum);

    Ok(PathDigest {
        checksum,
        total_size: bytes_read,
    })
}

/// Merkle-style checksum of a directory tree.
///
/// Children are visited in byte order of their names. Each child contributes
/// one record made of its kind (`f` or `d`), the length of its name, the name
/// itself and its own checksum; the directory checksum is the MD5 of the
/// concatenated records. Timestamps and permissions never enter the digest.
///
/// Entries that are neither files nor directories are skipped.
pub fn hash_directory<P: AsRef<Path>>(dir_path: P) -> Result<PathDigest> {
    log::debug!("Computing tree hash for directory: {:?}", dir_path.as_ref());

    let children = WalkDir::new(dir_path.as_ref())
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));

    let mut context = md5::Context::new();
    let mut total_size: u64 = 0;
    for entry in children {
        let entry = entry.map_err(std::io::Error::from)?;
        let file_type = entry.file_type();

        let (kind, digest) = if file_type.is_dir() {
            (b'd', hash_directory(entry.path())?)
        } else if file_type.is_file() {
            (b'f', hash_file(entry.path())?)
        } else {
            log::debug!("Skipping special file {:?}", entry.path());
            continue;
        };

        let name = entry.file_name().as_encoded_bytes();
        context.consume([kind, b':']);
        context.consume(format!("{}:", name.len()));
        context.consume(name);
        context.consume(format!(":{}\n", digest.checksum));
        total_size += digest.total_size;
    }

    Ok(PathDigest {
        checksum: Checksum::from_context(context),
        total_size,
    })
}
