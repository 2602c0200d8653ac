use crate::checksum::Checksum;
use crate::descriptor::FileDescriptor;
use crate::{CacheNameError, Result};

/// Identifier of one declared file, as opposed to the cache entry it shares
/// with other files.
///
/// Hashes the cached name followed by the declared source, so two files with
/// the same cached name but different sources stay distinct. The file must
/// have been named first.
pub fn identify(file: &FileDescriptor) -> Result<String> {
    let cached_name = file
        .cached_name()
        .ok_or_else(|| {
            CacheNameError::NameNotAssigned(file.source().into_owned())
        })?;

    let content = format!("{}{}", cached_name, file.source());
    Ok(Checksum::from_bytes(content.as_bytes()).0)
}

impl FileDescriptor {
    /// See [`identify`]
    pub fn id(&self) -> Result<String> {
        identify(self)
    }
}
