use crate::checksum::Checksum;

/// Trust tier of a piece of identity evidence, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EvidenceClass {
    None,
    LastModified,
    ETag,
    ContentMd5,
}

impl EvidenceClass {
    /// Method tag recorded in the cache name
    pub fn method(&self) -> &'static str {
        match self {
            EvidenceClass::None => "md5-url",
            EvidenceClass::LastModified => "md5-lm",
            EvidenceClass::ETag => "md5-et",
            EvidenceClass::ContentMd5 => "md5-content",
        }
    }

    fn from_header_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("content-md5") {
            Some(EvidenceClass::ContentMd5)
        } else if name.eq_ignore_ascii_case("etag") {
            Some(EvidenceClass::ETag)
        } else if name.eq_ignore_ascii_case("last-modified") {
            Some(EvidenceClass::LastModified)
        } else {
            None
        }
    }
}

/// The most trustworthy identity token found for a remote resource.
///
/// - `ContentMd5` validates the content itself.
/// - `ETag` identifies a version of the resource on its server only.
/// - `LastModified` is ambiguous across resources and needs the URL.
///
/// Server-supplied values are trusted as they are: a server reusing an ETag
/// or timestamp for new content leads to a stale name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    None,
    LastModified(String),
    ETag(String),
    ContentMd5(String),
}

impl Evidence {
    pub fn class(&self) -> EvidenceClass {
        match self {
            Evidence::None => EvidenceClass::None,
            Evidence::LastModified(_) => EvidenceClass::LastModified,
            Evidence::ETag(_) => EvidenceClass::ETag,
            Evidence::ContentMd5(_) => EvidenceClass::ContentMd5,
        }
    }

    fn with_class(class: EvidenceClass, token: &str) -> Self {
        match class {
            EvidenceClass::None => Evidence::None,
            EvidenceClass::LastModified => {
                Evidence::LastModified(token.to_owned())
            }
            EvidenceClass::ETag => Evidence::ETag(token.to_owned()),
            EvidenceClass::ContentMd5 => Evidence::ContentMd5(token.to_owned()),
        }
    }
}

/// Picks the strongest evidence out of raw `Name: value` header lines.
///
/// Names match case-insensitively. A later line only replaces the current
/// evidence when it is of a strictly higher class, so the first line of each
/// class wins. Lines that are not headers, such as status lines of redirect
/// hops, are ignored.
pub fn scan_headers<I, S>(lines: I) -> Evidence
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut found = Evidence::None;
    for line in lines {
        let Some((name, value)) = line.as_ref().split_once(':') else {
            continue;
        };
        let Some(class) = EvidenceClass::from_header_name(name.trim()) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() || class <= found.class() {
            continue;
        }

        found = Evidence::with_class(class, value);
        if class == EvidenceClass::ContentMd5 {
            break;
        }
    }
    found
}

/// Method tag and checksum naming `url` given the evidence found for it.
///
/// ETags and timestamps are only meaningful together with the resource they
/// came from, so they are hashed with the URL.
pub fn url_cached_name(url: &str, evidence: &Evidence) -> String {
    let content = match evidence {
        Evidence::ContentMd5(token) => token.clone(),
        Evidence::ETag(token) | Evidence::LastModified(token) => {
            format!("{}-{}", url, token)
        }
        Evidence::None => url.to_owned(),
    };
    format!(
        "{}-{}",
        evidence.class().method(),
        Checksum::from_bytes(content.as_bytes())
    )
}
