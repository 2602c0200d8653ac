//! Identity of remote resources, derived from their response headers.

mod evidence;
mod fetcher;
mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use evidence::{scan_headers, url_cached_name, Evidence, EvidenceClass};
pub use fetcher::{
    CurlHeaderFetcher, FetchOutcome, HeaderFetcher, HttpHeaderFetcher,
};
pub use resolver::UrlResolver;
