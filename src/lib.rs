//! # Cached names
//!
//! Names under which a task-execution manager stores input files in the
//! cache directories of its workers. Files with the same content share one
//! name, and so one cached copy; different content never shares a name.
//!
//! Each kind of file is named from the best evidence available for it:
//! its bytes for local files and buffers, response headers for URLs, the
//! task description for files produced by mini tasks. When nothing is
//! known yet the name is random.
//!
//! ```no_run
//! use cached_name::{CacheNamer, FileDescriptor, NamerConfig};
//!
//! # async fn run() -> cached_name::Result<()> {
//! let namer = CacheNamer::new(&NamerConfig::default())?;
//! let files = vec![
//!     FileDescriptor::local("inputs/genome.fa"),
//!     FileDescriptor::url("https://example.org/reads.fq.gz"),
//!     FileDescriptor::buffer("threshold = 0.5\n"),
//! ];
//! namer.assign_all(&files).await?;
//! for file in &files {
//!     println!("{} {}", file.cached_name().unwrap(), file.id()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod checksum;
mod config;
mod descriptor;
mod errors;
mod generator;
mod identify;
pub mod random;
pub mod remote;
pub mod task;

pub use config::{FetcherKind, NamerConfig};
pub use descriptor::{CachedName, FileDescriptor, FileKind, FileSource};
pub use errors::{CacheNameError, Result};
pub use generator::CacheNamer;
pub use identify::identify;
