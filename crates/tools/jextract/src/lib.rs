//! jextract acquisition for jextract-gen.
//!
//! Turns a [`ToolVersion`](jextract_core::ToolVersion) into the path of a
//! locally cached, executable jextract launcher:
//! - Early-access archives are downloaded from a configurable URL template
//! - Each version is unpacked into its own cache entry, marked complete last
//! - Concurrent callers and processes are serialized per entry
//! - Incomplete entries from interrupted runs are discarded and rebuilt

mod cache;
mod extract;
mod fetch;

pub use cache::{MARKER_FILE, ToolCache};
pub use extract::{find_executable, unpack_tar_gz};
pub use fetch::{ArchiveFetcher, HttpFetcher};
