//! Centralized path management for jextract-gen directories.
//!
//! | Platform | Tool cache |
//! |----------|------------|
//! | **macOS** | `~/Library/Caches/jextract/tool` |
//! | **Linux** | `~/.cache/jextract/tool` (XDG_CACHE_HOME) |
//! | **Windows** | `%LOCALAPPDATA%\jextract\tool` |
//!
//! `JEXTRACT_CACHE_DIR` overrides the tool cache root for testing and CI.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the tool cache root.
pub const CACHE_DIR_ENV: &str = "JEXTRACT_CACHE_DIR";

/// Directory below the output root that holds generated sources per library.
pub const GENERATED_SOURCES_DIR: &str = "build/generated/sources/jextract";

/// Get the root directory for cached jextract downloads.
///
/// Resolution order:
/// 1. `JEXTRACT_CACHE_DIR` environment variable
/// 2. Platform cache directory + `/jextract/tool`
///
/// # Errors
///
/// Returns an error if the cache directory cannot be determined.
pub fn tool_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = cache_dir_override() {
        return Ok(dir);
    }

    let base = dirs::cache_dir()
        .ok_or_else(|| Error::configuration("Could not determine cache directory"))?;

    Ok(base.join("jextract").join("tool"))
}

/// Tool cache root from `JEXTRACT_CACHE_DIR`; an empty value counts as unset.
#[must_use]
pub fn cache_dir_override() -> Option<PathBuf> {
    std::env::var_os(CACHE_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

/// Default output directory for a library's generated sources.
#[must_use]
pub fn default_output_dir(project_dir: &Path, library: &str) -> PathBuf {
    project_dir.join(GENERATED_SOURCES_DIR).join(library)
}

/// Directory for a Java package below a source root: `com.example` → `com/example`.
#[must_use]
pub fn package_dir(source_root: &Path, package: &str) -> PathBuf {
    package
        .split('.')
        .filter(|part| !part.is_empty())
        .fold(source_root.to_path_buf(), |dir, part| dir.join(part))
}
