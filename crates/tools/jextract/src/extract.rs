//! Unpacking jextract archives and locating the launcher inside them.

use flate2::read::GzDecoder;
use jextract_core::{Error, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, trace};

/// Unpack a gzip-compressed tarball into `dest`.
///
/// File modes stored in the archive are kept so the launcher stays
/// executable on Unix.
pub fn unpack_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::io(e, archive, "open"))?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_preserve_permissions(true);
    tar.unpack(dest).map_err(|e| Error::io(e, dest, "unpack"))?;

    debug!(archive = %archive.display(), dest = %dest.display(), "Unpacked archive");
    Ok(())
}

/// Find `binary` in `entry/bin/`, then in `entry/<sub>/bin/` for each
/// immediate subdirectory.
///
/// Archives published upstream wrap everything in a versioned top-level
/// folder (`jextract-25/bin/jextract`), mirrors sometimes do not.
pub fn find_executable(entry: &Path, binary: &'static str) -> Result<PathBuf> {
    let direct = entry.join("bin").join(binary);
    if direct.is_file() {
        trace!(path = %direct.display(), "Found jextract launcher");
        return Ok(direct);
    }

    let read_dir = std::fs::read_dir(entry).map_err(|e| Error::io(e, entry, "read_dir"))?;
    let mut subdirs: Vec<PathBuf> = read_dir
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();

    for sub in subdirs {
        let nested = sub.join("bin").join(binary);
        if nested.is_file() {
            trace!(path = %nested.display(), "Found nested jextract launcher");
            return Ok(nested);
        }
    }

    Err(Error::ExecutableNotFound {
        binary,
        dir: entry.to_path_buf(),
    })
}

/// Add execute permission where the archive did not carry it.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).map_err(|e| Error::io(e, path, "metadata"))?;
    let mut perms = metadata.permissions();
    if perms.mode() & 0o111 == 0 {
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms).map_err(|e| Error::io(e, path, "chmod"))?;
        debug!(path = %path.display(), "Marked launcher executable");
    }
    Ok(())
}

/// Windows decides executability by extension.
#[cfg(not(unix))]
pub fn ensure_executable(_path: &Path) -> Result<()> {
    Ok(())
}
