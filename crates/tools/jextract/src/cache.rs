//! Versioned on-disk cache of jextract installations.
//!
//! Structure:
//! ```text
//! <root>/
//! ├── .25-jextract_2-4.lock        # cross-process advisory lock
//! └── 25-jextract_2-4/
//!     ├── .jextract-download       # written last; entry is valid only with it
//!     └── jextract-25/
//!         └── bin/
//!             └── jextract
//! ```

use fs4::tokio::AsyncFileExt;
use jextract_core::platform::SupportedPlatform;
use jextract_core::version::{ToolVersion, UrlTemplate};
use jextract_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::extract::{ensure_executable, find_executable, unpack_tar_gz};
use crate::fetch::{ArchiveFetcher, HttpFetcher};

/// Sentinel written into an entry once it is completely unpacked.
pub const MARKER_FILE: &str = ".jextract-download";

/// Cache of downloaded jextract builds, one entry per version.
///
/// Population is serialized twice: an async mutex covers callers sharing this
/// handle, and an advisory lock file covers other processes sharing the root.
pub struct ToolCache {
    root: PathBuf,
    url_template: UrlTemplate,
    platform: SupportedPlatform,
    fetcher: Arc<dyn ArchiveFetcher>,
    lock: Mutex<()>,
}

impl std::fmt::Debug for ToolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCache")
            .field("root", &self.root)
            .field("url_template", &self.url_template)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl ToolCache {
    /// Create a cache for the running host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when the host has no jextract build.
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn ArchiveFetcher>) -> Result<Self> {
        Ok(Self::for_platform(root, fetcher, SupportedPlatform::current()?))
    }

    /// Create a cache for the running host that downloads over HTTP.
    ///
    /// # Errors
    ///
    /// Fails when the host is unsupported or the HTTP client cannot be built.
    pub fn with_http(root: impl Into<PathBuf>) -> Result<Self> {
        Self::new(root, Arc::new(HttpFetcher::new()?))
    }

    /// Create a cache for an explicit platform.
    #[must_use]
    pub fn for_platform(
        root: impl Into<PathBuf>,
        fetcher: Arc<dyn ArchiveFetcher>,
        platform: SupportedPlatform,
    ) -> Self {
        Self {
            root: root.into(),
            url_template: UrlTemplate::default(),
            platform,
            fetcher,
            lock: Mutex::new(()),
        }
    }

    /// Use a different download location.
    #[must_use]
    pub fn with_url_template(mut self, url_template: UrlTemplate) -> Self {
        self.url_template = url_template;
        self
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Platform whose builds this cache holds.
    #[must_use]
    pub const fn platform(&self) -> SupportedPlatform {
        self.platform
    }

    /// Entry directory for a version.
    #[must_use]
    pub fn entry_dir(&self, version: &ToolVersion) -> PathBuf {
        self.root.join(version.folder_name())
    }

    /// Download URL for a version on this cache's platform.
    #[must_use]
    pub fn download_url(&self, version: &ToolVersion) -> String {
        self.url_template.render(version, self.platform)
    }

    /// Whether a complete entry exists for a version.
    #[must_use]
    pub fn is_cached(&self, version: &ToolVersion) -> bool {
        let entry = self.entry_dir(version);
        entry.is_dir() && entry.join(MARKER_FILE).is_file()
    }

    /// Path to the jextract launcher for `version`, downloading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolAcquisitionFailed`] when downloading or unpacking
    /// fails and [`Error::ExecutableNotFound`] when the unpacked archive has no
    /// launcher.
    pub async fn executable(&self, version: &ToolVersion) -> Result<PathBuf> {
        let entry = self.ensure_entry(version).await?;
        let executable = find_executable(&entry, self.platform.executable_name())?;
        ensure_executable(&executable)?;
        debug!(path = %executable.display(), "Resolved jextract");
        Ok(executable)
    }

    async fn ensure_entry(&self, version: &ToolVersion) -> Result<PathBuf> {
        let entry = self.entry_dir(version);
        let _guard = self.lock.lock().await;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::io(e, &self.root, "create_dir_all"))?;
        let _file_lock = self.lock_entry(version).await?;

        if self.is_cached(version) {
            debug!(path = %entry.display(), "Using cached jextract");
            return Ok(entry);
        }

        let url = self.download_url(version);
        info!(version = %version, %url, "Downloading jextract");

        if let Err(e) = self.populate(&entry, &url).await {
            if entry.exists()
                && let Err(cleanup) = tokio::fs::remove_dir_all(&entry).await
            {
                warn!(path = %entry.display(), error = %cleanup, "Failed to remove partial jextract download");
            }
            return Err(Error::tool_acquisition(
                version.as_str(),
                url,
                error_chain(&e),
            ));
        }

        info!(path = %entry.display(), "Cached jextract");
        Ok(entry)
    }

    async fn lock_entry(&self, version: &ToolVersion) -> Result<tokio::fs::File> {
        let path = self.root.join(format!(".{}.lock", version.folder_name()));
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .await
            .map_err(|e| Error::io(e, &path, "open"))?;

        // flock blocks the calling thread until other holders are done, which
        // may include another handle on this runtime that is mid-download
        tokio::task::spawn_blocking(move || file.lock_exclusive().map(|()| file))
            .await
            .map_err(|e| Error::io_no_path(std::io::Error::other(e), "lock task"))?
            .map_err(|e| Error::io(e, &path, "lock_exclusive"))
    }

    async fn populate(&self, entry: &Path, url: &str) -> Result<()> {
        if entry.exists() {
            debug!(path = %entry.display(), "Removing incomplete jextract entry");
            tokio::fs::remove_dir_all(entry)
                .await
                .map_err(|e| Error::io(e, entry, "remove_dir_all"))?;
        }
        tokio::fs::create_dir_all(entry)
            .await
            .map_err(|e| Error::io(e, entry, "create_dir_all"))?;

        let archive = tempfile::Builder::new()
            .prefix(".jextract-")
            .suffix(".tar.gz")
            .tempfile_in(&self.root)
            .map_err(|e| Error::io(e, &self.root, "create temp file"))?;

        self.fetcher.fetch(url, archive.path()).await?;

        let dest = entry.to_path_buf();
        tokio::task::spawn_blocking(move || unpack_tar_gz(archive.path(), &dest))
            .await
            .map_err(|e| Error::io_no_path(std::io::Error::other(e), "extract task"))??;

        let marker = entry.join(MARKER_FILE);
        tokio::fs::File::create(&marker)
            .await
            .map_err(|e| Error::io(e, &marker, "create"))?;
        Ok(())
    }
}

/// Render an error with its sources, `outer: inner: root`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Serves a fixed archive and counts downloads.
    struct FakeFetcher {
        archive: Option<Vec<u8>>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn serving(archive: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                archive: Some(archive),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                archive: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ArchiveFetcher for FakeFetcher {
        async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            match &self.archive {
                Some(bytes) => tokio::fs::write(dest, bytes)
                    .await
                    .map_err(|e| Error::io(e, dest, "write")),
                None => Err(Error::http(url, "HTTP 404 Not Found")),
            }
        }
    }

    fn tar_gz(entries: &[(&str, u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, mode) in entries {
            let data = b"#!/bin/sh\necho jextract\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            builder.append_data(&mut header, path, &data[..]).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn version() -> ToolVersion {
        ToolVersion::parse("25-jextract+2-4").unwrap()
    }

    fn cache(root: &Path, fetcher: Arc<FakeFetcher>) -> ToolCache {
        ToolCache::for_platform(root, fetcher, SupportedPlatform::LinuxX64)
    }

    #[tokio::test]
    async fn test_second_call_uses_cache() {
        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(tar_gz(&[("jextract-25/bin/jextract", 0o755)]));
        let cache = cache(temp.path(), fetcher.clone());

        let first = cache.executable(&version()).await.unwrap();
        let second = cache.executable(&version()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
        assert!(first.ends_with("25-jextract_2-4/jextract-25/bin/jextract"));
        assert!(cache.is_cached(&version()));
        assert!(cache.entry_dir(&version()).join(MARKER_FILE).is_file());
    }

    #[tokio::test]
    async fn test_concurrent_callers_download_once() {
        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(tar_gz(&[("bin/jextract", 0o755)]));
        let cache = Arc::new(cache(temp.path(), fetcher.clone()));

        let v = version();
        let (a, b, c) = tokio::join!(
            cache.executable(&v),
            cache.executable(&v),
            cache.executable(&v)
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_handles_sharing_a_root_download_once() {
        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(tar_gz(&[("bin/jextract", 0o755)]));
        let first = cache(temp.path(), fetcher.clone());
        let second = cache(temp.path(), fetcher.clone());

        let v = version();
        let (a, b) = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            tokio::join!(first.executable(&v), second.executable(&v))
        })
        .await
        .expect("handles sharing a root must not deadlock");

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_handles_sharing_a_root_on_multi_thread_runtime() {
        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(tar_gz(&[("bin/jextract", 0o755)]));
        let first = cache(temp.path(), fetcher.clone());
        let second = cache(temp.path(), fetcher.clone());

        let v = version();
        let (a, b) = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            tokio::join!(first.executable(&v), second.executable(&v))
        })
        .await
        .expect("handles sharing a root must not deadlock");

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_partial_entry_is_rebuilt() {
        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(tar_gz(&[("bin/jextract", 0o755)]));
        let cache = cache(temp.path(), fetcher.clone());

        let entry = cache.entry_dir(&version());
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join("leftover"), "half written").unwrap();
        assert!(!cache.is_cached(&version()));

        let exe = cache.executable(&version()).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(exe, entry.join("bin/jextract"));
        assert!(!entry.join("leftover").exists());
    }

    #[tokio::test]
    async fn test_marker_without_binary_fails_without_download() {
        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(tar_gz(&[("bin/jextract", 0o755)]));
        let cache = cache(temp.path(), fetcher.clone());

        let entry = cache.entry_dir(&version());
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join(MARKER_FILE), "").unwrap();

        let err = cache.executable(&version()).await.unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound { .. }));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_archive_without_launcher() {
        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(tar_gz(&[("jextract-25/README", 0o644)]));
        let cache = cache(temp.path(), fetcher);

        let err = cache.executable(&version()).await.unwrap_err();
        assert!(
            matches!(err, Error::ExecutableNotFound { binary: "jextract", ref dir } if *dir == cache.entry_dir(&version()))
        );
    }

    #[tokio::test]
    async fn test_failed_download_cleans_up() {
        let temp = TempDir::new().unwrap();
        let cache = cache(temp.path(), FakeFetcher::failing());

        let err = cache.executable(&version()).await.unwrap_err();
        let Error::ToolAcquisitionFailed { version, url, message } = err else {
            panic!("expected ToolAcquisitionFailed, got {err:?}");
        };
        assert_eq!(version, "25-jextract+2-4");
        assert_eq!(url, cache.download_url(&self::version()));
        assert!(message.contains("404"));
        assert!(!cache.entry_dir(&self::version()).exists());
    }

    #[tokio::test]
    async fn test_corrupt_archive_cleans_up() {
        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(b"definitely not gzip".to_vec());
        let cache = cache(temp.path(), fetcher);

        let err = cache.executable(&version()).await.unwrap_err();
        assert!(matches!(err, Error::ToolAcquisitionFailed { .. }));
        assert!(!cache.entry_dir(&version()).exists());
        assert!(!cache.is_cached(&version()));
    }

    #[tokio::test]
    async fn test_windows_looks_for_batch_launcher() {
        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(tar_gz(&[("jextract-25/bin/jextract.bat", 0o755)]));
        let cache = ToolCache::for_platform(temp.path(), fetcher, SupportedPlatform::WindowsX64);

        let exe = cache.executable(&version()).await.unwrap();
        assert!(exe.ends_with("jextract-25/bin/jextract.bat"));
        assert!(cache.download_url(&version()).ends_with("_windows-x64_bin.tar.gz"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launcher_made_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let fetcher = FakeFetcher::serving(tar_gz(&[("bin/jextract", 0o644)]));
        let cache = cache(temp.path(), fetcher);

        let exe = cache.executable(&version()).await.unwrap();
        let mode = std::fs::metadata(exe).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = Error::io(
            std::io::Error::new(std::io::ErrorKind::InvalidData, "bad header"),
            "/cache/x",
            "unpack",
        );
        assert_eq!(error_chain(&err), "I/O unpack failed: /cache/x: bad header");
    }
}
