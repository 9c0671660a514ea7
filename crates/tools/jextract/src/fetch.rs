//! Archive transport.

use async_trait::async_trait;
use jextract_core::{Error, Result};
use reqwest::{Client, StatusCode};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Downloads a tool archive to a local file.
///
/// The cache only depends on this trait, so tests and mirrors that need
/// custom transport can provide their own implementation.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Download `url` into `dest`, replacing its contents.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Fetcher backed by `reqwest`.
///
/// Redirects are followed; any final status other than `200 OK` is an error.
/// The body is streamed to disk chunk by chunk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend fails to initialize.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jextract-gen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        debug!(%url, dest = %dest.display(), "Downloading archive");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(url, e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::http(url, format!("HTTP {status}")));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::io(e, dest, "create"))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::http(url, e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(e, dest, "write"))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| Error::io(e, dest, "flush"))?;
        file.sync_all()
            .await
            .map_err(|e| Error::io(e, dest, "sync_all"))?;

        debug!(bytes = written, "Download complete");
        Ok(())
    }
}
