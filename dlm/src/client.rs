use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use dlm_progress::copy_with_progress;
use futures::TryStreamExt;
use tokio::fs::File;
use tokio_util::io::StreamReader;
use url::Url;

use crate::config::DlmConfig;
use crate::destination;
use crate::error::{DlmError, Result};

/// Result of a completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Where the file was written
    pub path: PathBuf,
    /// Bytes written to `path`
    pub bytes: u64,
    /// Length declared by the server, 0 when it sent none
    pub total: u64,
    pub elapsed: Duration,
}

/// HTTP downloader that files every URL under the configured download root
///
/// Each download streams the response body through a byte counter into the
/// destination file while a reporter task prints the progress line.
#[derive(Debug)]
pub struct Downloader {
    config: DlmConfig,
    http_client: reqwest::Client,
}

impl Downloader {
    /// Create a new downloader with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(DlmConfig::new())
    }

    /// Create a new downloader with custom configuration
    pub fn with_config(config: DlmConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let http_client = builder.build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &DlmConfig {
        &self.config
    }

    /// Local path `url` is saved to
    pub fn destination_for(&self, url: &Url) -> Result<PathBuf> {
        destination::destination_path(url, &self.config.download_dir)
    }

    /// Download `url`, printing progress on stdout unless disabled
    pub async fn download(&self, url: &Url) -> Result<DownloadSummary> {
        let output: Box<dyn Write + Send> = if self.config.show_progress {
            Box::new(io::stdout())
        } else {
            Box::new(io::sink())
        };
        self.download_with_output(url, output).await
    }

    /// Download `url`, writing progress lines into `output`
    ///
    /// A failed transfer leaves the partial file in place.
    pub async fn download_with_output<O>(&self, url: &Url, output: O) -> Result<DownloadSummary>
    where
        O: Write + Send + 'static,
    {
        let output_path = self.destination_for(url)?;
        if let Some(parent) = output_path.parent() {
            create_dir(parent).await?;
        }

        tracing::debug!(%url, path = %output_path.display(), "requesting");
        let response = self.http_client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(DlmError::HttpStatus {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let total = response.content_length().unwrap_or(0);
        tracing::debug!(total, "response accepted");

        let file = File::create(&output_path).await?;
        let body = Box::pin(response.bytes_stream().map_err(io::Error::other));
        let started = Instant::now();

        let outcome = copy_with_progress(
            StreamReader::new(body),
            total,
            file,
            output,
            &self.config.transfer_options(),
        )
        .await?;
        outcome.destination.sync_all().await?;

        let summary = DownloadSummary {
            path: output_path,
            bytes: outcome.bytes_written,
            total,
            elapsed: started.elapsed(),
        };

        if total > 0 && summary.bytes != total {
            tracing::warn!(
                declared = total,
                received = summary.bytes,
                "body length differs from Content-Length"
            );
        }
        tracing::info!(
            path = %summary.path.display(),
            bytes = summary.bytes,
            "download finished"
        );

        Ok(summary)
    }
}

async fn create_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied | io::ErrorKind::NotADirectory => {
            DlmError::config_error(format!("cannot create {}: {e}", dir.display()))
        }
        _ => DlmError::from(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_follows_download_dir() {
        let downloader =
            Downloader::with_config(DlmConfig::new().with_download_dir("/srv/mirror")).unwrap();
        let url = Url::parse("http://example.com/a/b.iso").unwrap();

        assert_eq!(
            downloader.destination_for(&url).unwrap(),
            PathBuf::from("/srv/mirror/example.com/a/b.iso")
        );
    }

    #[tokio::test]
    async fn test_unwritable_prefix_is_a_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let err = create_dir(&blocker.join("sub")).await.unwrap_err();
        assert!(
            err.is_configuration() || matches!(err, DlmError::IoError(_)),
            "unexpected error: {err:?}"
        );
    }
}
