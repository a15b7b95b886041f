use std::path::PathBuf;

use dlm_progress::TransferError;
use thiserror::Error;

/// Errors that can occur while resolving, downloading or post-processing a URL
#[derive(Error, Debug)]
pub enum DlmError {
    /// The URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The URL has no host to file the download under
    #[error("URL has no host: {url}")]
    MissingHost { url: String },

    /// Only http and https are fetched
    #[error("Unsupported URL scheme '{scheme}' (expected http or https)")]
    UnsupportedScheme { scheme: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status} while downloading {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The streaming copy failed part-way
    #[error("Download failed: {0}")]
    TransferError(#[from] TransferError),

    /// File I/O error
    #[error("File operation failed: {0}")]
    IoError(#[from] std::io::Error),

    /// A post-processing action was asked for a file that is not on disk
    #[error("{} has not been downloaded yet", .path.display())]
    NotDownloaded { path: PathBuf },

    /// The post-processor could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The post-processor exited unsuccessfully
    #[error("{program} exited with {}", describe_status(.status))]
    PostProcess {
        program: String,
        status: Option<i32>,
    },
}

impl DlmError {
    /// Create a new configuration error
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Whether the error was raised before any byte was transferred
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_)
                | Self::MissingHost { .. }
                | Self::UnsupportedScheme { .. }
                | Self::ConfigError { .. }
        )
    }
}

fn describe_status(status: &Option<i32>) -> String {
    status.map_or_else(|| "a signal".to_string(), |code| format!("status {code}"))
}

/// Type alias for Results using DlmError
pub type Result<T> = std::result::Result<T, DlmError>;
