use std::path::PathBuf;
use std::time::Duration;

use dlm_progress::{
    DEFAULT_MAX_CHUNK_SIZE, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL, TransferOptions,
};

use crate::colors::ColorMode;

/// Environment variable overriding the default download directory
pub const DOWNLOAD_DIR_ENV: &str = "DLM_DOWNLOAD_DIR";

/// Configuration for the downloader
#[derive(Debug, Clone)]
pub struct DlmConfig {
    /// Root under which `<host>/<path>/` directories are created
    pub download_dir: PathBuf,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Overall request timeout in seconds, 0 for none
    pub timeout_secs: u64,
    /// Interval between two progress lines
    pub poll_interval: Duration,
    /// Largest copy buffer
    pub max_chunk_size: usize,
    /// Print the progress line while downloading
    pub show_progress: bool,
    /// Color output mode
    pub color_mode: ColorMode,
}

impl Default for DlmConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            user_agent: format!("dlm/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            show_progress: std::env::var_os("NO_PROGRESS").is_none(),
            color_mode: ColorMode::Auto,
        }
    }
}

impl DlmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration with custom download directory
    pub fn with_download_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Set custom user agent
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set request timeout, 0 disables it
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size.max(1);
        self
    }

    /// Enable or disable the progress line
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions::new()
            .with_poll_interval(self.poll_interval)
            .with_max_chunk_size(self.max_chunk_size)
    }
}

/// `$DLM_DOWNLOAD_DIR`, else `~/Downloads`, else `./Downloads`
fn default_download_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DOWNLOAD_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = DlmConfig::new()
            .with_download_dir("/tmp/dl")
            .with_user_agent("test/1.0")
            .with_timeout(30)
            .with_poll_interval(Duration::from_millis(250))
            .with_max_chunk_size(0)
            .with_progress(false)
            .with_color_mode(ColorMode::Never);

        assert_eq!(config.download_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(config.user_agent, "test/1.0");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_chunk_size, 1);
        assert!(!config.show_progress);
        assert_eq!(config.color_mode, ColorMode::Never);
    }

    #[test]
    fn test_defaults() {
        let config = DlmConfig::default();
        assert!(config.user_agent.starts_with("dlm/"));
        assert_eq!(config.timeout_secs, 0);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.max_chunk_size, 1 << 20);
    }

    #[test]
    fn test_transfer_options_follow_config() {
        let options = DlmConfig::new()
            .with_poll_interval(Duration::from_millis(5))
            .with_max_chunk_size(4096)
            .transfer_options();

        assert_eq!(options.poll_interval, Duration::from_millis(5));
        assert_eq!(options.chunk_size(0), 4096);
        assert_eq!(options.chunk_size(100), 100);
    }

    #[test]
    fn test_zero_poll_interval_is_raised() {
        let config = DlmConfig::new().with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);
        assert_eq!(config.transfer_options().poll_interval, MIN_POLL_INTERVAL);
    }
}
