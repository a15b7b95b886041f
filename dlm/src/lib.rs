//! Download a URL into `<download dir>/<host>/<path>/` with a live progress
//! line, or hand the already downloaded file to an external tool.
//!
//! The streaming core (byte counter, progress reporter, copy driver) lives in
//! [`progress`]; this crate adds URL mapping, HTTP and action dispatch.

pub use dlm_progress as progress;

pub mod action;
pub mod client;
pub mod colors;
pub mod config;
pub mod destination;
pub mod error;

pub use action::{Action, ActionOutcome};
pub use client::{DownloadSummary, Downloader};
pub use colors::{ColorHelper, ColorMode};
pub use config::DlmConfig;
pub use error::{DlmError, Result};
