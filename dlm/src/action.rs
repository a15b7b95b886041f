use std::path::{Path, PathBuf};

use tokio::process::Command;
use url::Url;

use crate::client::{DownloadSummary, Downloader};
use crate::error::{DlmError, Result};

/// What to do with a URL, chosen once from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Fetch the URL into its destination path
    #[default]
    Download,
    /// Hand the downloaded file to `open`
    Open,
    /// `gzip -d` the downloaded file in place
    Decompress,
    /// Convert a downloaded PostScript file with `pstopdf`
    ConvertPs,
    /// Convert a downloaded DVI file with `dvipdfmx`
    ConvertDvi,
    /// Print the destination path without touching network or disk
    ShowDestination,
}

/// What an action produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Downloaded(DownloadSummary),
    Processed { program: &'static str, path: PathBuf },
    Destination(PathBuf),
}

impl Action {
    /// Pick the action from mutually exclusive flags; no flag means download
    pub fn from_flags(
        open: bool,
        decompress: bool,
        convert_ps: bool,
        convert_dvi: bool,
        show_destination: bool,
    ) -> Self {
        if show_destination {
            Action::ShowDestination
        } else if open {
            Action::Open
        } else if decompress {
            Action::Decompress
        } else if convert_ps {
            Action::ConvertPs
        } else if convert_dvi {
            Action::ConvertDvi
        } else {
            Action::Download
        }
    }

    /// External program and leading arguments for post-processing actions
    pub fn command(self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            Action::Open => Some(("open", &[])),
            Action::Decompress => Some(("gzip", &["-d"])),
            Action::ConvertPs => Some(("pstopdf", &[])),
            Action::ConvertDvi => Some(("dvipdfmx", &[])),
            Action::Download | Action::ShowDestination => None,
        }
    }

    pub async fn run(self, downloader: &Downloader, url: &Url) -> Result<ActionOutcome> {
        if let Some((program, args)) = self.command() {
            let path = downloader.destination_for(url)?;
            post_process(program, args, &path).await?;
            return Ok(ActionOutcome::Processed { program, path });
        }

        match self {
            Action::ShowDestination => downloader
                .destination_for(url)
                .map(ActionOutcome::Destination),
            _ => downloader.download(url).await.map(ActionOutcome::Downloaded),
        }
    }
}

/// Run `program args.. <file name>` inside the file's directory
pub(crate) async fn post_process(program: &str, args: &[&str], path: &Path) -> Result<()> {
    if !tokio::fs::try_exists(path).await? {
        return Err(DlmError::NotDownloaded {
            path: path.to_path_buf(),
        });
    }

    let mut command = Command::new(program);
    command.args(args);
    match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) if !dir.as_os_str().is_empty() => {
            command.current_dir(dir).arg(name);
        }
        _ => {
            command.arg(path);
        }
    }

    tracing::debug!(program, path = %path.display(), "running post-processor");
    let status = command.status().await.map_err(|source| DlmError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if !status.success() {
        return Err(DlmError::PostProcess {
            program: program.to_string(),
            status: status.code(),
        });
    }
    Ok(())
}
