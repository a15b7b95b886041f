use std::path::PathBuf;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use indicatif::{HumanBytes, HumanDuration};
use tracing_subscriber::{EnvFilter, fmt};

use dlm::{Action, ActionOutcome, ColorHelper, ColorMode, DlmConfig, Downloader, destination};

fn cli() -> Command {
    Command::new("dlm")
        .about("Download a URL into <download-dir>/<host>/<path>/ with a progress line")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("url")
                .help("URL to download (http or https)")
                .value_name("URL")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("download-dir")
                .long("download-dir")
                .short('d')
                .value_name("DIR")
                .help("Root directory for downloads (default: $DLM_DOWNLOAD_DIR or ~/Downloads)"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .short('o')
                .action(ArgAction::SetTrue)
                .help("Open the downloaded file instead of downloading"),
        )
        .arg(
            Arg::new("decompress")
                .long("decompress")
                .short('z')
                .action(ArgAction::SetTrue)
                .help("Decompress the downloaded file with gzip -d"),
        )
        .arg(
            Arg::new("ps")
                .long("ps")
                .action(ArgAction::SetTrue)
                .help("Convert the downloaded PostScript file with pstopdf"),
        )
        .arg(
            Arg::new("dvi")
                .long("dvi")
                .action(ArgAction::SetTrue)
                .help("Convert the downloaded DVI file with dvipdfmx"),
        )
        .arg(
            Arg::new("print-path")
                .long("print-path")
                .short('p')
                .action(ArgAction::SetTrue)
                .help("Print the destination path and exit"),
        )
        .group(
            ArgGroup::new("action")
                .args(["open", "decompress", "ps", "dvi", "print-path"])
                .multiple(false),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Do not print the progress line (also: NO_PROGRESS=1)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .value_parser(clap::value_parser!(u64))
                .help("Abort the request after SECS seconds (0: never)"),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_name("WHEN")
                .help("Control color output")
                .value_parser(["auto", "always", "never"])
                .default_value("auto"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Log more (-v: info, -vv: debug); RUST_LOG takes precedence"),
        )
        .after_help(
            "EXAMPLES:\n\
             \x20 dlm https://ftp.gnu.org/gnu/hello/hello-2.12.tar.gz\n\
             \x20 dlm -z https://ftp.gnu.org/gnu/hello/hello-2.12.tar.gz\n\
             \x20 dlm -p https://example.com/papers/draft.ps",
        )
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(matches: &ArgMatches) -> anyhow::Result<DlmConfig> {
    let mut config = DlmConfig::default();

    if let Some(dir) = matches.get_one::<String>("download-dir") {
        config = config.with_download_dir(PathBuf::from(dir));
    }
    if matches.get_flag("quiet") {
        config = config.with_progress(false);
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(*timeout);
    }
    if let Some(color) = matches.get_one::<String>("color") {
        let mode = color
            .parse::<ColorMode>()
            .map_err(anyhow::Error::msg)
            .context("parsing --color")?;
        config = config.with_color_mode(mode);
    }

    Ok(config)
}

async fn run(matches: &ArgMatches, colors: &ColorHelper, config: DlmConfig) -> anyhow::Result<()> {
    let raw_url = matches
        .get_one::<String>("url")
        .context("missing URL argument")?;
    let url = destination::parse_url(raw_url)?;

    let action = Action::from_flags(
        matches.get_flag("open"),
        matches.get_flag("decompress"),
        matches.get_flag("ps"),
        matches.get_flag("dvi"),
        matches.get_flag("print-path"),
    );
    tracing::debug!(?action, %url, "dispatching");

    let downloader = Downloader::with_config(config)?;
    match action.run(&downloader, &url).await? {
        ActionOutcome::Destination(path) => {
            println!("{}", path.display());
        }
        ActionOutcome::Downloaded(summary) => {
            println!(
                "{} {} {}",
                colors.success("saved"),
                colors.path(&summary.path.display().to_string()),
                colors.dimmed(&format!(
                    "({} in {})",
                    HumanBytes(summary.bytes),
                    HumanDuration(summary.elapsed)
                )),
            );
        }
        ActionOutcome::Processed { program, path } => {
            tracing::info!(program, path = %path.display(), "post-processing done");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let config = match build_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    };
    let colors = ColorHelper::new(config.color_mode);

    if let Err(e) = run(&matches, &colors, config).await {
        eprintln!("{} {e:#}", colors.error("Error:"));
        std::process::exit(1);
    }
}
