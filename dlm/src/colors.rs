use std::env;
use std::io::{stderr, stdout};

use colored::{ColoredString, Colorize};
use is_terminal::IsTerminal;

/// Color mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Color only when the stream is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            _ => Err(format!(
                "Invalid color mode: '{}'. Valid options: auto, always, never",
                s
            )),
        }
    }
}

/// TTY-aware styling for the few labels the CLI prints
///
/// Respects `NO_COLOR` and decides per stream, since errors go to stderr and
/// results to stdout.
#[derive(Debug, Clone)]
pub struct ColorHelper {
    mode: ColorMode,
    stdout_is_terminal: bool,
    stderr_is_terminal: bool,
    no_color: bool,
}

impl ColorHelper {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            mode,
            stdout_is_terminal: stdout().is_terminal(),
            stderr_is_terminal: stderr().is_terminal(),
            no_color: env::var("NO_COLOR").is_ok_and(|v| !v.is_empty()),
        }
    }

    pub fn should_color_stdout(&self) -> bool {
        self.should_use_colors(self.stdout_is_terminal)
    }

    pub fn should_color_stderr(&self) -> bool {
        self.should_use_colors(self.stderr_is_terminal)
    }

    fn should_use_colors(&self, is_terminal: bool) -> bool {
        if self.no_color {
            return false;
        }

        match self.mode {
            ColorMode::Never => false,
            ColorMode::Always => true,
            ColorMode::Auto => is_terminal,
        }
    }

    /// `Error:` style label, for stderr
    pub fn error(&self, text: &str) -> ColoredString {
        if self.should_color_stderr() {
            text.red().bold()
        } else {
            text.normal()
        }
    }

    /// Success label, for stdout
    pub fn success(&self, text: &str) -> ColoredString {
        if self.should_color_stdout() {
            text.green().bold()
        } else {
            text.normal()
        }
    }

    /// File system paths, for stdout
    pub fn path(&self, text: &str) -> ColoredString {
        if self.should_color_stdout() {
            text.blue()
        } else {
            text.normal()
        }
    }

    pub fn dimmed(&self, text: &str) -> ColoredString {
        if self.should_color_stdout() {
            text.dimmed()
        } else {
            text.normal()
        }
    }
}
