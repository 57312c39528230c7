//! Finding, installing and verifying the external `yt-dlp` and `ffmpeg` binaries.
//!
//! - `platform`: OS and CPU detection, release archive selection
//! - `fetch`: streaming HTTP download of release assets
//! - `archive`: pulling a single binary out of a `.tar.xz`
//! - `install`: the locate → install → verify sequence

pub mod archive;
pub mod fetch;
pub mod install;
pub mod platform;

use std::{
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
};

use crate::runner::CommandLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    YtDlp,
    Ffmpeg,
}

impl Tool {
    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::YtDlp => "yt-dlp",
            Tool::Ffmpeg => "ffmpeg",
        }
    }

    /// ffmpeg takes a single dash.
    pub fn version_flag(&self) -> &'static str {
        match self {
            Tool::YtDlp => "--version",
            Tool::Ffmpeg => "-version",
        }
    }

    /// Without yt-dlp nothing works; without ffmpeg many downloads still do.
    pub fn is_required(&self) -> bool {
        matches!(self, Tool::YtDlp)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Where an invocable tool was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolLocation {
    /// Reachable by bare name through `PATH`.
    OnPath(&'static str),
    /// A binary in the private install directory.
    Installed(PathBuf),
}

impl ToolLocation {
    pub fn program(&self) -> &OsStr {
        match self {
            ToolLocation::OnPath(name) => OsStr::new(name),
            ToolLocation::Installed(path) => path.as_os_str(),
        }
    }

    pub fn command(&self) -> CommandLine {
        CommandLine::new(self.program())
    }

    /// Directory holding the binary when it lives outside `PATH`.
    pub fn install_dir(&self) -> Option<&Path> {
        match self {
            ToolLocation::OnPath(_) => None,
            ToolLocation::Installed(path) => path.parent(),
        }
    }
}

impl fmt::Display for ToolLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program().to_string_lossy())
    }
}

/// The tools resolved for one run. ffmpeg is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub ytdlp: ToolLocation,
    pub ffmpeg: Option<ToolLocation>,
}

/// Receives installation progress so a front end can render it.
pub trait InstallReporter {
    fn status(&self, message: &str);
    fn warning(&self, message: &str);
    fn download_started(&self, url: &str, total_bytes: Option<u64>);
    fn download_progress(&self, downloaded: u64);
    fn download_finished(&self);
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl InstallReporter for SilentReporter {
    fn status(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn download_started(&self, _url: &str, _total_bytes: Option<u64>) {}
    fn download_progress(&self, _downloaded: u64) {}
    fn download_finished(&self) {}
}
