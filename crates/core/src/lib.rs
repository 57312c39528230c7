//! ytgrab core library
//!
//! Locates or installs `yt-dlp` and `ffmpeg`, then drives `yt-dlp` to fetch
//! metadata for, list the encodings of, or download YouTube videos.

pub mod config;
pub mod error;
pub mod metadata;
pub mod ops;
pub mod report;
pub mod runner;
pub mod scrape;
pub mod tools;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ReleaseUrls, Settings, Timeouts};
pub use error::{InstallError, Result, YtgrabError};
pub use metadata::{VideoInfo, VideoSummary};
pub use ops::{DownloadRequest, Driver, build_download_command};
pub use report::{DownloadedFiles, Failure, FormatListing, Outcome};
pub use runner::{
    Capture, CommandLine, CommandOutcome, CommandResult, CommandRunner, ProcessRunner,
};
pub use tools::{
    InstallReporter, SilentReporter, Tool, ToolLocation, Toolchain, install::ToolLocator,
};
pub use validate::is_valid_url;
