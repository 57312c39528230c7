use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::tools::Tool;

/// Why a tool could not be located or installed.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Network error while downloading {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download of {url} failed with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to extract {archive}: {reason}")]
    Extraction { archive: PathBuf, reason: String },

    #[error("Unsupported architecture: {arch}. Please install {tool} manually.")]
    UnsupportedArchitecture { tool: Tool, arch: String },

    #[error("Please install {tool} manually: {hint}")]
    ManualInstallRequired { tool: Tool, hint: String },

    #[error("{tool} was installed to {path} but does not run")]
    VerificationFailed { tool: Tool, path: PathBuf },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum YtgrabError {
    #[error("{action} timed out after {}s", .after.as_secs())]
    TimedOut { action: &'static str, after: Duration },

    #[error("{action} failed: {reason}")]
    CommandFailed { action: &'static str, reason: String },

    #[error("yt-dlp returned no output")]
    EmptyOutput,

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, YtgrabError>;
