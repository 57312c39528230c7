use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::tools::Tool;

/// Overrides the private install directory (default `~/.local/bin`).
pub const BIN_DIR_ENV: &str = "YTGRAB_BIN_DIR";
/// Overrides the default download directory (default `~/Downloads/youtube`).
pub const DOWNLOAD_DIR_ENV: &str = "YTGRAB_DOWNLOAD_DIR";

/// Time limits for every kind of subprocess or transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// `--version` / `-version` probes
    pub probe: Duration,
    /// `--dump-json` and `--list-formats`
    pub query: Duration,
    pub download: Duration,
    pub pipx: Duration,
    pub brew: Duration,
    /// HTTP fetch of a release binary or archive
    pub fetch: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(5),
            query: Duration::from_secs(30),
            download: Duration::from_secs(600),
            pipx: Duration::from_secs(60),
            brew: Duration::from_secs(300),
            fetch: Duration::from_secs(120),
        }
    }
}

/// Where installers fetch release binaries from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseUrls {
    /// The standalone yt-dlp binary.
    pub ytdlp: String,
    /// Directory holding the static ffmpeg `.tar.xz` builds.
    pub ffmpeg_builds: String,
}

impl Default for ReleaseUrls {
    fn default() -> Self {
        Self {
            ytdlp: "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp".to_string(),
            ffmpeg_builds: "https://github.com/yt-dlp/FFmpeg-Builds/releases/download/latest"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bin_dir: PathBuf,
    pub download_dir: PathBuf,
    pub timeouts: Timeouts,
    pub releases: ReleaseUrls,
}

impl Settings {
    /// Build settings from the user's home directory and `YTGRAB_*` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let dir_from = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        Self {
            bin_dir: dir_from(BIN_DIR_ENV).unwrap_or_else(|| default_bin_dir(&home)),
            download_dir: dir_from(DOWNLOAD_DIR_ENV)
                .unwrap_or_else(|| default_download_dir(&home)),
            timeouts: Timeouts::default(),
            releases: ReleaseUrls::default(),
        }
    }

    /// Settings rooted at an explicit home directory, ignoring the environment.
    pub fn with_home(home: &Path) -> Self {
        Self {
            bin_dir: default_bin_dir(home),
            download_dir: default_download_dir(home),
            timeouts: Timeouts::default(),
            releases: ReleaseUrls::default(),
        }
    }

    /// The well-known private install path of a tool.
    pub fn tool_path(&self, tool: Tool) -> PathBuf {
        self.bin_dir.join(tool.binary_name())
    }
}

fn default_bin_dir(home: &Path) -> PathBuf {
    home.join(".local").join("bin")
}

fn default_download_dir(home: &Path) -> PathBuf {
    home.join("Downloads").join("youtube")
}
