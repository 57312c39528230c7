//! Recovering produced file paths from yt-dlp's human-readable output.
//!
//! yt-dlp announces where it writes with a handful of line formats. When none
//! of them show up (a newer or older yt-dlp), the output directory is scanned
//! for files that changed in the last minute instead.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
    time::{Duration, SystemTime},
};

use regex::Regex;
use tracing::{debug, warn};

const DOWNLOAD_DESTINATION: &str = "[download] Destination:";
const MERGER_TAG: &str = "[Merger]";
const MERGER_MESSAGE: &str = "Merging formats into";
const EXTRACT_AUDIO_TAG: &str = "[ExtractAudio]";

static QUOTED_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""(.+?)""#).unwrap());
static DESTINATION_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Destination:\s*(.+)").unwrap());

/// Extensions of files yt-dlp is still writing or keeps as side products.
pub const PARTIAL_EXTENSIONS: [&str; 3] = ["part", "ytdl", "webp"];

/// How recent a file must be for the directory scan to pick it up.
pub const RECENT_WINDOW: Duration = Duration::from_secs(60);

/// The file path announced on a single line of yt-dlp output, if any.
pub fn parse_output_line(line: &str) -> Option<PathBuf> {
    let path = if line.contains(DOWNLOAD_DESTINATION) {
        line.split_once("Destination:")
            .map(|(_, rest)| rest.trim().to_string())
    } else if line.contains(MERGER_TAG) && line.contains(MERGER_MESSAGE) {
        QUOTED_PATH.captures(line).map(|caps| caps[1].to_string())
    } else if line.contains(EXTRACT_AUDIO_TAG) && line.contains("Destination:") {
        DESTINATION_PATH
            .captures(line)
            .map(|caps| caps[1].trim().to_string())
    } else {
        None
    }?;

    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Every path announced in `stdout`, in order of appearance.
pub fn parse_output_files(stdout: &str) -> Vec<PathBuf> {
    stdout.lines().filter_map(parse_output_line).collect()
}

/// Regular files directly inside `dir` modified within `window` of `now`,
/// skipping [`PARTIAL_EXTENSIONS`].
pub fn recent_files(
    dir: &Path,
    window: Duration,
    now: SystemTime,
) -> std::io::Result<Vec<PathBuf>> {
    let cutoff = now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut found = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if is_partial(&path) {
            continue;
        }
        // Files can vanish between listing and stat.
        let modified = std::fs::metadata(&path)
            .and_then(|metadata| Ok((metadata.is_file(), metadata.modified()?)));
        match modified {
            Ok((true, modified)) if modified > cutoff => found.push(path),
            Ok(_) => {}
            Err(e) => debug!(path = %path.display(), error = %e, "skipping entry"),
        }
    }

    found.sort();
    Ok(found)
}

/// Paths announced in `stdout`, or the recently modified files of `dir` when
/// yt-dlp announced nothing recognizable.
pub fn recover_output_files(stdout: &str, dir: &Path, now: SystemTime) -> Vec<PathBuf> {
    let announced = parse_output_files(stdout);
    if !announced.is_empty() {
        return announced;
    }

    debug!(dir = %dir.display(), "no destination lines found, scanning directory");
    recent_files(dir, RECENT_WINDOW, now).unwrap_or_else(|e| {
        warn!(dir = %dir.display(), error = %e, "could not scan output directory");
        Vec::new()
    })
}

fn is_partial(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PARTIAL_EXTENSIONS.contains(&ext))
}
