use serde::{Deserialize, Serialize};

use crate::error::{Result, YtgrabError};

/// Descriptions longer than this many characters are cut.
pub const DESCRIPTION_LIMIT: usize = 500;

/// The parts of yt-dlp's `--dump-json` document that ytgrab reports on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration_string: Option<String>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub formats: Vec<Format>,
}

/// One encoding offered for a video.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Format {
    pub format_id: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub height: Option<u32>,
}

impl Format {
    /// Audio-only encodings carry `vcodec: "none"`.
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }
}

/// The reduced record printed by `ytgrab info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSummary {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<String>,
    pub views: Option<u64>,
    pub upload_date: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub best_video_quality: String,
    pub best_video_codec: String,
}

impl VideoInfo {
    /// Parse the first line of `yt-dlp --dump-json` output.
    pub fn from_dump(stdout: &str) -> Result<Self> {
        let first = stdout
            .trim()
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or(YtgrabError::EmptyOutput)?;
        Ok(serde_json::from_str(first)?)
    }

    /// The video encoding with the greatest height. Ties keep the first one listed.
    pub fn best_video(&self) -> Option<&Format> {
        self.formats
            .iter()
            .filter(|f| f.has_video() && f.height.is_some_and(|h| h > 0))
            .fold(None, |best: Option<&Format>, f| match best {
                Some(b) if b.height >= f.height => Some(b),
                _ => Some(f),
            })
    }

    pub fn summarize(&self) -> VideoSummary {
        let best = self.best_video();

        VideoSummary {
            title: self.title.clone(),
            uploader: self.uploader.clone(),
            duration: self.duration_string.clone(),
            views: self.view_count,
            upload_date: self.upload_date.clone(),
            description: self
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| d.chars().take(DESCRIPTION_LIMIT).collect()),
            thumbnail: self.thumbnail.clone(),
            best_video_quality: best
                .and_then(|f| f.height)
                .map(|h| format!("{}p", h))
                .unwrap_or_else(|| "unknown".to_string()),
            best_video_codec: best
                .and_then(|f| f.vcodec.clone())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}
