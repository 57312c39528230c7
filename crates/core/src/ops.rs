//! The three user-facing operations, each a single `yt-dlp` invocation.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::{Result, YtgrabError},
    metadata::{VideoInfo, VideoSummary},
    report::{DownloadedFiles, Failure, FormatListing, Outcome},
    runner::{Capture, CommandLine, CommandOutcome, CommandRunner},
    scrape,
    tools::{ToolLocation, Toolchain},
    validate::is_downloadable_url,
};

pub const DEFAULT_VIDEO_FORMAT: &str = "bestvideo*+bestaudio/best";
pub const DEFAULT_AUDIO_QUALITY: &str = "0";
pub const AUDIO_FORMAT: &str = "mp3";
pub const MERGE_FORMAT: &str = "mp4";
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
pub const SUBTITLE_LANGS: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadRequest {
    pub url: String,
    /// Extract the audio track to mp3 instead of downloading video.
    pub audio_only: bool,
    /// A yt-dlp format selector in video mode, an audio quality in audio mode.
    pub quality: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

pub struct Driver<'a, R: ?Sized> {
    runner: &'a R,
    tools: &'a Toolchain,
    settings: &'a Settings,
}

impl<'a, R> Driver<'a, R>
where
    R: CommandRunner + ?Sized,
{
    pub fn new(runner: &'a R, tools: &'a Toolchain, settings: &'a Settings) -> Self {
        Self {
            runner,
            tools,
            settings,
        }
    }

    fn ytdlp(&self) -> CommandLine {
        self.tools.ytdlp.command()
    }

    pub async fn info(&self, url: &str) -> Outcome<VideoSummary> {
        match self.fetch_info(url).await {
            Ok(info) => Outcome::Success(info.summarize()),
            Err(e) => {
                warn!(url, error = %e, "could not fetch video info");
                Failure::new("Could not fetch video info")
                    .with_reason(e.to_string())
                    .into()
            }
        }
    }

    async fn fetch_info(&self, url: &str) -> Result<VideoInfo> {
        let command = self.ytdlp().args(["--dump-json", "--no-download", url]);
        debug!(%command, "fetching metadata");

        let limit = self.settings.timeouts.query;
        let result = match self.runner.run(&command, limit, Capture::Piped).await {
            CommandOutcome::Completed(result) => result,
            CommandOutcome::TimedOut { after } => {
                return Err(YtgrabError::TimedOut {
                    action: "Fetching video info",
                    after,
                });
            }
            CommandOutcome::SpawnError(reason) => {
                return Err(YtgrabError::CommandFailed {
                    action: "Fetching video info",
                    reason,
                });
            }
        };

        if !result.success() {
            return Err(YtgrabError::CommandFailed {
                action: "Fetching video info",
                reason: non_empty(&result.stderr)
                    .unwrap_or_else(|| format!("yt-dlp exited with status {}", result.exit_status)),
            });
        }

        VideoInfo::from_dump(&result.stdout)
    }

    pub async fn formats(&self, url: &str) -> Outcome<FormatListing> {
        let command = self.ytdlp().args(["--list-formats", url]);
        debug!(%command, "listing formats");

        let limit = self.settings.timeouts.query;
        match self.runner.run(&command, limit, Capture::Piped).await {
            CommandOutcome::Completed(result) if result.success() => {
                Outcome::Success(FormatListing {
                    formats: result.stdout,
                })
            }
            CommandOutcome::Completed(result) => Failure::new(
                non_empty(&result.stderr).unwrap_or_else(|| "Failed to list formats".to_string()),
            )
            .into(),
            CommandOutcome::TimedOut { after } => Failure::new(
                YtgrabError::TimedOut {
                    action: "Listing formats",
                    after,
                }
                .to_string(),
            )
            .into(),
            CommandOutcome::SpawnError(reason) => Failure::new("Failed to list formats")
                .with_reason(reason)
                .into(),
        }
    }

    /// Download one video (or its audio), forwarding each stdout line of
    /// yt-dlp to `on_line` while it runs.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        on_line: &mut dyn FnMut(&str),
    ) -> Outcome<DownloadedFiles> {
        if !is_downloadable_url(&request.url) {
            return Failure::new("Invalid YouTube URL").into();
        }

        let output_dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| self.settings.download_dir.clone());
        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            return Failure::new(format!(
                "Could not create output directory {}: {}",
                output_dir.display(),
                e
            ))
            .into();
        }

        let command = build_download_command(self.tools, request, &output_dir);
        info!(
            url = %request.url,
            dir = %output_dir.display(),
            audio = request.audio_only,
            "downloading"
        );
        debug!(%command);

        let limit = self.settings.timeouts.download;
        let result = match self.runner.run_streaming(&command, limit, on_line).await {
            CommandOutcome::Completed(result) => result,
            CommandOutcome::TimedOut { .. } => {
                return Failure::new("Download timed out (10 minutes)").into();
            }
            CommandOutcome::SpawnError(reason) => return Failure::new(reason).into(),
        };

        if !result.success() {
            return Failure::new(
                non_empty(&result.stderr).unwrap_or_else(|| "Unknown error".to_string()),
            )
            .with_stdout(result.stdout)
            .into();
        }

        let output_files =
            scrape::recover_output_files(&result.stdout, &output_dir, SystemTime::now());
        Outcome::Success(DownloadedFiles {
            output_files,
            output_dir,
        })
    }
}

/// The full yt-dlp invocation for a download into `output_dir`.
pub fn build_download_command(
    tools: &Toolchain,
    request: &DownloadRequest,
    output_dir: &Path,
) -> CommandLine {
    let mut command = tools.ytdlp.command();

    if request.audio_only {
        let quality = request.quality.as_deref().unwrap_or(DEFAULT_AUDIO_QUALITY);
        command = command.args([
            "-f",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            AUDIO_FORMAT,
            "--audio-quality",
            quality,
        ]);
    } else {
        let format = request.quality.as_deref().unwrap_or(DEFAULT_VIDEO_FORMAT);
        command = command.args(["-f", format, "--merge-output-format", MERGE_FORMAT]);
    }

    command = command.arg("-o").arg(output_dir.join(OUTPUT_TEMPLATE));

    if let Some(dir) = tools.ffmpeg.as_ref().and_then(ToolLocation::install_dir) {
        command = command.arg("--ffmpeg-location").arg(dir);
    }

    command = command.args(["--newline", "--no-warnings", "--embed-metadata"]);
    command = command.arg(if request.audio_only {
        "--embed-thumbnail"
    } else {
        "--write-thumbnail"
    });

    command
        .args(["--embed-subs", "--sub-langs", SUBTITLE_LANGS])
        .arg(&request.url)
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedRunner, completed};
    use std::{ffi::OsStr, time::Duration};

    fn toolchain(ffmpeg: Option<ToolLocation>) -> Toolchain {
        Toolchain {
            ytdlp: ToolLocation::OnPath("yt-dlp"),
            ffmpeg,
        }
    }

    fn video_request(url: &str) -> DownloadRequest {
        DownloadRequest::new(url)
    }

    #[test]
    fn test_video_command_defaults() {
        let command = build_download_command(
            &toolchain(Some(ToolLocation::OnPath("ffmpeg"))),
            &video_request("https://youtu.be/dQw4w9WgXcQ"),
            Path::new("/tmp/x"),
        );

        assert_eq!(
            command.to_string(),
            "yt-dlp -f bestvideo*+bestaudio/best --merge-output-format mp4 \
             -o /tmp/x/%(title)s.%(ext)s --newline --no-warnings --embed-metadata \
             --write-thumbnail --embed-subs --sub-langs en https://youtu.be/dQw4w9WgXcQ"
        );
        assert!(!command.has_arg("--ffmpeg-location"));
        assert!(!command.has_arg("--extract-audio"));
    }

    #[test]
    fn test_audio_command() {
        let request = DownloadRequest {
            audio_only: true,
            quality: Some("5".to_string()),
            ..DownloadRequest::new("https://www.youtube.com/watch?v=abc")
        };
        let command = build_download_command(&toolchain(None), &request, Path::new("/music"));

        assert_eq!(command.value_of("-f"), Some(OsStr::new("bestaudio/best")));
        assert_eq!(command.value_of("--audio-format"), Some(OsStr::new("mp3")));
        assert_eq!(command.value_of("--audio-quality"), Some(OsStr::new("5")));
        assert!(command.has_arg("--extract-audio"));
        assert!(command.has_arg("--embed-thumbnail"));
        assert!(!command.has_arg("--write-thumbnail"));
        assert!(!command.has_arg("--merge-output-format"));
    }

    #[test]
    fn test_custom_video_quality_replaces_default_selector() {
        let request = DownloadRequest {
            quality: Some("137+140".to_string()),
            ..video_request("https://youtu.be/abc")
        };
        let command = build_download_command(&toolchain(None), &request, Path::new("/v"));
        assert_eq!(command.value_of("-f"), Some(OsStr::new("137+140")));
    }

    #[test]
    fn test_ffmpeg_location_only_for_installed_ffmpeg() {
        let installed = ToolLocation::Installed(PathBuf::from("/home/ada/.local/bin/ffmpeg"));
        let command = build_download_command(
            &toolchain(Some(installed)),
            &video_request("https://youtu.be/abc"),
            Path::new("/v"),
        );
        assert_eq!(
            command.value_of("--ffmpeg-location"),
            Some(OsStr::new("/home/ada/.local/bin"))
        );

        let command = build_download_command(
            &toolchain(None),
            &video_request("https://youtu.be/abc"),
            Path::new("/v"),
        );
        assert!(!command.has_arg("--ffmpeg-location"));
    }

    #[tokio::test]
    async fn test_download_reports_destination_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);
        let runner = ScriptedRunner::new(|_| {
            completed(
                0,
                "[youtube] abc: Downloading webpage\n\
                 [download] Destination: /tmp/x/My Video.mp4\n\
                 [download] 100% of 10.00MiB\n",
                "",
            )
        });
        let output_dir = dir.path().join("out");
        let request = DownloadRequest {
            output_dir: Some(output_dir.clone()),
            ..video_request("https://www.youtube.com/watch?v=abc")
        };
        let mut seen = Vec::new();

        let outcome = Driver::new(&runner, &tools, &settings)
            .download(&request, &mut |line: &str| seen.push(line.to_string()))
            .await;

        assert_eq!(
            outcome,
            Outcome::Success(DownloadedFiles {
                output_files: vec![PathBuf::from("/tmp/x/My Video.mp4")],
                output_dir: output_dir.clone(),
            })
        );
        assert!(output_dir.is_dir());
        assert_eq!(seen.len(), 3);
        assert_eq!(runner.limits(), vec![settings.timeouts.download]);
    }

    #[tokio::test]
    async fn test_download_rejects_invalid_url_without_running() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);
        let runner = ScriptedRunner::new(|_| completed(0, "", ""));

        for url in ["ftp://youtube.com/watch?v=abc", "https://example.com/x", "not a url"] {
            let outcome = Driver::new(&runner, &tools, &settings)
                .download(&video_request(url), &mut |_| {})
                .await;
            assert_eq!(outcome, Outcome::Failure(Failure::new("Invalid YouTube URL")));
        }

        assert!(runner.calls().is_empty());
        assert!(!settings.download_dir.exists());
    }

    #[tokio::test]
    async fn test_download_failure_carries_stderr_and_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);
        let runner = ScriptedRunner::new(|_| {
            completed(1, "[youtube] abc: Downloading webpage\n", "ERROR: Video unavailable\n")
        });

        let outcome = Driver::new(&runner, &tools, &settings)
            .download(&video_request("https://youtu.be/abc"), &mut |_| {})
            .await;

        assert_eq!(
            outcome,
            Outcome::Failure(
                Failure::new("ERROR: Video unavailable")
                    .with_stdout("[youtube] abc: Downloading webpage\n")
            )
        );
        assert!(settings.download_dir.is_dir());
    }

    #[tokio::test]
    async fn test_download_failure_without_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);
        let runner = ScriptedRunner::new(|_| completed(2, "partial\n", "  \n"));

        let outcome = Driver::new(&runner, &tools, &settings)
            .download(&video_request("https://youtu.be/abc"), &mut |_| {})
            .await;

        assert_eq!(
            outcome,
            Outcome::Failure(Failure::new("Unknown error").with_stdout("partial\n"))
        );
    }

    #[tokio::test]
    async fn test_download_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);
        let runner = ScriptedRunner::new(|_| CommandOutcome::TimedOut {
            after: Duration::from_secs(600),
        });

        let outcome = Driver::new(&runner, &tools, &settings)
            .download(&video_request("https://youtu.be/abc"), &mut |_| {})
            .await;

        assert_eq!(
            outcome,
            Outcome::Failure(Failure::new("Download timed out (10 minutes)"))
        );
    }

    #[tokio::test]
    async fn test_info_summarizes_first_json_line() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);
        let dump = r#"{"title":"T","uploader":"U","duration_string":"3:32","view_count":42,"formats":[{"format_id":"160","vcodec":"avc1","height":144},{"format_id":"18","vcodec":"avc1","height":360},{"format_id":"137","vcodec":"avc1.640028","height":1080},{"format_id":"140","vcodec":"none","acodec":"mp4a"}]}"#;
        let stdout = format!("{}\n", dump);
        let runner = ScriptedRunner::new(move |_| completed(0, &stdout, ""));

        let outcome = Driver::new(&runner, &tools, &settings)
            .info("https://youtu.be/abc")
            .await;

        let Outcome::Success(summary) = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(summary.title.as_deref(), Some("T"));
        assert_eq!(summary.views, Some(42));
        assert_eq!(summary.best_video_quality, "1080p");
        assert_eq!(summary.best_video_codec, "avc1.640028");
        assert_eq!(
            runner.calls()[0].to_string(),
            "yt-dlp --dump-json --no-download https://youtu.be/abc"
        );
        assert_eq!(runner.limits(), vec![settings.timeouts.query]);
    }

    #[tokio::test]
    async fn test_info_failure_has_reason() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);
        let runner = ScriptedRunner::new(|_| completed(0, "not json\n", ""));

        let outcome = Driver::new(&runner, &tools, &settings)
            .info("https://youtu.be/abc")
            .await;

        let Outcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.error, "Could not fetch video info");
        assert!(failure.reason.unwrap().starts_with("JSON parse error"));
    }

    #[tokio::test]
    async fn test_info_process_failures_have_reasons() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);
        let cases = vec![
            (
                completed(1, "", "ERROR: [youtube] abc: Private video\n"),
                "Fetching video info failed: ERROR: [youtube] abc: Private video",
            ),
            (
                completed(2, "", ""),
                "Fetching video info failed: yt-dlp exited with status 2",
            ),
            (
                CommandOutcome::TimedOut {
                    after: Duration::from_secs(30),
                },
                "Fetching video info timed out after 30s",
            ),
            (
                CommandOutcome::SpawnError("Failed to start yt-dlp: not found".to_string()),
                "Fetching video info failed: Failed to start yt-dlp: not found",
            ),
            (completed(0, "\n", ""), "yt-dlp returned no output"),
        ];

        for (response, reason) in cases {
            let runner = ScriptedRunner::new(move |_| response.clone());

            let outcome = Driver::new(&runner, &tools, &settings)
                .info("https://youtu.be/abc")
                .await;

            assert_eq!(
                outcome,
                Outcome::Failure(Failure::new("Could not fetch video info").with_reason(reason))
            );
        }
    }

    #[tokio::test]
    async fn test_formats_returns_listing_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);
        let listing = "ID  EXT   RESOLUTION\n137 mp4   1920x1080\n";
        let runner = ScriptedRunner::new(|_| completed(0, listing, ""));

        let outcome = Driver::new(&runner, &tools, &settings)
            .formats("https://youtu.be/abc")
            .await;

        assert_eq!(
            outcome,
            Outcome::Success(FormatListing {
                formats: listing.to_string()
            })
        );
        assert_eq!(
            runner.calls()[0].to_string(),
            "yt-dlp --list-formats https://youtu.be/abc"
        );
    }

    #[tokio::test]
    async fn test_formats_failures() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_home(dir.path());
        let tools = toolchain(None);

        let runner = ScriptedRunner::new(|_| completed(1, "", ""));
        let outcome = Driver::new(&runner, &tools, &settings)
            .formats("https://youtu.be/abc")
            .await;
        assert_eq!(outcome, Outcome::Failure(Failure::new("Failed to list formats")));

        let runner = ScriptedRunner::new(|_| CommandOutcome::TimedOut {
            after: Duration::from_secs(30),
        });
        let outcome = Driver::new(&runner, &tools, &settings)
            .formats("https://youtu.be/abc")
            .await;
        assert_eq!(
            outcome,
            Outcome::Failure(Failure::new("Listing formats timed out after 30s"))
        );
    }
}
