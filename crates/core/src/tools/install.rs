use std::{path::PathBuf, time::Duration};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::InstallError,
    runner::{Capture, CommandLine, CommandRunner},
    tools::{
        InstallReporter, Tool, ToolLocation, Toolchain, archive, fetch,
        platform::{Os, Platform},
    },
};

/// Resolves each tool to something invocable, installing it when needed.
///
/// Order per tool: bare name on `PATH`, then the private install directory,
/// then an installation attempt followed by a verification probe.
pub struct ToolLocator<'a, R: ?Sized, P: ?Sized> {
    settings: &'a Settings,
    runner: &'a R,
    reporter: &'a P,
    platform: Platform,
}

impl<'a, R, P> ToolLocator<'a, R, P>
where
    R: CommandRunner + ?Sized,
    P: InstallReporter + ?Sized,
{
    pub fn new(settings: &'a Settings, runner: &'a R, reporter: &'a P) -> Self {
        Self {
            settings,
            runner,
            reporter,
            platform: Platform::current(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Resolve both tools. A yt-dlp failure is returned; an ffmpeg failure
    /// is reported as a warning and leaves `ffmpeg` unset.
    pub async fn locate_all(&self) -> Result<Toolchain, InstallError> {
        let ytdlp = self.locate(Tool::YtDlp).await?;
        let ffmpeg = self.locate_or_skip(Tool::Ffmpeg).await?;

        Ok(Toolchain { ytdlp, ffmpeg })
    }

    /// Errors for required tools are returned; optional ones degrade to `None`.
    async fn locate_or_skip(&self, tool: Tool) -> Result<Option<ToolLocation>, InstallError> {
        match self.locate(tool).await {
            Ok(location) => Ok(Some(location)),
            Err(e) if tool.is_required() => Err(e),
            Err(e) => {
                warn!(%tool, error = %e, "optional tool unavailable");
                self.reporter.warning(&format!(
                    "{} not available ({}). Some high-quality downloads may fail.",
                    tool, e
                ));
                Ok(None)
            }
        }
    }

    pub async fn locate(&self, tool: Tool) -> Result<ToolLocation, InstallError> {
        let on_path = ToolLocation::OnPath(tool.binary_name());
        if self.probe(tool, &on_path).await {
            debug!(%tool, "found on PATH");
            return Ok(on_path);
        }

        let installed = self.settings.tool_path(tool);
        if installed.exists() {
            debug!(%tool, path = %installed.display(), "found in install directory");
            return Ok(ToolLocation::Installed(installed));
        }

        match tool {
            Tool::YtDlp => self.install_ytdlp().await,
            Tool::Ffmpeg => self.install_ffmpeg().await,
        }
    }

    async fn probe(&self, tool: Tool, location: &ToolLocation) -> bool {
        let command = location.command().arg(tool.version_flag());
        self.runner
            .run(&command, self.settings.timeouts.probe, Capture::Piped)
            .await
            .succeeded()
    }

    /// Run a package manager, then look for the tool on `PATH` and in the
    /// install directory. pipx links into `~/.local/bin`, which is often not
    /// on `PATH`.
    async fn install_with(
        &self,
        tool: Tool,
        command: CommandLine,
        limit: Duration,
    ) -> Option<ToolLocation> {
        let outcome = self.runner.run(&command, limit, Capture::Piped).await;
        if !outcome.succeeded() {
            debug!(%command, ?outcome, "installer command failed");
            return None;
        }

        let on_path = ToolLocation::OnPath(tool.binary_name());
        if self.probe(tool, &on_path).await {
            return Some(on_path);
        }

        let linked = self.settings.tool_path(tool);
        if !linked.exists() {
            return None;
        }
        self.verify(tool, linked).await.ok()
    }

    async fn install_ytdlp(&self) -> Result<ToolLocation, InstallError> {
        let tool = Tool::YtDlp;
        self.reporter.status("Installing yt-dlp...");
        fs::create_dir_all(&self.settings.bin_dir).await?;

        let pipx = CommandLine::new("pipx").args(["install", "yt-dlp"]);
        if let Some(location) = self
            .install_with(tool, pipx, self.settings.timeouts.pipx)
            .await
        {
            return Ok(location);
        }

        let target = self.settings.tool_path(tool);
        fetch::download_file(
            &self.settings.releases.ytdlp,
            &target,
            self.settings.timeouts.fetch,
            self.reporter,
        )
        .await?;
        archive::make_executable(&target)?;

        self.verify(tool, target).await
    }

    async fn install_ffmpeg(&self) -> Result<ToolLocation, InstallError> {
        let tool = Tool::Ffmpeg;

        match self.platform.os {
            Os::MacOs => {
                self.reporter.status("Installing ffmpeg via Homebrew...");
                let brew = CommandLine::new("brew").args(["install", "ffmpeg"]);
                if let Some(location) = self
                    .install_with(tool, brew, self.settings.timeouts.brew)
                    .await
                {
                    return Ok(location);
                }
                Err(InstallError::ManualInstallRequired {
                    tool,
                    hint: "brew install ffmpeg".to_string(),
                })
            }
            Os::Linux => {
                let url = self
                    .platform
                    .ffmpeg_archive_url(&self.settings.releases.ffmpeg_builds)?;
                self.reporter.status("Installing ffmpeg static binary...");
                fs::create_dir_all(&self.settings.bin_dir).await?;

                let scratch = tempfile::tempdir()?;
                let archive_path = scratch.path().join("ffmpeg.tar.xz");
                fetch::download_file(
                    &url,
                    &archive_path,
                    self.settings.timeouts.fetch,
                    self.reporter,
                )
                .await?;

                let target = self.settings.tool_path(tool);
                archive::extract_binary(&archive_path, tool.binary_name(), &target)?;

                self.verify(tool, target).await
            }
            Os::Other(os) => Err(InstallError::ManualInstallRequired {
                tool,
                hint: format!(
                    "no automatic install on {}, see https://ffmpeg.org/download.html",
                    os
                ),
            }),
        }
    }

    /// Probe a freshly installed binary by its full path.
    async fn verify(&self, tool: Tool, path: PathBuf) -> Result<ToolLocation, InstallError> {
        let location = ToolLocation::Installed(path.clone());
        if !self.probe(tool, &location).await {
            return Err(InstallError::VerificationFailed { tool, path });
        }

        info!(%tool, %location, "installed");
        self.reporter
            .status(&format!("{} installed to {}", tool, location));
        Ok(location)
    }
}
