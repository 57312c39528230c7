use std::{cell::RefCell, sync::LazyLock, time::Duration};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use ytgrab_core::InstallReporter;

// [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\S+)(?:\s+at\s+(\S+))?(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?",
    )
    .unwrap()
});

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn finish_spinner(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    eprintln!("{} {}", style("✓").green().bold(), msg);
}

/// Short status text for a yt-dlp `--newline` progress line.
pub fn describe_line(line: &str) -> Option<String> {
    let caps = PROGRESS_RE.captures(line)?;
    let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
    let size = caps.get(2)?.as_str();

    let mut status = format!("Downloading {:.1}% of {}", percent, size);
    if let Some(speed) = caps.get(3) {
        status.push_str(&format!(" at {}", speed.as_str()));
    }
    if let Some(eta) = caps.get(4) {
        status.push_str(&format!(" ETA {}", eta.as_str()));
    }
    if let (Some(current), Some(total)) = (caps.get(5), caps.get(6)) {
        status.push_str(&format!(" (frag {}/{})", current.as_str(), total.as_str()));
    }
    Some(status)
}

/// Renders tool installation on stderr.
#[derive(Default)]
pub struct CliReporter {
    bar: RefCell<Option<ProgressBar>>,
}

impl InstallReporter for CliReporter {
    fn status(&self, message: &str) {
        eprintln!("{} {}", style("→").cyan().bold(), message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{} {}", style("Warning:").yellow().bold(), message);
    }

    fn download_started(&self, url: &str, total_bytes: Option<u64>) {
        let pb = match total_bytes {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.cyan} [{bar:30.cyan/dim}] {bytes}/{total_bytes} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                pb
            }
            None => create_spinner(""),
        };
        let name = url.rsplit('/').next().unwrap_or(url);
        pb.set_message(name.to_string());
        *self.bar.borrow_mut() = Some(pb);
    }

    fn download_progress(&self, downloaded: u64) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.set_position(downloaded);
        }
    }

    fn download_finished(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}
