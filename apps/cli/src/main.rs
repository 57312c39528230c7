use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Parser, Subcommand, error::ErrorKind};
use console::style;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use ytgrab_core::{
    DownloadRequest, Driver, Outcome, ProcessRunner, Settings, ToolLocator, Toolchain,
};

use crate::progress::{CliReporter, create_spinner, describe_line, finish_spinner};

mod progress;

#[derive(Parser)]
#[command(name = "ytgrab", version)]
#[command(about = "Fetch info, list formats and download YouTube videos with yt-dlp")]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download a video, or only its audio as mp3
    Download {
        /// Video URL
        url: String,

        /// Extract audio only
        #[arg(long)]
        audio: bool,

        /// yt-dlp format selector (video) or audio quality 0-9 (audio)
        #[arg(long)]
        quality: Option<String>,

        /// Output directory (defaults to ~/Downloads/youtube)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print metadata for a video
    Info {
        /// Video URL
        url: String,
    },
    /// List available formats for a video
    Formats {
        /// Video URL
        url: String,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_report<T: Serialize>(outcome: &Outcome<T>) -> Result<()> {
    println!("{}", outcome.to_json()?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print()?;
            return Ok(match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            });
        }
    };
    init_tracing(cli.verbose);

    let settings = Settings::from_env();
    debug!(?settings, "loaded settings");
    let runner = ProcessRunner;
    let reporter = CliReporter::default();

    let tools: Toolchain = match ToolLocator::new(&settings, &runner, &reporter)
        .locate_all()
        .await
    {
        Ok(tools) => tools,
        Err(e) => {
            eprintln!(
                "{} Failed to install yt-dlp: {}",
                style("Error:").red().bold(),
                e
            );
            eprintln!("Please install manually: pip install yt-dlp");
            return Ok(ExitCode::FAILURE);
        }
    };

    let driver = Driver::new(&runner, &tools, &settings);

    match cli.command {
        Command::Info { url } => {
            let spinner = create_spinner("Fetching video info...");
            let outcome = driver.info(&url).await;
            spinner.finish_and_clear();
            print_report(&outcome)?;
        }
        Command::Formats { url } => {
            let spinner = create_spinner("Listing formats...");
            let outcome = driver.formats(&url).await;
            spinner.finish_and_clear();
            print_report(&outcome)?;
        }
        Command::Download {
            url,
            audio,
            quality,
            output,
        } => {
            let request = DownloadRequest {
                url,
                audio_only: audio,
                quality,
                output_dir: output,
            };

            let spinner = create_spinner("Starting download...");
            let outcome = driver
                .download(&request, &mut |line: &str| {
                    if let Some(status) = describe_line(line) {
                        spinner.set_message(status);
                    }
                })
                .await;

            if outcome.is_success() {
                finish_spinner(&spinner, "Downloaded");
            } else {
                spinner.finish_and_clear();
            }
            print_report(&outcome)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
