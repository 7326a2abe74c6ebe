//! Command-line entry point for takeout-dl.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use takeout_dl::{AudioFormat, Config, Error, TakeoutDownloader};

/// Download the playlists of a music-service export as audio files.
#[derive(Debug, Parser)]
#[command(name = "takeout-dl", version, about)]
struct Cli {
    /// Directory scanned recursively for playlist JSON files
    takeout_path: PathBuf,

    /// Output library directory
    #[arg(short, long, default_value = "./library")]
    output_dir: PathBuf,

    /// Output audio format
    #[arg(long, default_value = "m4a", value_parser = ["m4a", "mp3"])]
    audio_format: String,

    /// Audio quality (for mp3: 0 = best VBR, 9 = worst)
    #[arg(long, default_value = "0")]
    quality: String,

    /// Number of parallel downloads per playlist
    #[arg(long, default_value_t = 2)]
    concurrency: usize,

    /// Rewrite video URLs to the music domain for better music metadata
    #[arg(long)]
    prefer_youtube_music: bool,

    /// Write an m3u8 playlist file for each source playlist
    #[arg(long)]
    write_m3u: bool,

    /// Limit download rate, e.g. 1M
    #[arg(long)]
    rate_limit: Option<String>,

    /// Sleep between downloads: "N" fixed seconds, or "min,max" randomized
    #[arg(long)]
    sleep: Option<String>,

    /// Path to a cookies.txt file (Netscape format)
    #[arg(long)]
    cookies: Option<PathBuf>,

    /// Remove these segment categories from downloads (comma-separated)
    #[arg(long)]
    sponsorblock_remove: Option<String>,

    /// Search for a replacement source when a track is unavailable
    #[arg(long)]
    search_replacement: bool,

    /// Strip a trailing "-videos" suffix from playlist names
    #[arg(long)]
    strip_videos_suffix: bool,

    /// Explicit path to the extraction tool binary
    #[arg(long)]
    tool_path: Option<PathBuf>,

    /// Kill a tool invocation after this many seconds
    #[arg(long)]
    tool_timeout_secs: Option<u64>,

    /// Simulate the process without downloading files
    #[arg(long)]
    dry_run: bool,

    /// Show debug-level output
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::default();
        config.input_root = self.takeout_path;
        config.download.output_dir = self.output_dir;
        config.download.audio_format = if self.audio_format == "mp3" {
            AudioFormat::Mp3
        } else {
            AudioFormat::M4a
        };
        config.download.audio_quality = self.quality;
        config.download.concurrency = self.concurrency;
        config.download.prefer_music_domain = self.prefer_youtube_music;
        config.download.write_playlist_files = self.write_m3u;
        config.download.rate_limit = self.rate_limit;
        config.download.sleep_between = self.sleep;
        config.download.sponsorblock_remove = self.sponsorblock_remove;
        config.download.dry_run = self.dry_run;
        config.download.strip_videos_suffix = self.strip_videos_suffix;
        config.tools.tool_path = self.tool_path;
        config.tools.cookies_file = self.cookies;
        config.tools.tool_timeout_secs = self.tool_timeout_secs;
        config.search.replace_unavailable = self.search_replacement;
        config
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("takeout_dl={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_tracing(verbose);

    let config = cli.into_config();
    let mut downloader = match TakeoutDownloader::new(config) {
        Ok(downloader) => downloader,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize");
            return ExitCode::from(1);
        }
    };

    match downloader.run().await {
        Ok(report) => ExitCode::from(u8::try_from(report.exit_code()).unwrap_or(1)),
        Err(Error::InputRootMissing(path)) => {
            tracing::error!(path = %path.display(), "input root not found");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::from(1)
        }
    }
}
