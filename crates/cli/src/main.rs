use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hls::{CommandBuilder, LoggingOptions, PlaylistMode, TranscodeConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rtsp-hls",
    about = "Transcode an RTSP stream into an HLS playlist with ffmpeg"
)]
struct Args {
    /// RTSP source URI
    #[arg(long, short)]
    uri: String,

    /// Directory receiving the segments and index.m3u8
    #[arg(long, short)]
    output: PathBuf,

    /// Keep old segments on disk instead of deleting them in live mode
    #[arg(long, env = "RTSP_HLS_KEEP_FILES")]
    keep_files: bool,

    /// Drop the audio stream
    #[arg(long, env = "RTSP_HLS_NO_AUDIO")]
    no_audio: bool,

    /// Produce a complete on-demand playlist instead of a live window
    #[arg(long, env = "RTSP_HLS_FINITE")]
    finite: bool,

    /// Stop after this many seconds (0 or negative = unbounded)
    #[arg(
        long,
        short,
        default_value_t = 0,
        allow_negative_numbers = true,
        env = "RTSP_HLS_DURATION"
    )]
    duration: i64,

    /// Transcoder executable
    #[arg(long, default_value = "ffmpeg", env = "RTSP_HLS_FFMPEG")]
    ffmpeg: PathBuf,

    /// Write transcoder output to a log file
    #[arg(long, env = "RTSP_HLS_LOG")]
    log: bool,

    /// Directory for transcoder log files
    #[arg(long, default_value = "./logs", env = "RTSP_HLS_LOG_DIR")]
    log_dir: PathBuf,

    /// Rotate a log file once it reaches this size in megabytes
    #[arg(long, default_value_t = 500)]
    log_max_size: u64,

    /// Rotated log files to keep
    #[arg(long, default_value_t = 3)]
    log_max_backups: usize,

    /// Days to keep rotated log files
    #[arg(long, default_value_t = 28)]
    log_max_age: u64,

    /// Gzip rotated log files
    #[arg(long)]
    log_compress: bool,

    /// Log file name (without extension)
    #[arg(long, default_value = "stream")]
    name: String,

    /// Print the command instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> TranscodeConfig {
        TranscodeConfig {
            retain_segments: self.keep_files,
            include_audio: !self.no_audio,
            mode: PlaylistMode::from_live(!self.finite),
            capture_duration_secs: self.duration,
            logging: LoggingOptions {
                enabled: self.log,
                directory: self.log_dir.clone(),
                max_size_mb: self.log_max_size,
                max_backups: self.log_max_backups,
                max_age_days: self.log_max_age,
                compress: self.log_compress,
            },
            executable: self.ffmpeg.clone(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.config();
    let builder = CommandBuilder::new(config);
    let cmd = builder.build_invocation(&args.output, &args.uri);

    if args.dry_run {
        println!("{cmd}");
        return ExitCode::SUCCESS;
    }

    let logging = &builder.config().logging;
    let waited = if logging.enabled {
        cmd.spawn_with_log(logging, &args.name).map(|child| child.wait())
    } else {
        cmd.spawn().map(|mut child| child.wait())
    };

    match waited {
        Ok(Ok(status)) if status.success() => {
            tracing::info!(playlist = %cmd.playlist_path().display(), "transcoder finished");
            ExitCode::SUCCESS
        }
        Ok(Ok(status)) => {
            tracing::error!(%status, "transcoder exited with failure");
            ExitCode::FAILURE
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to wait for transcoder");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start transcoder");
            ExitCode::FAILURE
        }
    }
}
