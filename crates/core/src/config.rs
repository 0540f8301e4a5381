use std::path::PathBuf;

/// Executable used when no locator is configured. Resolved through `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "ffmpeg";

/// Playlist behavior of the produced HLS output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaylistMode {
    /// Unbounded capture with a sliding window of recent segments.
    #[default]
    Live,
    /// Bounded capture with a complete playlist listing every segment.
    Finite,
}

impl PlaylistMode {
    pub fn from_live(live: bool) -> Self {
        if live { Self::Live } else { Self::Finite }
    }

    pub fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Options for the per-process log files.
///
/// Argument derivation never reads these; they are consumed by
/// [`ProcessLog`](crate::log::ProcessLog) when a command is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Route transcoder stdout/stderr into a log file.
    pub enabled: bool,
    /// Directory holding the log files.
    pub directory: PathBuf,
    /// Size in megabytes at which a log file is rotated. `0` disables rotation.
    pub max_size_mb: u64,
    /// Rotated files to keep. `0` keeps all of them.
    pub max_backups: usize,
    /// Age in days after which rotated files are removed. `0` keeps all of them.
    pub max_age_days: u64,
    /// Gzip rotated files to `<name>.log.<unix-millis>.gz`.
    pub compress: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::from("./logs"),
            max_size_mb: 500,
            max_backups: 3,
            max_age_days: 28,
            compress: true,
        }
    }
}

/// Static transcoding configuration, built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeConfig {
    /// Keep segment files on disk after they leave the live window.
    pub retain_segments: bool,
    /// Copy the audio stream through; when `false` the output is video-only.
    pub include_audio: bool,
    /// Live sliding window or finite on-demand playlist.
    pub mode: PlaylistMode,
    /// Caps total output duration when positive. Passed through unvalidated.
    pub capture_duration_secs: i64,
    pub logging: LoggingOptions,
    /// Transcoder executable, either a bare name looked up in `PATH` or a path.
    pub executable: PathBuf,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            retain_segments: false,
            include_audio: true,
            mode: PlaylistMode::Live,
            capture_duration_secs: 0,
            logging: LoggingOptions::default(),
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
        }
    }
}

impl TranscodeConfig {
    /// Duration cap in seconds, or `None` when capture is unbounded.
    pub fn duration_cap(&self) -> Option<i64> {
        (self.capture_duration_secs > 0).then_some(self.capture_duration_secs)
    }
}
