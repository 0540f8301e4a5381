//! Transcoder argument derivation.
//!
//! The ffmpeg command line is positional: options apply to the next input
//! or output that follows them. Arguments are therefore assembled from
//! fixed groups in a fixed order, with configuration only choosing which
//! groups take part:
//!
//! ```text
//! input     -y -rtsp_transport tcp -i <uri>
//! video     -c:v libx264 -x264opts keyint=30:no-scenecut -preset veryfast
//! audio     -c:a copy | -an
//! duration  [-t <secs>]
//! format    -f hls
//! playlist  live:   -hls_flags <flags> -segment_list_flags live -hls_time 1 -hls_list_size 3
//!           finite: -hls_list_size 0 -hls_time 5
//! output    -hls_segment_filename <dir>/%d.ts <dir>/index.m3u8
//! ```
//!
//! Everything here is pure; see [`crate::CommandBuilder`] for the side effects.

use std::fmt;
use std::path::Path;

use crate::config::{PlaylistMode, TranscodeConfig};

/// Playlist file name written into the output directory.
pub const PLAYLIST_FILE: &str = "index.m3u8";

/// Segment file pattern; ffmpeg substitutes the sequence number for `%d`.
pub const SEGMENT_PATTERN: &str = "%d.ts";

const INPUT: [&str; 4] = ["-y", "-rtsp_transport", "tcp", "-i"];
const VIDEO: [&str; 6] = [
    "-c:v",
    "libx264",
    "-x264opts",
    "keyint=30:no-scenecut",
    "-preset",
    "veryfast",
];
const AUDIO_COPY: [&str; 2] = ["-c:a", "copy"];
const AUDIO_NONE: [&str; 1] = ["-an"];
const FORMAT: [&str; 2] = ["-f", "hls"];
const LIVE_WINDOW: [&str; 6] = [
    "-segment_list_flags",
    "live",
    "-hls_time",
    "1",
    "-hls_list_size",
    "3",
];
const FINITE_PLAYLIST: [&str; 4] = ["-hls_list_size", "0", "-hls_time", "5"];

/// Value of `-hls_flags` in live mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlsFlags {
    /// Keep old segments on disk; only the playlist window slides.
    AppendList,
    /// Delete segments once they leave the playlist window.
    DeleteSegmentsAppendList,
}

impl HlsFlags {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AppendList => "append_list",
            Self::DeleteSegmentsAppendList => "delete_segments+append_list",
        }
    }
}

impl fmt::Display for HlsFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Select the live-mode segment retention flags.
///
/// Retaining trades unbounded disk growth for a full on-disk history;
/// deleting keeps the footprint bounded to the playlist window.
pub fn hls_flags(retain_segments: bool) -> HlsFlags {
    if retain_segments {
        HlsFlags::AppendList
    } else {
        HlsFlags::DeleteSegmentsAppendList
    }
}

/// `output_dir` as ffmpeg sees it.
///
/// Arguments are UTF-8 strings, so a non-UTF-8 directory is converted
/// lossily (invalid sequences become U+FFFD) and ffmpeg would write to a
/// different path than the one created. Callers must pass UTF-8 paths.
fn dir_prefix(output_dir: &Path) -> String {
    let dir = output_dir.to_string_lossy();
    dir.trim_end_matches('/').to_string()
}

/// Segment file template under `output_dir`, e.g. `/tmp/cam1/%d.ts`.
///
/// The directory and file name are joined with `/`, which ffmpeg accepts on
/// every platform. Trailing `/` separators on `output_dir` are dropped first,
/// so `/tmp/cam1/` and `/tmp/cam1` give the same template; any other form
/// (including a trailing `\`) is used verbatim as `<output_dir>/%d.ts`.
/// [`playlist_path`] follows the same rule.
pub fn segment_template(output_dir: &Path) -> String {
    format!("{}/{}", dir_prefix(output_dir), SEGMENT_PATTERN)
}

/// Playlist path under `output_dir`, e.g. `/tmp/cam1/index.m3u8`.
pub fn playlist_path(output_dir: &Path) -> String {
    format!("{}/{}", dir_prefix(output_dir), PLAYLIST_FILE)
}

fn owned<const N: usize>(group: [&str; N]) -> impl Iterator<Item = String> {
    group.into_iter().map(str::to_string)
}

fn audio_args(include_audio: bool) -> Vec<String> {
    if include_audio {
        owned(AUDIO_COPY).collect()
    } else {
        owned(AUDIO_NONE).collect()
    }
}

fn duration_args(config: &TranscodeConfig) -> Vec<String> {
    match config.duration_cap() {
        Some(secs) => vec!["-t".to_string(), secs.to_string()],
        None => Vec::new(),
    }
}

fn playlist_args(config: &TranscodeConfig) -> Vec<String> {
    match config.mode {
        PlaylistMode::Live => {
            let flags = hls_flags(config.retain_segments);
            ["-hls_flags".to_string(), flags.to_string()]
                .into_iter()
                .chain(owned(LIVE_WINDOW))
                .collect()
        }
        PlaylistMode::Finite => owned(FINITE_PLAYLIST).collect(),
    }
}

fn output_args(output_dir: &Path) -> [String; 3] {
    [
        "-hls_segment_filename".to_string(),
        segment_template(output_dir),
        playlist_path(output_dir),
    ]
}

/// Derive the full transcoder argument list.
///
/// The result is a pure function of its inputs. The last two tokens are
/// always the segment template followed by the playlist path.
pub fn transcode_args(
    config: &TranscodeConfig,
    output_dir: &Path,
    source_uri: &str,
) -> Vec<String> {
    owned(INPUT)
        .chain(std::iter::once(source_uri.to_string()))
        .chain(owned(VIDEO))
        .chain(audio_args(config.include_audio))
        .chain(duration_args(config))
        .chain(owned(FORMAT))
        .chain(playlist_args(config))
        .chain(output_args(output_dir))
        .collect()
}
