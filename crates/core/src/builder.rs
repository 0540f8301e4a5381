use std::fs::DirBuilder;
use std::io;
use std::path::Path;

use crate::args;
use crate::command::CommandDescriptor;
use crate::config::{LoggingOptions, PlaylistMode, TranscodeConfig};
use crate::error::{HlsError, Result};

/// Builds transcoder invocations that write HLS output for an RTSP source.
///
/// Holds an immutable [`TranscodeConfig`]; `build_invocation` only reads it,
/// so a single builder can be shared across threads (e.g. behind an `Arc`)
/// and used for any number of streams concurrently.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    config: TranscodeConfig,
}

impl CommandBuilder {
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    /// Create a builder from the individual configuration flags, using the
    /// default executable.
    pub fn from_flags(
        retain_segments: bool,
        include_audio: bool,
        live: bool,
        capture_duration_secs: i64,
        logging: LoggingOptions,
    ) -> Self {
        Self::new(TranscodeConfig {
            retain_segments,
            include_audio,
            mode: PlaylistMode::from_live(live),
            capture_duration_secs,
            logging,
            ..TranscodeConfig::default()
        })
    }

    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    /// Prepare the transcoder command for `source_uri`, writing into `output_dir`.
    ///
    /// The output directory is created if missing. Creation is best-effort:
    /// a failure is logged as a warning and the descriptor is still returned,
    /// leaving the transcoder to fail at startup if the directory is unusable.
    /// Use [`try_build_invocation`](Self::try_build_invocation) to get the
    /// error instead.
    ///
    /// `output_dir` must be valid UTF-8 to be passed to ffmpeg unchanged; see
    /// [`args::segment_template`].
    pub fn build_invocation(
        &self,
        output_dir: impl AsRef<Path>,
        source_uri: &str,
    ) -> CommandDescriptor {
        let output_dir = output_dir.as_ref();
        if let Err(e) = create_output_dir(output_dir) {
            tracing::warn!(
                dir = %output_dir.display(),
                error = %e,
                "could not create output directory"
            );
        }
        self.descriptor(output_dir, source_uri)
    }

    /// Like [`build_invocation`](Self::build_invocation), but fails with
    /// [`HlsError::CreateDir`] when the output directory cannot be created.
    pub fn try_build_invocation(
        &self,
        output_dir: impl AsRef<Path>,
        source_uri: &str,
    ) -> Result<CommandDescriptor> {
        let output_dir = output_dir.as_ref();
        create_output_dir(output_dir).map_err(|source| HlsError::CreateDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        Ok(self.descriptor(output_dir, source_uri))
    }

    fn descriptor(&self, output_dir: &Path, source_uri: &str) -> CommandDescriptor {
        let args = args::transcode_args(&self.config, output_dir, source_uri);
        tracing::debug!(?args, "ffmpeg params");
        CommandDescriptor::new(self.config.executable.clone(), args, output_dir)
    }
}

/// Recursively create `dir` with all-access permissions (before umask).
fn create_output_dir(dir: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }
    builder.create(dir)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn from_flags_maps_live_to_mode() {
        let live = CommandBuilder::from_flags(true, false, true, 5, LoggingOptions::default());
        assert_eq!(live.config().mode, PlaylistMode::Live);
        assert!(live.config().retain_segments);
        assert!(!live.config().include_audio);
        assert_eq!(live.config().capture_duration_secs, 5);

        let finite = CommandBuilder::from_flags(false, true, false, 0, LoggingOptions::default());
        assert_eq!(finite.config().mode, PlaylistMode::Finite);
        assert_eq!(finite.config().executable, Path::new("ffmpeg"));
    }

    #[test]
    fn descriptor_uses_configured_executable() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = CommandBuilder::new(TranscodeConfig {
            executable: "/opt/ffmpeg/bin/ffmpeg".into(),
            ..TranscodeConfig::default()
        });
        let desc = builder.build_invocation(tmp.path(), "rtsp://cam");
        assert_eq!(desc.program(), Path::new("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(desc.output_dir(), tmp.path());
    }

    #[test]
    fn unusable_directory_still_yields_descriptor() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let target = blocker.join("stream");

        let builder = CommandBuilder::new(TranscodeConfig::default());
        let desc = builder.build_invocation(&target, "rtsp://cam");
        assert_eq!(
            desc.args().last().map(String::as_str),
            Some(args::playlist_path(&target).as_str())
        );

        match builder.try_build_invocation(&target, "rtsp://cam") {
            Err(HlsError::CreateDir { path, .. }) => assert_eq!(path, target),
            other => panic!("expected CreateDir error, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_builds_share_one_builder() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = Arc::new(CommandBuilder::new(TranscodeConfig::default()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let builder = builder.clone();
                let dir = tmp.path().join(format!("cam{i}"));
                thread::spawn(move || builder.build_invocation(&dir, &format!("rtsp://cam{i}")))
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let desc = handle.join().unwrap();
            assert!(desc.args().contains(&format!("rtsp://cam{i}")));
            assert!(tmp.path().join(format!("cam{i}")).is_dir());
        }
    }
}
