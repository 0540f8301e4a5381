use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;

use hls::{CommandBuilder, LoggingOptions, PlaylistMode, TranscodeConfig};

use crate::types::PyCommand;

#[pyclass(name = "CommandBuilder", frozen)]
pub struct PyCommandBuilder {
    inner: CommandBuilder,
}

#[pymethods]
impl PyCommandBuilder {
    #[new]
    #[pyo3(signature = (
        retain_segments = false,
        include_audio = true,
        live = true,
        capture_duration = 0,
        executable = "ffmpeg",
        log_enabled = false,
        log_dir = "./logs",
        log_max_size = 500,
        log_max_backups = 3,
        log_max_age = 28,
        log_compress = true,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        retain_segments: bool,
        include_audio: bool,
        live: bool,
        capture_duration: i64,
        executable: &str,
        log_enabled: bool,
        log_dir: &str,
        log_max_size: u64,
        log_max_backups: usize,
        log_max_age: u64,
        log_compress: bool,
    ) -> Self {
        let config = TranscodeConfig {
            retain_segments,
            include_audio,
            mode: PlaylistMode::from_live(live),
            capture_duration_secs: capture_duration,
            logging: LoggingOptions {
                enabled: log_enabled,
                directory: log_dir.into(),
                max_size_mb: log_max_size,
                max_backups: log_max_backups,
                max_age_days: log_max_age,
                compress: log_compress,
            },
            executable: executable.into(),
        };
        PyCommandBuilder {
            inner: CommandBuilder::new(config),
        }
    }

    /// Prepare the transcoder command; the output directory is created
    /// on a best-effort basis.
    fn build_invocation(&self, output_dir: &str, source_uri: &str) -> PyCommand {
        self.inner.build_invocation(output_dir, source_uri).into()
    }

    /// Same as `build_invocation`, but raises if the output directory
    /// cannot be created.
    fn try_build_invocation(&self, output_dir: &str, source_uri: &str) -> PyResult<PyCommand> {
        self.inner
            .try_build_invocation(output_dir, source_uri)
            .map(PyCommand::from)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Build the command, run it to completion with its output written to
    /// the configured process log, and return the exit code.
    ///
    /// The GIL is released while the transcoder runs.
    #[pyo3(signature = (output_dir, source_uri, name = "stream"))]
    fn run(
        &self,
        py: Python<'_>,
        output_dir: &str,
        source_uri: &str,
        name: &str,
    ) -> PyResult<i32> {
        let cmd = self.inner.build_invocation(output_dir, source_uri);
        let logging = &self.inner.config().logging;
        let status = py
            .detach(|| {
                cmd.spawn_with_log(logging, name)
                    .map_err(|e| e.to_string())?
                    .wait()
                    .map_err(|e| e.to_string())
            })
            .map_err(PyRuntimeError::new_err)?;
        Ok(status.code().unwrap_or(-1))
    }
}
