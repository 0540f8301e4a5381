//! Error types for the HLS command builder.

use std::path::PathBuf;

/// Errors that can occur while preparing or launching a transcoder.
///
/// Argument derivation itself never fails. Errors only come from the
/// filesystem and process side effects around it:
///
/// - **Output directory**: [`CreateDir`](Self::CreateDir), only surfaced by
///   [`CommandBuilder::try_build_invocation`](crate::CommandBuilder::try_build_invocation).
/// - **Launch**: [`Spawn`](Self::Spawn), the executable could not be started.
/// - **Process logs**: [`LogFile`](Self::LogFile), rotation or opening failed.
#[derive(Debug, thiserror::Error)]
pub enum HlsError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output directory (or one of its parents) could not be created.
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transcoder executable could not be launched.
    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A process log file could not be rotated or opened.
    #[error("process log {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, HlsError>`.
pub type Result<T> = std::result::Result<T, HlsError>;
