//! Builds `ffmpeg` invocations that transcode an RTSP source into HLS.
//!
//! ```no_run
//! use hls::{CommandBuilder, TranscodeConfig};
//!
//! let builder = CommandBuilder::new(TranscodeConfig::default());
//! let cmd = builder.build_invocation("/var/hls/cam1", "rtsp://10.0.0.5/stream");
//! let mut child = cmd.spawn()?;
//! child.wait()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod args;
pub mod builder;
pub mod command;
pub mod config;
pub mod error;
pub mod log;

pub use args::HlsFlags;
pub use builder::CommandBuilder;
pub use command::{CommandDescriptor, LoggedChild};
pub use config::{LoggingOptions, PlaylistMode, TranscodeConfig};
pub use error::{HlsError, Result};
pub use log::{ProcessLog, RotatingLog};
