//! Integration tests: filesystem side effects and launching the built command.
//!
//! A stub executable stands in for ffmpeg so the tests do not need it
//! installed.

use std::fs;
use std::path::Path;

use hls::{CommandBuilder, CommandDescriptor, LoggingOptions, PlaylistMode, TranscodeConfig};

fn builder(executable: &str) -> CommandBuilder {
    CommandBuilder::new(TranscodeConfig {
        retain_segments: false,
        include_audio: true,
        mode: PlaylistMode::Live,
        capture_duration_secs: 0,
        logging: LoggingOptions::default(),
        executable: executable.into(),
    })
}

#[test]
fn build_creates_missing_output_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("streams/cam1/hls");
    assert!(!dir.exists());

    let desc = builder("ffmpeg").build_invocation(&dir, "rtsp://127.0.0.1:8554/stream");

    assert!(dir.is_dir(), "output directory was not created");
    let n = desc.args().len();
    assert_eq!(desc.args()[n - 2], format!("{}/%d.ts", dir.display()));
    assert_eq!(desc.args()[n - 1], format!("{}/index.m3u8", dir.display()));
}

#[test]
fn build_accepts_existing_directory() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("0.ts"), b"segment").unwrap();

    let desc = builder("ffmpeg")
        .try_build_invocation(tmp.path(), "rtsp://cam")
        .expect("existing directory is usable");

    assert!(tmp.path().join("0.ts").exists());
    assert_eq!(desc.playlist_path(), tmp.path().join("index.m3u8"));
}

#[cfg(unix)]
#[test]
fn created_directory_is_writable() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("cam2");
    builder("ffmpeg").build_invocation(&dir, "rtsp://cam");

    let mode = fs::metadata(&dir).unwrap().permissions().mode();
    assert_ne!(mode & 0o700, 0, "owner has no access: {mode:o}");
}

#[cfg(unix)]
#[test]
fn spawns_stub_executable_with_arguments() {
    let tmp = tempfile::tempdir().unwrap();
    let desc = builder("echo").build_invocation(tmp.path().join("out"), "rtsp://cam");

    let output = desc.command().output().expect("run echo");
    assert!(output.status.success());

    let printed = String::from_utf8_lossy(&output.stdout);
    assert_eq!(printed.trim_end(), desc.args().join(" "));
}

#[cfg(unix)]
#[test]
fn spawn_with_log_writes_output_to_process_log() {
    let tmp = tempfile::tempdir().unwrap();
    let logging = LoggingOptions {
        enabled: true,
        directory: tmp.path().join("logs"),
        ..LoggingOptions::default()
    };
    let desc = builder("echo").build_invocation(tmp.path().join("out"), "rtsp://cam");

    let status = desc
        .spawn_with_log(&logging, "cam1")
        .expect("spawn echo")
        .wait()
        .expect("wait for echo");
    assert!(status.success());

    let log = fs::read_to_string(Path::new(&logging.directory).join("cam1.log")).unwrap();
    assert!(log.contains("rtsp://cam"));
    assert!(log.contains("-hls_segment_filename"));
}

#[cfg(unix)]
#[test]
fn failing_transcoder_reports_non_zero_exit() {
    let tmp = tempfile::tempdir().unwrap();
    let desc = builder("false").build_invocation(tmp.path(), "rtsp://unreachable");

    let status = desc.spawn().unwrap().wait().unwrap();
    assert!(!status.success());
}

#[cfg(unix)]
#[test]
fn long_running_output_is_rotated_while_written() {
    let tmp = tempfile::tempdir().unwrap();
    let logging = LoggingOptions {
        enabled: true,
        directory: tmp.path().join("logs"),
        max_size_mb: 1,
        max_backups: 5,
        max_age_days: 0,
        compress: true,
    };
    let noisy = CommandDescriptor::new(
        "sh",
        vec![
            "-c".to_string(),
            "head -c 3000000 /dev/zero | tr '\\0' x; echo done >&2".to_string(),
        ],
        tmp.path(),
    );

    let status = noisy.spawn_with_log(&logging, "cam1").unwrap().wait().unwrap();
    assert!(status.success());

    let active = fs::metadata(logging.directory.join("cam1.log")).unwrap().len();
    assert!(active <= 1024 * 1024, "active log is {active} bytes");

    let gz_backups = fs::read_dir(&logging.directory)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.starts_with("cam1.log.") && name.ends_with(".gz")
        })
        .count();
    assert_eq!(gz_backups, 2);
}
