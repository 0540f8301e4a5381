//! Per-process log files.
//!
//! Each transcoder gets `<directory>/<name>.log`. The log is size-limited
//! while it is being written: once the active file would grow past
//! `max_size_mb`, it is renamed to `<name>.log.<unix-millis>` (gzipped to
//! `<name>.log.<unix-millis>.gz` when `compress` is set), a fresh file is
//! started, and old backups are pruned by count and age. An already
//! oversized file is rotated the same way when it is opened.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::config::LoggingOptions;
use crate::error::{HlsError, Result};

const BYTES_PER_MB: u64 = 1024 * 1024;
const SECS_PER_DAY: u64 = 24 * 60 * 60;
const GZ_SUFFIX: &str = ".gz";

/// Opens transcoder log files according to [`LoggingOptions`].
pub struct ProcessLog;

impl ProcessLog {
    /// Path of the active log file for `name`.
    pub fn path(options: &LoggingOptions, name: &str) -> PathBuf {
        options.directory.join(format!("{name}.log"))
    }

    /// Open the rotating log for `name`, rotating an oversized file first.
    ///
    /// Returns `None` when logging is disabled.
    pub fn open(options: &LoggingOptions, name: &str) -> Result<Option<RotatingLog>> {
        if !options.enabled {
            return Ok(None);
        }

        let path = Self::path(options, name);
        fs::create_dir_all(&options.directory).map_err(|source| HlsError::LogFile {
            path: path.clone(),
            source,
        })?;

        let limit = options.max_size_mb.saturating_mul(BYTES_PER_MB);
        let log = RotatingLog::open(options.clone(), name, limit).map_err(|source| {
            HlsError::LogFile {
                path: path.clone(),
                source,
            }
        })?;
        Ok(Some(log))
    }
}

/// A size-limited log file that rotates itself as it is written.
///
/// A single `write` never pushes the active file past the limit; the
/// remainder of the buffer goes to the next file, so `write_all` may
/// rotate several times for one large buffer.
#[derive(Debug)]
pub struct RotatingLog {
    options: LoggingOptions,
    name: String,
    path: PathBuf,
    file: File,
    size: u64,
    limit: u64,
}

impl RotatingLog {
    fn open(options: LoggingOptions, name: &str, limit: u64) -> io::Result<Self> {
        let path = ProcessLog::path(&options, name);
        let size = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
        let file = open_append(&path)?;
        let mut log = Self {
            options,
            name: name.to_string(),
            path,
            file,
            size,
            limit,
        };
        if log.limit > 0 && log.size >= log.limit {
            log.rotate()?;
        } else {
            prune_backups(&log.options, &log.name);
        }
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the active file aside, optionally compress it, prune old
    /// backups and start a new file.
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let backup = free_backup_path(&self.path);
        fs::rename(&self.path, &backup)?;
        self.file = open_append(&self.path)?;
        self.size = 0;

        if self.options.compress {
            match compress_backup(&backup) {
                Ok(gz) => tracing::debug!(backup = %gz.display(), "rotated process log"),
                Err(e) => tracing::warn!(
                    backup = %backup.display(),
                    error = %e,
                    "failed to compress rotated process log"
                ),
            }
        } else {
            tracing::debug!(backup = %backup.display(), "rotated process log");
        }

        prune_backups(&self.options, &self.name);
        Ok(())
    }
}

impl Write for RotatingLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.limit == 0 {
            let n = self.file.write(buf)?;
            self.size += n as u64;
            return Ok(n);
        }
        if self.size >= self.limit {
            self.rotate()?;
        }
        let room = usize::try_from(self.limit - self.size).unwrap_or(usize::MAX);
        let n = self.file.write(&buf[..buf.len().min(room)])?;
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn backup_path(path: &Path, millis: u128) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{millis}"));
    path.with_file_name(name)
}

/// Backup path stamped with the current time, bumped past any stamp already
/// taken by a rotation within the same millisecond.
fn free_backup_path(path: &Path) -> PathBuf {
    let mut millis = now_millis();
    loop {
        let candidate = backup_path(path, millis);
        let mut gz = candidate.clone().into_os_string();
        gz.push(GZ_SUFFIX);
        if !candidate.exists() && !Path::new(&gz).exists() {
            return candidate;
        }
        millis += 1;
    }
}

/// Gzip `backup` into `<backup>.gz` and remove the uncompressed file.
fn compress_backup(backup: &Path) -> io::Result<PathBuf> {
    let mut gz_path = backup.as_os_str().to_os_string();
    gz_path.push(GZ_SUFFIX);
    let gz_path = PathBuf::from(gz_path);

    let mut input = File::open(backup)?;
    let mut encoder = GzEncoder::new(File::create(&gz_path)?, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    fs::remove_file(backup)?;
    Ok(gz_path)
}

/// Rotated backups of `name`, newest first, as `(timestamp_millis, path)`.
fn backups(options: &LoggingOptions, name: &str) -> Vec<(u128, PathBuf)> {
    let prefix = format!("{name}.log.");
    let Ok(entries) = fs::read_dir(&options.directory) else {
        return Vec::new();
    };
    let mut found: Vec<(u128, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_name = entry.file_name();
            let rest = file_name.to_str()?.strip_prefix(&prefix)?;
            let stamp = rest.strip_suffix(GZ_SUFFIX).unwrap_or(rest);
            if stamp.is_empty() || !stamp.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some((stamp.parse().ok()?, entry.path()))
        })
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0));
    found
}

/// Remove backups beyond `max_backups` and older than `max_age_days`.
///
/// Failures are logged and otherwise ignored; a stale backup must not keep
/// a transcoder from starting or its output from being written.
fn prune_backups(options: &LoggingOptions, name: &str) {
    let cutoff = (options.max_age_days > 0).then(|| {
        let age = Duration::from_secs(options.max_age_days.saturating_mul(SECS_PER_DAY));
        now_millis().saturating_sub(age.as_millis())
    });

    for (index, (stamp, path)) in backups(options, name).into_iter().enumerate() {
        let over_count = options.max_backups > 0 && index >= options.max_backups;
        let too_old = cutoff.is_some_and(|cutoff| stamp < cutoff);
        if !(over_count || too_old) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(backup = %path.display(), "removed old process log"),
            Err(e) => tracing::warn!(
                backup = %path.display(),
                error = %e,
                "failed to remove old process log"
            ),
        }
    }
}
