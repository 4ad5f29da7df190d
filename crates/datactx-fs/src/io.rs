//! Atomic I/O operations with file locking

use crate::{Error, NormalizedPath, Result};
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::time::Duration;

/// Tuning for how hard atomic writes try before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// Take an advisory exclusive lock on the temp file while writing.
    pub lock_files: bool,
    /// Upper bound on time spent retrying the final rename.
    pub max_rename_retry: Duration,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_files: true,
            max_rename_retry: Duration::from_millis(500),
        }
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers never observe a partial file.
/// The rename is retried with exponential backoff because it can fail
/// transiently on platforms where another handle is still open.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], robustness: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }

    // Temp file lives in the same directory so the rename stays on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    if robustness.lock_files {
        temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: native_path.clone(),
        })?;
    }

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    if robustness.lock_files {
        temp_file.unlock().map_err(|_| Error::LockFailed {
            path: native_path.clone(),
        })?;
    }
    drop(temp_file);

    let policy = backoff::ExponentialBackoff {
        initial_interval: Duration::from_millis(10),
        max_elapsed_time: Some(robustness.max_rename_retry),
        ..Default::default()
    };
    let renamed = backoff::retry(policy, || {
        fs::rename(&temp_path, &native_path).map_err(backoff::Error::transient)
    });

    if let Err(err) = renamed {
        let source = match err {
            backoff::Error::Permanent(e) => e,
            backoff::Error::Transient { err, .. } => err,
        };
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&native_path, source));
    }

    tracing::trace!(path = %path, bytes = content.len(), "Atomic write complete");
    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically with default robustness.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes(), RobustnessConfig::default())
}

/// Remove a file, treating "already gone" as success.
pub fn remove_file(path: &NormalizedPath) -> Result<()> {
    let native_path = path.to_native();
    match fs::remove_file(&native_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(&native_path, e)),
    }
}
