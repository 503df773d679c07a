//! Log file placement, rotation and level names.
//!
//! The subscriber itself is installed by the `vartree` binary; this
//! module only prepares the file it writes to.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::LogLevel;

/// Size at which the active log file is rotated (10 MiB).
pub const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated generations kept next to the active file.
pub const DEFAULT_MAX_LOG_FILES: u32 = 5;

const LOG_FILE_NAME: &str = "vartree.log";

/// Where the log goes when `log.file` is not set.
///
/// `$XDG_STATE_HOME/vartree/vartree.log`, else
/// `$HOME/.local/state/vartree/vartree.log`, else the system temp dir.
pub fn default_log_file_path() -> PathBuf {
    let state_dir = std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("state"))
        })
        .unwrap_or_else(std::env::temp_dir);
    state_dir.join("vartree").join(LOG_FILE_NAME)
}

/// Create the directory that will hold `log_path`.
pub fn ensure_log_dir(log_path: &Path) -> io::Result<()> {
    match log_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Shift `log_path` to `log_path.1` once it reaches `max_size` bytes.
///
/// Older generations move up by one; whatever would become
/// `log_path.{max_files + 1}` is deleted. A missing or small file is
/// left alone.
pub fn rotate_log_files(log_path: &Path, max_size: u64, max_files: u32) -> io::Result<()> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if size < max_size || max_files == 0 {
        return Ok(());
    }

    let oldest = rotated_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for generation in (1..max_files).rev() {
        let from = rotated_path(log_path, generation);
        if from.exists() {
            fs::rename(&from, rotated_path(log_path, generation + 1))?;
        }
    }
    fs::rename(log_path, rotated_path(log_path, 1))?;
    tracing::debug!(path = %log_path.display(), size, "log rotated");
    Ok(())
}

/// Filter directive for a level name such as `VARTREE_LOG=debug`.
///
/// Case-insensitive; `warning` is accepted for `warn`. Unknown names
/// fall back to `info`.
pub fn log_level_to_filter(level: &str) -> &'static str {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => LogLevel::Trace,
        "debug" => LogLevel::Debug,
        "warn" | "warning" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    };
    level.as_filter()
}

fn rotated_path(base: &Path, generation: u32) -> PathBuf {
    let mut name = base.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{generation}"));
    base.with_file_name(name)
}
