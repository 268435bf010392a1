//! Atomic write primitives
//!
//! Content goes to a hidden temp file next to the target, is flushed and
//! synced, then renamed over the target. Readers see either the old file or
//! the complete new one, never a prefix.

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use medallion_core::errors::{ExError, ExErrorKind};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    atomic_write_with(target_path, |w| {
        w.write_all(content).map_err(|e| io_error("write_temp", e))
    })
}

/// Atomically write a file whose content is produced by `fill`
///
/// If `fill` fails, the temp file is removed and the target is untouched.
pub fn atomic_write_with<F>(target_path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let parent = target_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| io_error("create_parent_dir", e))?;

    let temp_path = temp_path_for(target_path)?;
    let result = write_then_rename(&temp_path, target_path, fill);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
        return result;
    }

    sync_dir(parent);
    Ok(())
}

fn write_then_rename<F>(temp_path: &Path, target_path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = File::create(temp_path).map_err(|e| io_error("create_temp", e))?;
    let mut writer = BufWriter::new(file);
    fill(&mut writer)?;
    writer.flush().map_err(|e| io_error("flush_temp", e))?;
    let file = writer
        .into_inner()
        .map_err(|e| io_error("flush_temp", e.into_error()))?;
    file.sync_all().map_err(|e| io_error("sync_temp", e))?;
    drop(file);

    fs::rename(temp_path, target_path).map_err(|e| io_error("rename_temp", e))
}

/// `<dir>/.<name>.tmp` next to the target
fn temp_path_for(target_path: &Path) -> Result<PathBuf> {
    let name = target_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("atomic_write")
                .with_item(target_path.display().to_string())
                .with_message("Target path has no file name")
        })?;
    Ok(target_path.with_file_name(format!(".{}.tmp", name)))
}

/// Best-effort directory sync so the rename itself is durable
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}
