use crate::hash::{digest_bytes, digest_existing_file};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Read a file to string, replacing invalid UTF-8 sequences with U+FFFD.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write bytes through a sibling temp file and a rename, so readers see either
/// the old contents or the new contents.
///
/// Parent directories are created as needed.
///
/// # Errors
/// Returns an error if the directory, the temp file or the rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("out"),
        std::process::id()
    ));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        // rename over an existing file can fail on Windows
        Err(_) if cfg!(windows) => {
            fs::copy(&temp_path, path)?;
            let _ = fs::remove_file(&temp_path);
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

/// Atomically write `bytes` unless the file already holds exactly these bytes.
///
/// Returns `true` when the file was (re)written.
///
/// # Errors
/// Returns an error if the existing file cannot be read or the write fails.
pub fn write_if_changed(path: &Path, bytes: &[u8]) -> io::Result<bool> {
    if digest_existing_file(path)?.as_deref() == Some(digest_bytes(bytes).as_str()) {
        return Ok(false);
    }
    atomic_write(path, bytes)?;
    Ok(true)
}

/// Remove a file, treating "already gone" as success.
///
/// Returns `true` if a file was removed.
///
/// # Errors
/// Returns an error for any failure other than `NotFound`.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
