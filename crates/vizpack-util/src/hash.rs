use std::fs;
use std::io;
use std::path::Path;

/// BLAKE3 digest of a byte slice, hex-encoded.
#[must_use]
pub fn digest_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// BLAKE3 digest of a file's contents, or `None` if the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn digest_existing_file(path: &Path) -> io::Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(digest_bytes(&bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
