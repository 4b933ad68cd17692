//! Loading Markdown documents from disk
//!
//! Documents must be UTF-8 (a leading BOM is dropped) and no larger than
//! [`MAX_FILE_SIZE`].

use crate::error::{FileError, FileResult};
use std::path::Path;

/// Maximum file size allowed (10 MB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decode raw bytes as document text
fn decode(path: &Path, bytes: Vec<u8>) -> FileResult<String> {
    let bytes = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_vec(),
        None => bytes,
    };
    String::from_utf8(bytes).map_err(|_| FileError::EncodingError {
        path: path.to_path_buf(),
    })
}

/// Read a document, checking size and encoding
pub async fn read_document(path: impl AsRef<Path>) -> FileResult<String> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FileError::NotFound(path.to_path_buf()));
    }

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| FileError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

    let size = metadata.len();
    if size > MAX_FILE_SIZE {
        return Err(FileError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max_size: MAX_FILE_SIZE,
        });
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| FileError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

    log::debug!("Read {} ({} bytes)", path.display(), size);
    decode(path, bytes)
}
