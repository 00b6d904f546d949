//! File intake and validation.
//!
//! The browser widget trusted the declared media type; a desktop app has no
//! declared type, so the check sniffs the file's magic bytes instead. Both
//! checks are advisory only; the server re-validates.

use std::fs;
use std::path::Path;

use log::warn;

/// Client-side upload limit: 50MB.
pub const MAX_UPLOAD_BYTES: u64 = 52_428_800;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("file is too large ({size} bytes; the limit is {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },
    #[error("please select an image (this looks like {detected})")]
    NotAnImage { detected: String },
    #[error("could not read file: {0}")]
    Unreadable(#[from] std::io::Error),
}

/// The current selection: immutable once accepted, replaced wholesale on
/// every new selection or reset.
#[derive(Clone, Debug)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Validates candidate bytes from the picker or a drop event.
///
/// Rejects oversize files and anything whose sniffed media type does not
/// start with `image/`. Rejection has no further side effects.
pub fn validate(name: &str, bytes: Vec<u8>, limit: u64) -> Result<SelectedFile, IntakeError> {
    let size = bytes.len() as u64;
    if size > limit {
        warn!("rejected {name}: {size} bytes exceeds the {limit} byte limit");
        return Err(IntakeError::TooLarge { size, limit });
    }

    let mime = match infer::get(&bytes) {
        Some(kind) if kind.mime_type().starts_with("image/") => kind.mime_type().to_owned(),
        Some(kind) => {
            warn!("rejected {name}: detected {}", kind.mime_type());
            return Err(IntakeError::NotAnImage {
                detected: kind.mime_type().to_owned(),
            });
        }
        None => {
            warn!("rejected {name}: media type could not be detected");
            return Err(IntakeError::NotAnImage {
                detected: "unrecognized data".to_owned(),
            });
        }
    };

    Ok(SelectedFile {
        name: name.to_owned(),
        mime,
        bytes,
    })
}

/// Reads and validates a file picked from disk.
///
/// The size is checked against the metadata before reading so an oversize
/// file is never pulled into memory.
pub fn read_path(path: &Path, limit: u64) -> Result<SelectedFile, IntakeError> {
    let size = fs::metadata(path)?.len();
    if size > limit {
        warn!(
            "rejected {}: {size} bytes exceeds the {limit} byte limit",
            path.display()
        );
        return Err(IntakeError::TooLarge { size, limit });
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_owned());
    validate(&name, fs::read(path)?, limit)
}
