//! Photo attachment handling
//!
//! A will carries at most one photo. It is either absent, already stored
//! remotely (identified by a URL or store path), or a local file that has
//! not been uploaded yet.
//!
//! Local files are compared by their descriptive metadata only. The raw
//! bytes are never compared, so two different files that share name, size,
//! kind and modification time are considered the same attachment.

use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Reference to the photo attached to a will
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attachment {
    /// No photo (or, in a save request, "remove the stored photo")
    #[default]
    None,
    /// Photo already held by the store
    Remote(String),
    /// Local file waiting to be uploaded
    Pending(LocalBlob),
}

impl Attachment {
    /// Check if there is no photo
    pub fn is_none(&self) -> bool {
        matches!(self, Attachment::None)
    }

    /// Get the pending blob, if any
    pub fn as_pending(&self) -> Option<&LocalBlob> {
        match self {
            Attachment::Pending(blob) => Some(blob),
            _ => None,
        }
    }

    /// Get the remote reference, if any
    pub fn as_remote(&self) -> Option<&str> {
        match self {
            Attachment::Remote(url) => Some(url),
            _ => None,
        }
    }
}

/// A local file selected by the user but not yet persisted
///
/// Serializes to its metadata only; `data` is skipped so that the
/// serialized form is also the comparison form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalBlob {
    /// File name, including extension
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type, e.g. `image/png`
    #[serde(rename = "type")]
    pub kind: String,
    /// Modification time in milliseconds since the Unix epoch
    pub last_modified: i64,
    /// File contents
    #[serde(skip)]
    pub data: Bytes,
}

impl LocalBlob {
    /// Create a blob from in-memory contents
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        last_modified: i64,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            kind: kind.into(),
            last_modified,
            data,
        }
    }

    /// Read a blob from disk, guessing its MIME type from the extension
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let data = fs::read(path)?;
        let last_modified = fs::metadata(path)?
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(name, mime_from_name(&path.to_string_lossy()), last_modified, data))
    }

    /// File extension (lowercase, without the dot)
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

impl PartialEq for LocalBlob {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.size == other.size
            && self.kind == other.kind
            && self.last_modified == other.last_modified
    }
}

/// Guess a MIME type from a file name
fn mime_from_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
