//! Source image handles.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::JobId;

/// An image file submitted for compression.
///
/// The encoded bytes are held in a [`Bytes`] buffer, so cloning a
/// [`SourceRef`] never copies image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// Identifier of the file entry, reused as the job id.
    pub id: JobId,
    /// Display name, usually the file name.
    pub name: String,
    /// MIME type reported for the file, if known.
    pub mime_type: Option<String>,
    /// Encoded file contents.
    pub bytes: Bytes,
}

/// Shared reference to a source image.
pub type SourceRef = Arc<SourceImage>;

impl SourceImage {
    /// Create a source with a fresh id, guessing the MIME type from the name.
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime_type = mime_from_path(Path::new(&name)).map(str::to_string);
        Self {
            id: JobId::new(),
            name,
            mime_type,
            bytes: bytes.into(),
        }
    }

    /// Set the id for this source.
    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the MIME type for this source.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Size of the encoded file in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the reported MIME type is an image type.
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"))
    }

    pub fn into_ref(self) -> SourceRef {
        Arc::new(self)
    }
}

/// Guess an image MIME type from a file extension.
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(mime)
}
