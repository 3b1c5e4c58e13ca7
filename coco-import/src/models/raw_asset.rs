//! In-memory file blobs selected by the user
//!
//! The pipeline only ever references assets by name; bytes are shared
//! (`Arc`) so cloning an asset into a request is cheap.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::{Error, Result};

/// MIME types the pipeline recognizes
pub mod mime {
    pub const CSV: &str = "text/csv";
    pub const XLS: &str = "application/vnd.ms-excel";
    pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
    pub const JPEG: &str = "image/jpeg";
    pub const PNG: &str = "image/png";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Opaque binary blob with its original filename and declared MIME type
#[derive(Clone)]
pub struct RawAsset {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl RawAsset {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring its MIME type from the extension
    /// (sniffing the content when the extension is not recognized)
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidInput(format!("Invalid file name: {}", path.display())))?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        let mime_type = declared_mime_type(&name, &bytes);

        tracing::debug!(
            file = %name,
            mime_type = %mime_type,
            size = bytes.len(),
            "Loaded asset from disk"
        );

        Ok(Self::new(name, mime_type, bytes))
    }

    /// Original filename
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for RawAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAsset")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// MIME type a browser would declare for this file
///
/// Extension first; unknown extensions fall back to magic-byte sniffing.
pub fn declared_mime_type(file_name: &str, head: &[u8]) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let by_extension = match ext.as_str() {
        "csv" => Some(mime::CSV),
        "xls" => Some(mime::XLS),
        "xlsx" => Some(mime::XLSX),
        "jpg" | "jpeg" => Some(mime::JPEG),
        "png" => Some(mime::PNG),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        "json" => Some("application/json"),
        "txt" => Some("text/plain"),
        _ => None,
    };

    if let Some(mime_type) = by_extension {
        return mime_type.to_string();
    }

    infer::get(head)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| mime::OCTET_STREAM.to_string())
}
