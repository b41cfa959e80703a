//! Text extraction for uploaded contracts.
//!
//! A [`Document`] is dispatched on its [`DocumentKind`] (decided from the MIME
//! type when one is given, else from the file extension) and turned into a
//! trimmed plain string. Anything that is not PDF, OOXML Word or plain text is
//! rejected before extraction is attempted.

mod docx;
mod pdf;
mod plain;

use std::path::Path;

use clausewatch_utils::error::ExtractionError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    /// Decide the format from a MIME type.
    ///
    /// Parameters such as `; charset=utf-8` are ignored. Generic binary types
    /// return `Ok(None)` so the caller can fall back to the extension.
    pub fn from_mime(mime: &str) -> Result<Option<Self>, ExtractionError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "" | "application/octet-stream" => Ok(None),
            MIME_PDF => Ok(Some(Self::Pdf)),
            MIME_DOCX => Ok(Some(Self::Docx)),
            MIME_TEXT => Ok(Some(Self::PlainText)),
            _ => Err(ExtractionError::UnsupportedType(essence)),
        }
    }

    /// Decide the format from a file name's extension.
    pub fn from_file_name(name: &str) -> Result<Self, ExtractionError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pdf") => Ok(Self::Pdf),
            Some("docx") => Ok(Self::Docx),
            Some("txt" | "text") => Ok(Self::PlainText),
            Some(other) => Err(ExtractionError::UnsupportedType(format!(".{other}"))),
            None => Err(ExtractionError::UnsupportedType(name.to_string())),
        }
    }

    /// MIME type wins when it is specific; otherwise the extension decides.
    pub fn detect(mime: Option<&str>, file_name: Option<&str>) -> Result<Self, ExtractionError> {
        if let Some(mime) = mime
            && let Some(kind) = Self::from_mime(mime)?
        {
            return Ok(kind);
        }
        match file_name {
            Some(name) => Self::from_file_name(name),
            None => Err(ExtractionError::UnsupportedType(
                mime.unwrap_or("unknown").to_string(),
            )),
        }
    }
}

/// An uploaded document.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Document {
    /// Read a document from disk; the format comes from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path)?;
        Ok(Self {
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            mime_type: None,
            bytes,
        })
    }

    pub fn kind(&self) -> Result<DocumentKind, ExtractionError> {
        DocumentKind::detect(self.mime_type.as_deref(), self.file_name.as_deref())
    }

    /// Extract the document's text.
    pub fn extract_text(&self) -> Result<String, ExtractionError> {
        extract_text(&self.bytes, self.kind()?)
    }
}

/// Extract trimmed plain text from `bytes` of the given kind.
///
/// # Errors
///
/// Returns [`ExtractionError::Empty`] when the document holds no text, or a
/// format error when it cannot be decoded.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
    let raw = match kind {
        DocumentKind::Pdf => pdf::extract(bytes)?,
        DocumentKind::Docx => docx::extract(bytes)?,
        DocumentKind::PlainText => plain::decode(bytes),
    };

    let text = raw.trim();
    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }
    tracing::debug!(?kind, chars = text.chars().count(), "extracted document text");
    Ok(text.to_string())
}
