//! File attachments submitted alongside (or instead of) pasted text.

use base64::Engine;
use std::path::Path;

/// The only MIME type accepted for attachments.
pub const PDF_MIME_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF";

/// An in-memory file chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, detecting its MIME type.
    ///
    /// Suspends until the whole file is in memory. Type checks are left to the
    /// caller so that a rejected file can still be reported by name.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = detect_mime_type(&file_name, &bytes).to_string();
        tracing::debug!(
            file = file_name.as_str(),
            mime = mime_type.as_str(),
            size = bytes.len(),
            "Loaded attachment"
        );
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME_TYPE
    }

    /// Standard padded base64 of the file contents, as sent inline.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Guess a MIME type from the file contents first, then the extension.
pub fn detect_mime_type(file_name: &str, bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PDF_MAGIC) {
        return PDF_MIME_TYPE;
    }
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MIME_TYPE,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_pdf_by_magic_bytes() {
        assert_eq!(detect_mime_type("paper.bin", b"%PDF-1.7\n..."), PDF_MIME_TYPE);
    }

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect_mime_type("Paper.PDF", b""), PDF_MIME_TYPE);
        assert_eq!(detect_mime_type("figure.png", b"\x89PNG"), "image/png");
        assert_eq!(detect_mime_type("notes", b"hello"), "application/octet-stream");
    }

    #[test]
    fn test_base64_encoding() {
        let a = Attachment::new("a.pdf", PDF_MIME_TYPE, b"%PDF".to_vec());
        assert_eq!(a.to_base64(), "JVBERg==");
        assert!(a.is_pdf());
    }

    #[tokio::test]
    async fn test_from_path_reads_and_detects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("article.pdf");
        std::fs::write(&path, b"%PDF-1.4 fake").unwrap();

        let a = Attachment::from_path(&path).await.unwrap();
        assert_eq!(a.file_name, "article.pdf");
        assert_eq!(a.mime_type, PDF_MIME_TYPE);
        assert_eq!(a.bytes, b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn test_from_path_png_is_not_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figure.png");
        std::fs::write(&path, b"\x89PNG\r\n").unwrap();

        let a = Attachment::from_path(&path).await.unwrap();
        assert_eq!(a.mime_type, "image/png");
        assert!(!a.is_pdf());
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let err = Attachment::from_path(Path::new("/nonexistent/article.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
