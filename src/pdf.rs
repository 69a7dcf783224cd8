//! PDF loading and page text extraction.
//!
//! Documents are fetched from an http(s) URL (or read from disk for the CLI)
//! and split into per-page text with lopdf. Page numbers are 1-based.

use crate::error::{Result, SvarError};
use lopdf::Document;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Text of one PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Where a PDF comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfSource {
    Url(Url),
    Path(PathBuf),
}

impl PdfSource {
    /// Parse a remote source. Only http and https are accepted.
    pub fn from_url(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SvarError::InvalidInput("PDF URL is empty".to_string()));
        }

        let url = Url::parse(input)
            .map_err(|e| SvarError::InvalidInput(format!("Invalid PDF URL '{}': {}", input, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(Self::Url(url)),
            other => Err(SvarError::InvalidInput(format!(
                "Unsupported URL scheme '{}', expected http or https",
                other
            ))),
        }
    }

    /// Accept either a URL or an existing local file.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Self::from_url(trimmed);
        }

        let path = PathBuf::from(shellexpand::tilde(trimmed).as_ref());
        if path.is_file() {
            Ok(Self::Path(path))
        } else {
            Self::from_url(trimmed)
        }
    }

    /// Value recorded as `source` on every stored chunk.
    pub fn name(&self) -> String {
        match self {
            Self::Url(url) => url.to_string(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for PdfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Fetch the raw PDF bytes.
#[instrument(skip_all, fields(source = %source))]
pub async fn fetch(source: &PdfSource, timeout: Duration) -> Result<Vec<u8>> {
    match source {
        PdfSource::Url(url) => {
            info!("Downloading PDF");
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| SvarError::Ingestion(format!("Failed to create HTTP client: {}", e)))?;

            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| SvarError::Ingestion(format!("Download failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(SvarError::Ingestion(format!("Download returned {}", status)));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| SvarError::Ingestion(format!("Download failed: {}", e)))?;
            debug!("Downloaded {} bytes", bytes.len());
            Ok(bytes.to_vec())
        }
        PdfSource::Path(path) => Ok(tokio::fs::read(path).await?),
    }
}

/// Extract the text of every page, in page order.
///
/// Pages whose text cannot be decoded are logged and kept as empty so that
/// numbering stays aligned with the document.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>> {
    let document = Document::load_mem(bytes)
        .map_err(|e| SvarError::Ingestion(format!("Could not parse PDF: {}", e)))?;

    let pages: Vec<PageText> = document
        .get_pages()
        .into_keys()
        .map(|number| {
            let text = document.extract_text(&[number]).unwrap_or_else(|e| {
                warn!("Could not extract text from page {}: {}", number, e);
                String::new()
            });
            PageText { number, text }
        })
        .collect();

    if pages.is_empty() {
        return Err(SvarError::Ingestion("PDF has no pages".to_string()));
    }

    Ok(pages)
}

/// Fetch a PDF and extract its pages. Parsing runs off the async runtime.
pub async fn load(source: &PdfSource, timeout: Duration) -> Result<Vec<PageText>> {
    let bytes = fetch(source, timeout).await?;
    tokio::task::spawn_blocking(move || extract_pages(&bytes))
        .await
        .map_err(|e| SvarError::Ingestion(format!("PDF parsing task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_urls_are_accepted() {
        let source = PdfSource::from_url("https://example.com/guide.pdf").unwrap();
        assert_eq!(source.name(), "https://example.com/guide.pdf");

        assert!(matches!(
            PdfSource::from_url(" http://localhost:8080/a.pdf ").unwrap(),
            PdfSource::Url(_)
        ));
    }

    #[test]
    fn test_other_schemes_are_rejected() {
        for input in ["ftp://example.com/a.pdf", "file:///etc/passwd", "not a url", ""] {
            let err = PdfSource::from_url(input).unwrap_err();
            assert!(matches!(err, SvarError::InvalidInput(_)), "{input}: {err}");
        }
    }

    #[test]
    fn test_parse_prefers_existing_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        assert_eq!(PdfSource::parse(path).unwrap(), PdfSource::Path(file.path().to_path_buf()));
        assert!(PdfSource::parse("/definitely/not/here.pdf").is_err());
    }

    #[test]
    fn test_garbage_bytes_are_an_ingestion_error() {
        let err = extract_pages(b"this is not a pdf").unwrap_err();
        assert!(matches!(err, SvarError::Ingestion(_)));
    }

    #[tokio::test]
    async fn test_fetch_reads_local_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"%PDF-1.4").unwrap();

        let bytes = fetch(&PdfSource::Path(file.path().to_path_buf()), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.4");
    }
}
