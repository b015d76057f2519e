//! Source loading: turn a user-supplied path or URL into raw bytes.
//!
//! An existing local file always wins, so a file literally named like a URL
//! is still read from disk. URLs are fetched once, in memory; no temp file is
//! needed because both the image decoder and pdfium accept byte slices.

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::pipeline::normalize::DocumentFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentReference {
    LocalPath(PathBuf),
    RemoteUrl(String),
}

/// Bytes of a loaded document plus the format sniffed from its header.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        let format = DocumentFormat::detect(&bytes);
        Self { bytes, format }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

impl DocumentReference {
    /// Classify a source string: existing file first, then HTTP(S) URL.
    pub fn resolve(source: &str) -> Result<Self, ExtractionError> {
        let path = Path::new(source);
        if !source.is_empty() && path.is_file() {
            return Ok(Self::LocalPath(path.to_path_buf()));
        }
        if is_url(source) {
            return Ok(Self::RemoteUrl(source.to_string()));
        }
        Err(ExtractionError::UnsupportedSource {
            input: source.to_string(),
        })
    }

    /// Read or download the referenced document.
    pub async fn load(&self, config: &ExtractionConfig) -> Result<RawDocument, ExtractionError> {
        let bytes = match self {
            Self::LocalPath(path) => read_local(path).await?,
            Self::RemoteUrl(url) => download_url(url, config).await?,
        };
        if bytes.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        Ok(RawDocument::new(bytes))
    }
}

/// Resolve and load a source string in one step.
pub async fn load_document(
    source: &str,
    config: &ExtractionConfig,
) -> Result<RawDocument, ExtractionError> {
    DocumentReference::resolve(source)?.load(config).await
}

async fn read_local(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ExtractionError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

static RE_DRIVE_FILE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").unwrap());

/// Rewrite a Google Drive share link (`.../file/d/<id>/view`) to its
/// direct-download form. Other URLs are returned unchanged.
pub fn direct_download_url(url: &str) -> String {
    if !url.contains("drive.google.com") {
        return url.to_string();
    }
    match RE_DRIVE_FILE_ID.captures(url) {
        Some(caps) => format!("https://drive.google.com/uc?export=download&id={}", &caps[1]),
        None => url.to_string(),
    }
}

/// Download a URL into memory. Single attempt, no retries.
async fn download_url(url: &str, config: &ExtractionConfig) -> Result<Vec<u8>, ExtractionError> {
    let target = direct_download_url(url);
    if target != url {
        debug!("Rewrote share link to direct download: {}", target);
    }
    info!("Downloading document from: {}", target);

    let secs = config.download_timeout_secs;
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(secs))
        .build()
        .map_err(|e| ExtractionError::DownloadFailed {
            url: target.clone(),
            reason: e.to_string(),
        })?;

    let network_error = |e: reqwest::Error| {
        if e.is_timeout() {
            ExtractionError::DownloadTimeout {
                url: target.clone(),
                secs,
            }
        } else {
            ExtractionError::DownloadFailed {
                url: target.clone(),
                reason: e.to_string(),
            }
        }
    };

    let response = client
        .get(&target)
        .header(ACCEPT, "*/*")
        .send()
        .await
        .map_err(network_error)?;

    let status = response.status();
    if status != StatusCode::OK {
        warn!("Download failed: HTTP {}", status);
        return Err(ExtractionError::HttpStatus {
            url: target.clone(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(network_error)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/pan.jpg"));
        assert!(is_url("http://example.com/pan.jpg"));
        assert!(!is_url("/tmp/pan.jpg"));
        assert!(!is_url("ftp://example.com/pan.jpg"));
        assert!(!is_url(""));
    }

    #[test]
    fn drive_share_link_is_rewritten() {
        let url = "https://drive.google.com/file/d/1AbC-d_E9/view?usp=sharing";
        assert_eq!(
            direct_download_url(url),
            "https://drive.google.com/uc?export=download&id=1AbC-d_E9"
        );
    }

    #[test]
    fn other_links_are_untouched() {
        let url = "https://files.example.com/d/abc123/scan.png";
        assert_eq!(direct_download_url(url), url);
        let drive_folder = "https://drive.google.com/drive/folders";
        assert_eq!(direct_download_url(drive_folder), drive_folder);
    }

    #[test]
    fn resolve_prefers_existing_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"data").unwrap();
        let path = f.path().to_str().unwrap().to_string();
        assert_eq!(
            DocumentReference::resolve(&path).unwrap(),
            DocumentReference::LocalPath(PathBuf::from(&path))
        );
    }

    #[test]
    fn resolve_rejects_missing_file_and_non_url() {
        let err = DocumentReference::resolve("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedSource { .. }));
        assert!(DocumentReference::resolve("").is_err());
    }

    #[tokio::test]
    async fn load_local_file_sniffs_format() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n...").unwrap();
        let doc = load_document(f.path().to_str().unwrap(), &ExtractionConfig::default())
            .await
            .unwrap();
        assert_eq!(doc.format, DocumentFormat::Pdf);
        assert_eq!(doc.bytes.len(), 12);
    }

    #[tokio::test]
    async fn empty_local_file_is_a_load_failure() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let err = load_document(f.path().to_str().unwrap(), &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyDocument));
    }

    #[tokio::test]
    async fn unreachable_url_is_a_download_failure() {
        let config = ExtractionConfig::builder()
            .download_timeout_secs(5)
            .build()
            .unwrap();
        let err = load_document("http://127.0.0.1:9/pan.png", &config)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ExtractionError::DownloadFailed { .. } | ExtractionError::DownloadTimeout { .. }
            ),
            "got: {err:?}"
        );
    }

    // ── Local HTTP fixture ──────────────────────────────────────────────

    /// Serve `/doc` (200), `/moved` (302 to `/doc`) and anything else as 404.
    /// Returns the base URL and the request heads seen so far.
    async fn serve() -> (String, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = seen.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).into_owned();
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                log.lock().unwrap().push(head);

                let response = match path.as_str() {
                    "/doc" => "HTTP/1.1 200 OK\r\nContent-Length: 9\r\nConnection: close\r\n\r\n%PDF-1.4\n".to_string(),
                    "/moved" => "HTTP/1.1 302 Found\r\nLocation: /doc\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                    _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base, seen)
    }

    #[tokio::test]
    async fn non_200_status_is_a_load_failure() {
        let (base, _) = serve().await;
        let err = load_document(&format!("{base}/missing.png"), &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ExtractionError::HttpStatus { status: 404, .. }),
            "got: {err:?}"
        );
        assert_eq!(err.kind(), crate::error::FailureKind::Load);
    }

    #[tokio::test]
    async fn redirects_are_followed() {
        let (base, seen) = serve().await;
        let raw = load_document(&format!("{base}/moved"), &ExtractionConfig::default())
            .await
            .unwrap();
        assert_eq!(raw.bytes, b"%PDF-1.4\n");
        assert_eq!(raw.format, DocumentFormat::Pdf);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn download_sends_browser_headers() {
        let (base, seen) = serve().await;
        load_document(&format!("{base}/doc"), &ExtractionConfig::default())
            .await
            .unwrap();
        let head = seen.lock().unwrap()[0].to_lowercase();
        assert!(
            head.contains(&format!("user-agent: {}", crate::config::DEFAULT_USER_AGENT.to_lowercase())),
            "got: {head}"
        );
        assert!(head.contains("accept: */*"), "got: {head}");
    }
}
