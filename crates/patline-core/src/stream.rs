//! HTTP fetch plumbing for catalog listings and archive downloads.
//!
//! Uses async reqwest internally with tokio::time::timeout for stall
//! detection, but presents a sync interface; the pipeline itself stays on
//! a single control thread.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use indicatif::ProgressBar;

/// Read timeout for stall detection (30 seconds with no data = stall)
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error types for stream operations
#[derive(Debug)]
pub enum StreamError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl StreamError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => match status {
                // 408/429 are transient; other 4xx mean the URL itself is bad
                Some(s) if (400..500).contains(s) => matches!(s, 408 | 429),
                _ => true,
            },
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(4)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// HTTP GET → response body as text (for HTML directory listings)
pub fn fetch_text(url: &str) -> Result<String, StreamError> {
    SHARED_RUNTIME.handle().block_on(async {
        let response = SHARED_CLIENT
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StreamError::from_reqwest(&e))?;

        match tokio::time::timeout(READ_TIMEOUT, response.text()).await {
            Ok(result) => result.map_err(|e| StreamError::from_reqwest(&e)),
            Err(_) => Err(StreamError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "listing read timed out",
            ))),
        }
    })
}

/// HTTP GET → local file, chunk by chunk, with byte progress.
///
/// The caller owns `dest` naming and cleanup; this only streams bytes into
/// it. Returns the number of bytes written.
pub fn download_to_file(url: &str, dest: &Path, pb: &ProgressBar) -> Result<u64, StreamError> {
    SHARED_RUNTIME.handle().block_on(async {
        let mut response = SHARED_CLIENT
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StreamError::from_reqwest(&e))?;

        if let Some(total) = response.content_length() {
            crate::progress::upgrade_to_bar(pb, total);
        }

        let mut file = File::create(dest).map_err(StreamError::Io)?;
        let mut written = 0u64;

        loop {
            let chunk = match tokio::time::timeout(READ_TIMEOUT, response.chunk()).await {
                Ok(Ok(Some(chunk))) => chunk,
                Ok(Ok(None)) => break,
                Ok(Err(e)) => return Err(StreamError::from_reqwest(&e)),
                Err(_) => {
                    return Err(StreamError::Io(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "read timeout (30s with no data)",
                    )));
                }
            };
            file.write_all(&chunk).map_err(StreamError::Io)?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }

        file.flush().map_err(StreamError::Io)?;
        Ok(written)
    })
}
