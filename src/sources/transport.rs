//! Download transport.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Errors raised while fetching the catalog or an artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("invalid artifact URL `{url}`")]
    InvalidUrl { url: String },

    #[error("invalid artifact store key `{0}`")]
    InvalidKey(String),

    #[error("`{name}` v{version} is not in the artifact store and offline mode is enabled")]
    Offline { name: String, version: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Upper bound on the buffer reserved from an announced `Content-Length`.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// An open download.
pub struct Download {
    /// Size announced by the server, when known
    pub content_length: Option<u64>,

    /// Response body
    pub body: Box<dyn Read + Send>,
}

impl Download {
    /// Read the whole body into memory.
    pub fn into_bytes(mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        let reserve = self.content_length.unwrap_or(0).min(MAX_PREALLOC);
        let mut buf = Vec::with_capacity(reserve as usize);
        self.body
            .read_to_end(&mut buf)
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(buf)
    }
}

/// Opens downloads by URL.
pub trait Transport: Send + Sync {
    /// Start a GET request. Non-2xx responses are errors.
    fn get(&self, url: &str) -> Result<Download, FetchError>;
}

/// HTTP(S) transport backed by a blocking reqwest client, with `file://`
/// support for local mirrors.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport with the default client settings.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("virus/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(HttpTransport { client })
    }

    fn get_file(&self, url: &str, parsed: &Url) -> Result<Download, FetchError> {
        let path = parsed
            .to_file_path()
            .map_err(|_| FetchError::InvalidUrl {
                url: url.to_string(),
            })?;
        let file = File::open(&path).map_err(|e| FetchError::io(&path, e))?;
        let content_length = file.metadata().ok().map(|m| m.len());
        Ok(Download {
            content_length,
            body: Box::new(file),
        })
    }

    fn get_http(&self, url: &str) -> Result<Download, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Download {
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Download, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;

        tracing::debug!("GET {}", url);

        match parsed.scheme() {
            "file" => self.get_file(url, &parsed),
            "http" | "https" => self.get_http(url),
            _ => Err(FetchError::InvalidUrl {
                url: url.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bogus_content_length() {
        let download = Download {
            content_length: Some(u64::MAX),
            body: Box::new(std::io::Cursor::new(b"int x;".to_vec())),
        };
        assert_eq!(download.into_bytes("https://example.com/x.vira").unwrap(), b"int x;");
    }

    #[test]
    fn test_http_get_ok() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/lib.vira")
            .with_status(200)
            .with_body("int add(int a, int b);")
            .create();

        let transport = HttpTransport::new().unwrap();
        let url = format!("{}/lib.vira", server.url());
        let body = transport.get(&url).unwrap().into_bytes(&url).unwrap();

        assert_eq!(body, b"int add(int a, int b);");
        mock.assert();
    }

    #[test]
    fn test_http_status_error() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/missing").with_status(404).create();

        let transport = HttpTransport::new().unwrap();
        let url = format!("{}/missing", server.url());
        match transport.get(&url) {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected status error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_file_url() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("virus.json");
        std::fs::write(&path, "{}").unwrap();

        let url = Url::from_file_path(&path).unwrap().to_string();
        let download = HttpTransport::new().unwrap().get(&url).unwrap();
        assert_eq!(download.content_length, Some(2));
    }

    #[test]
    fn test_unsupported_scheme() {
        let transport = HttpTransport::new().unwrap();
        assert!(matches!(
            transport.get("ftp://example.com/lib.vira"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            transport.get("not a url"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }
}
