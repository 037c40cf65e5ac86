//! Fetching raw document content.
//!
//! The tracker only depends on the [`Fetcher`] trait. [`HttpFetcher`] is the
//! production implementation: `http(s)://` URLs go through `reqwest` with the
//! configured timeout and size cap, `file://` URLs are read from disk.
//! Any failure is final for the current cycle; there is no retry loop.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

use crate::config::FetchConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} exceeds the {limit} byte size limit")]
    TooLarge { url: String, limit: u64 },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Source of raw bytes for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// `reqwest`-backed fetcher that also understands `file://` URLs.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Http {
                url: String::new(),
                source: e,
            })?;
        Ok(Self {
            client,
            timeout,
            max_bytes: config.max_bytes,
        })
    }

    async fn fetch_http(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let url_str = url.to_string();
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url_str.clone(),
                    timeout: self.timeout,
                }
            } else {
                FetchError::Http {
                    url: url_str.clone(),
                    source: e,
                }
            }
        };

        let mut response = self.client.get(url).send().await.map_err(map_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url_str.clone(),
                status: status.as_u16(),
            });
        }
        if response.content_length().unwrap_or(0) > self.max_bytes {
            return Err(FetchError::TooLarge {
                url: url_str.clone(),
                limit: self.max_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_err)? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(FetchError::TooLarge {
                    url: url_str.clone(),
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    async fn fetch_file(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let path = url.to_file_path().map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "not a local file path".to_string(),
        })?;
        let display = path.display().to_string();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| FetchError::Io {
                path: display.clone(),
                source: e,
            })?;
        if metadata.len() > self.max_bytes {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }
        tokio::fs::read(&path).await.map_err(|e| FetchError::Io {
            path: display,
            source: e,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => self.fetch_http(parsed).await,
            "file" => self.fetch_file(parsed).await,
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fetcher(max_bytes: u64) -> HttpFetcher {
        HttpFetcher::new(&FetchConfig {
            max_bytes,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    fn file_url(path: &std::path::Path) -> String {
        Url::from_file_path(path).unwrap().to_string()
    }

    #[tokio::test]
    async fn reads_file_urls() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.txt");
        std::fs::write(&path, b"hello file").unwrap();

        let bytes = fetcher(1024).fetch(&file_url(&path)).await.unwrap();
        assert_eq!(bytes, b"hello file");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = fetcher(1024)
            .fetch(&file_url(&tmp.path().join("absent.txt")))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.txt");
        std::fs::write(&path, vec![b'a'; 64]).unwrap();

        let err = fetcher(16).fetch(&file_url(&path)).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16, .. }));
    }

    #[tokio::test]
    async fn rejects_unknown_schemes_and_garbage() {
        let f = fetcher(1024);
        assert!(matches!(
            f.fetch("ftp://example.com/doc").await.unwrap_err(),
            FetchError::UnsupportedScheme(_)
        ));
        assert!(matches!(
            f.fetch("not a url").await.unwrap_err(),
            FetchError::InvalidUrl { .. }
        ));
    }
}
