//! WebDAV upload over HTTP PUT with Basic authentication
//!
//! A successful upload is answered with `201 Created`. Anything else is a
//! `TransportError`; the local container is never touched, so a failed
//! upload can simply be repeated. Connection errors, timeouts and 5xx
//! answers are retried a bounded number of times.

use crate::error::{TransportError, TransportResult};
use reqwest::blocking::{Body, Client};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Default WebDAV endpoint
pub const DEFAULT_ENDPOINT: &str = "https://webdav.yandex.ru";

/// Pause before the first retry; doubles on every further attempt
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Username and application password, held only in memory
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct UploadReport {
    /// Full URL the container was stored at
    pub url: String,

    /// Bytes sent
    pub bytes: u64,

    /// Attempts made, the successful one included
    pub attempts: u32,

    /// Time taken
    pub duration: Duration,
}

/// Client for a single WebDAV endpoint
pub struct WebDavClient {
    client: Client,
    endpoint: Url,
    retries: u32,
}

impl WebDavClient {
    /// Create a client for `endpoint`, retrying transient failures `retries` times
    pub fn new(endpoint: Url, retries: u32) -> TransportResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint,
            retries,
        })
    }

    /// URL a file named `remote_name` is stored at
    pub fn remote_url(&self, remote_name: &str) -> TransportResult<Url> {
        if remote_name.is_empty() || remote_name.contains('/') {
            return Err(TransportError::InvalidRemoteName {
                name: remote_name.to_string(),
                reason: "must be a single non-empty path segment".into(),
            });
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidRemoteName {
                name: remote_name.to_string(),
                reason: "endpoint cannot carry a path".into(),
            })?
            .pop_if_empty()
            .push(remote_name);
        Ok(url)
    }

    /// PUT `local` to the endpoint under `remote_name`
    pub fn upload(
        &self,
        local: &Path,
        remote_name: &str,
        credentials: &Credentials,
    ) -> TransportResult<UploadReport> {
        let start = Instant::now();
        let url = self.remote_url(remote_name)?;
        info!(url = %url, "Connecting to WebDAV storage");

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.put_once(local, &url, credentials) {
                Ok(bytes) => {
                    info!(url = %url, bytes, attempts = attempt, "Archive uploaded successfully");
                    return Ok(UploadReport {
                        url: url.to_string(),
                        bytes,
                        attempts: attempt,
                        duration: start.elapsed(),
                    });
                }
                Err(e) if e.is_transient() && attempt <= self.retries => {
                    let backoff = RETRY_BACKOFF.saturating_mul(2u32.saturating_pow(attempt - 1));
                    warn!(attempt, error = %e, backoff_ms = backoff.as_millis() as u64, "Upload failed, retrying");
                    thread::sleep(backoff);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Upload failed");
                    return Err(e);
                }
            }
        }
    }

    fn put_once(&self, local: &Path, url: &Url, credentials: &Credentials) -> TransportResult<u64> {
        let file = File::open(local)?;
        let bytes = file.metadata()?.len();

        let response = self
            .client
            .put(url.clone())
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header(ACCEPT, "*/*")
            .header(CONTENT_TYPE, "application/binary")
            .body(Body::sized(file, bytes))
            .send()?;

        match response.status() {
            StatusCode::CREATED => Ok(bytes),
            status => Err(TransportError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> WebDavClient {
        WebDavClient::new(Url::parse(endpoint).unwrap(), 0).unwrap()
    }

    #[test]
    fn test_remote_url() {
        let c = client("https://webdav.yandex.ru");
        assert_eq!(
            c.remote_url("backup_2024-01-01.kek_zip").unwrap().as_str(),
            "https://webdav.yandex.ru/backup_2024-01-01.kek_zip"
        );

        let c = client("https://dav.example.com/backups/");
        assert_eq!(
            c.remote_url("b.kek_zip").unwrap().as_str(),
            "https://dav.example.com/backups/b.kek_zip"
        );
    }

    #[test]
    fn test_remote_url_rejects_paths() {
        let c = client("https://dav.example.com");
        assert!(c.remote_url("").is_err());
        assert!(c.remote_url("a/b").is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("user@yandex.ru", "s3cret");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("user@yandex.ru"));
        assert!(!shown.contains("s3cret"));
    }
}
