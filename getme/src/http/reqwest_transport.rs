//! Blocking reqwest implementation of [`HttpTransport`].

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use tracing::debug;

use super::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError, TransportResult};

/// Default timeout for HTTP requests in seconds.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

const USER_AGENT: &str = concat!("getme/", env!("CARGO_PKG_VERSION"));

/// HTTP transport backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> TransportResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build(&self, request: &HttpRequest) -> RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url).form(&request.form),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        builder
    }

    fn execute(&self, request: &HttpRequest) -> TransportResult<reqwest::blocking::Response> {
        debug!(url = %request.url, method = ?request.method, "Sending request");
        self.build(request).send().map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: request.url.clone(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                TransportError::Request {
                    url: request.url.clone(),
                    reason: e.to_string(),
                }
            }
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        let response = self.execute(request)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| TransportError::Request {
                url: request.url.clone(),
                reason: format!("failed to read response: {}", e),
            })?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn download(&self, request: &HttpRequest, dest: &Path) -> TransportResult<u64> {
        let mut response = self.execute(request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let file = File::create(dest).map_err(|e| TransportError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

        // Stream to file
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = 0u64;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| TransportError::Request {
                    url: request.url.clone(),
                    reason: format!("read error: {}", e),
                })?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| TransportError::Write {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            downloaded += bytes_read as u64;
        }

        writer.flush().map_err(|e| TransportError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_default_timeout() {
        let transport = ReqwestTransport::new().unwrap();
        assert_eq!(transport.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_transport_with_timeout() {
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(transport.timeout().as_secs(), 60);
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("getme/"));
    }
}
