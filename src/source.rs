//! Remote image generation source.
//!
//! Turns a generation request into a GET against the configured endpoint
//! and yields raw image bytes, with bounded retry and exponential backoff.
//!
//! Uses a shared HTTP client to avoid connection pool leaks and reduce
//! memory overhead from creating new clients for each fetch.

use crate::prompts::GenerationRequest;
use bytes::Bytes;
use once_cell::sync::Lazy;
use std::time::Duration;
use thiserror::Error;

/// Shared HTTP client for all fetches
///
/// Configured with conservative defaults for a small board:
/// - 30 second timeout, so a dead link can never hang the slideshow loop
/// - Single idle connection per host (minimize memory)
/// - 30 second idle timeout (release connections promptly)
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(1)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create HTTP client")
});

/// Fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {status}")]
    Status { status: u16 },

    #[error("Fetch timed out")]
    Timeout,

    #[error("Endpoint returned an empty body")]
    EmptyBody,
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts per cycle
    pub max_attempts: u32,
    /// Base delay between attempts (doubled each attempt)
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Seam between the slideshow controller and the network.
///
/// The controller is generic over this so tests can script fetch outcomes.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    async fn fetch(&self, request: &GenerationRequest) -> Result<Bytes, FetchError>;
}

/// HTTP image source against a prompt-in-path generation endpoint
pub struct ImageSource {
    endpoint: String,
    retry: RetryPolicy,
}

impl ImageSource {
    pub fn new(endpoint: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            endpoint: endpoint.into(),
            retry,
        }
    }

    /// `GET <endpoint>/<url-encoded prompt + nonce>`
    pub fn request_url(&self, request: &GenerationRequest) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            encode_path_segment(&request.seeded_prompt())
        )
    }
}

/// Percent-encode a prompt for use as a URL path segment
fn encode_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => out.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    out
}

impl ImageFetcher for ImageSource {
    async fn fetch(&self, request: &GenerationRequest) -> Result<Bytes, FetchError> {
        let url = self.request_url(request);
        tracing::info!("Fetching image for prompt: '{}'", request.seeded_prompt());

        let mut last_error = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(
                    "Retry attempt {}/{}, waiting {:?}",
                    attempt + 1,
                    self.retry.max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            match HTTP_CLIENT.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        match response.bytes().await {
                            Ok(bytes) if !bytes.is_empty() => {
                                tracing::debug!("Fetched {} bytes", bytes.len());
                                return Ok(bytes);
                            }
                            Ok(_) => {
                                tracing::warn!("Empty body from {}", url);
                                last_error = Some(FetchError::EmptyBody);
                            }
                            Err(e) => {
                                tracing::warn!("Failed to read response body: {}", e);
                                last_error = Some(FetchError::Request(e));
                            }
                        }
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        tracing::warn!("HTTP error {} for {}: {}", status, url, body.trim());
                        last_error = Some(FetchError::Status {
                            status: status.as_u16(),
                        });
                    }
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!("Fetch timed out for {}", url);
                    last_error = Some(FetchError::Timeout);
                }
                Err(e) => {
                    tracing::warn!("Request failed: {} for {}", e, url);
                    last_error = Some(FetchError::Request(e));
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_encodes_prompt_and_nonce() {
        let source = ImageSource::new("https://img.example/prompt", RetryPolicy::default());
        let req = GenerationRequest::with_nonce("neon palm trees", 1700000000);
        assert_eq!(
            source.request_url(&req),
            "https://img.example/prompt/neon%20palm%20trees%201700000000"
        );
    }

    #[test]
    fn request_url_tolerates_trailing_slash() {
        let source = ImageSource::new("https://img.example/prompt/", RetryPolicy::default());
        let req = GenerationRequest::with_nonce("a", 1);
        assert_eq!(source.request_url(&req), "https://img.example/prompt/a%201");
    }

    #[test]
    fn path_segment_encoding_is_conservative() {
        assert_eq!(encode_path_segment("a/b?c=d"), "a%2Fb%3Fc%3Dd");
        assert_eq!(encode_path_segment("safe-chars_only.~"), "safe-chars_only.~");
    }
}
