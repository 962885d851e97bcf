//! Transport seam between the collector and the network
//!
//! The collector only needs "GET this path, give me JSON". Keeping that behind a
//! trait lets the retry and pagination logic run against scripted responses.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure of a single request attempt
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Connection-level failure (DNS, refused, reset, TLS...)
    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body was not valid JSON
    #[error("response from {url} is not valid JSON: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// Classify a reqwest failure
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// True for network-layer failures (timeouts and connection errors)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }
}

/// Issues one GET and decodes the JSON body
#[async_trait]
pub trait JsonTransport: Send + Sync {
    /// Fetch `path` (including query string) relative to the API base
    async fn get_json(&self, path: &str) -> Result<Value, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transport() {
        let timeout = FetchError::Timeout { url: "u".into() };
        let status = FetchError::Status {
            url: "u".into(),
            status: 503,
        };
        let decode = FetchError::Decode {
            url: "u".into(),
            message: "eof".into(),
        };
        assert!(timeout.is_transport());
        assert!(!status.is_transport());
        assert!(!decode.is_transport());
        assert_eq!(status.to_string(), "u returned HTTP 503");
    }
}
