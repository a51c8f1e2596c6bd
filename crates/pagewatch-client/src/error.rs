//! Client error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for registry and pager calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the registry or the pager.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tls error: {0}")]
    Tls(String),

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("request build error: {0}")]
    Request(#[from] http::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("response body error: {0}")]
    Body(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
