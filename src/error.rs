use std::fmt;

use serde::Deserialize;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum PostgrestError {
    /// Client configuration is invalid (base URL, environment variables).
    #[error("config error: {0}")]
    Config(String),
    /// Request payload or header could not be put on the wire.
    #[error("encode error: {0}")]
    Encode(String),
    /// Network or request execution error from the transport.
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
    /// Non-success HTTP status code with the decoded PostgREST error body.
    #[error("api error {}: {}", .0.status, .0)]
    Api(ApiError),
    /// Response decoding error, for success and error payloads alike.
    #[error("decode error: {0}")]
    Decode(String),
    /// The caller's cancellation signal fired before a response arrived.
    #[error("request cancelled")]
    Cancelled,
}

impl PostgrestError {
    /// Returns the API error record when the server rejected the request.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Structured error body returned by PostgREST for non-2xx responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub code: String,
    /// HTTP status of the response; not part of the body.
    #[serde(skip)]
    pub status: u16,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
