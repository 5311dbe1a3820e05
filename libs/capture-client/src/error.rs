use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Structured failure payload returned by the server, or synthesized by the
/// client when the error body is absent or malformed.
///
/// Wire shape: `{ timestamp, status, error, message, path }`, all fields
/// optional except `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApiError {
    /// Build an error from a bare status when the server sent no parseable
    /// error body: current timestamp, canonical reason phrase, request path.
    pub(crate) fn synthesized(status: http::StatusCode, path: &str) -> Self {
        Self {
            timestamp: Some(Utc::now().fixed_offset()),
            status: status.as_u16(),
            error: status.canonical_reason().map(str::to_owned),
            message: None,
            path: Some(path.to_owned()),
        }
    }
}

impl fmt::Display for ApiError {
    /// `"<status> <error> - <message>"`; the message segment is omitted
    /// when absent or empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.error.as_deref().unwrap_or(""))?;
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => write!(f, " - {message}"),
            _ => Ok(()),
        }
    }
}

/// Client error types
///
/// The taxonomy keeps the three failure classes distinct: transport
/// failures ([`Transport`](Error::Transport), [`Timeout`](Error::Timeout)),
/// structured API errors ([`Api`](Error::Api)) and decode failures
/// ([`Decode`](Error::Decode)). None of them are retried internally.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Request building failed
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Request body could not be serialized to JSON (fatal, not retried)
    #[error("Request body serialization failed: {0}")]
    BodyEncode(#[source] serde_json::Error),

    /// Query string could not be encoded
    #[error("Query string encoding failed: {0}")]
    QueryEncode(#[from] serde_urlencoded::ser::Error),

    /// Transport error (connect, DNS, reset, protocol)
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Socket read timeout elapsed before the response was fully received
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The pool was shut down; no further connections can be acquired
    #[error("Connection pool is shut down")]
    PoolClosed,

    /// Non-2xx HTTP status with a server-provided or synthesized error body
    #[error("API error: {0}")]
    Api(ApiError),

    /// Response payload is structurally incompatible with the expected type
    #[error("Response decoding failed: {0}")]
    Decode(#[source] serde_json::Error),
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn api_error_display_with_message() {
        let err = ApiError {
            timestamp: None,
            status: 404,
            error: Some("Not Found".into()),
            message: Some("no such job".into()),
            path: None,
        };
        assert_eq!(err.to_string(), "404 Not Found - no such job");
    }

    #[test]
    fn api_error_display_omits_empty_message() {
        let err = ApiError {
            timestamp: None,
            status: 500,
            error: Some("Internal Server Error".into()),
            message: Some(String::new()),
            path: None,
        };
        assert_eq!(err.to_string(), "500 Internal Server Error");
    }

    #[test]
    fn api_error_parses_wire_shape() {
        let err: ApiError = serde_json::from_str(
            r#"{
                "timestamp": "2024-03-01T12:00:00+01:00",
                "status": 409,
                "error": "Conflict",
                "message": "job already running",
                "path": "/api/v1/capture-jobs"
            }"#,
        )
        .unwrap();
        assert_eq!(err.status, 409);
        assert_eq!(err.error.as_deref(), Some("Conflict"));
        assert!(err.timestamp.is_some());
    }

    #[test]
    fn api_error_status_is_required() {
        let result = serde_json::from_str::<ApiError>(r#"{"error":"Bad Request"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn synthesized_error_carries_reason_and_path() {
        let err = ApiError::synthesized(
            http::StatusCode::BAD_GATEWAY,
            "http://host:8080/api/v1/channels",
        );
        assert_eq!(err.status, 502);
        assert_eq!(err.error.as_deref(), Some("Bad Gateway"));
        assert_eq!(err.path.as_deref(), Some("http://host:8080/api/v1/channels"));
        assert!(err.timestamp.is_some());
        assert!(err.message.is_none());
    }

    #[test]
    fn transport_error_preserves_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::from(inner);

        let source = err.source().expect("transport error should have a source");
        let io = source.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
    }
}
