use crate::error::{ApiError, Error};
use bytes::Bytes;
use http::{HeaderMap, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// One response payload, classified exactly once from content type and
/// collected bytes before any type-specific decoding happens.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    /// `application/json` body, parsed into a generic document
    Json(Value),
    /// Non-JSON body (e.g. thumbnail image data)
    Raw(Bytes),
    /// No body at all
    Empty,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/json"))
}

/// Classify a fully collected success body.
///
/// An empty body is `Empty` regardless of the declared content type. An
/// `application/json` body that fails to parse is a decode error; any
/// other content type (or none) is kept as raw bytes.
fn classify_payload(headers: &HeaderMap, bytes: Bytes) -> Result<Payload, Error> {
    if bytes.is_empty() {
        return Ok(Payload::Empty);
    }

    if is_json(headers) {
        serde_json::from_slice(&bytes)
            .map(Payload::Json)
            .map_err(Error::Decode)
    } else {
        Ok(Payload::Raw(bytes))
    }
}

/// Classify one inbound response.
///
/// 200/201 classify and hand the payload on for decoding; any other 2xx
/// (202 Accepted in particular) is success with no payload, the body is
/// ignored entirely. A non-2xx status becomes an [`ApiError`]: parsed from
/// the JSON body when well-formed, otherwise synthesized from the status,
/// the current timestamp and the request URL. API errors are never
/// returned as decoded values.
pub(crate) fn evaluate(
    status: StatusCode,
    headers: &HeaderMap,
    bytes: Bytes,
    url: &str,
) -> Result<Option<Payload>, Error> {
    if status.is_success() {
        return match status {
            StatusCode::OK | StatusCode::CREATED => Ok(Some(classify_payload(headers, bytes)?)),
            _ => Ok(None),
        };
    }

    let parsed = if is_json(headers) && !bytes.is_empty() {
        serde_json::from_slice::<ApiError>(&bytes).ok()
    } else {
        None
    };

    Err(Error::Api(
        parsed.unwrap_or_else(|| ApiError::synthesized(status, url)),
    ))
}

/// Decode a payload into zero, one or many typed values.
///
/// A JSON array decodes element by element in order; any other JSON value
/// decodes as a one-element list. A raw or empty payload yields an empty
/// list — shape mismatches are tolerated, callers distinguish "no value"
/// from a failed request. A structurally incompatible element fails the
/// whole call; no partial list is returned.
pub(crate) fn decode_list<T: DeserializeOwned>(payload: Payload) -> Result<Vec<T>, Error> {
    match payload {
        Payload::Json(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(Error::Decode))
            .collect(),
        Payload::Json(value) => Ok(vec![serde_json::from_value(value).map_err(Error::Decode)?]),
        Payload::Raw(_) | Payload::Empty => Ok(Vec::new()),
    }
}

/// Extract a raw byte payload; JSON or empty payloads yield `None`.
pub(crate) fn decode_bytes(payload: Payload) -> Option<Bytes> {
    match payload {
        Payload::Raw(bytes) => Some(bytes),
        Payload::Json(_) | Payload::Empty => None,
    }
}

/// Parse the negotiated keep-alive lifetime from `Keep-Alive: timeout=N`.
///
/// Returns `None` when the header is absent or carries no parseable
/// `timeout` parameter; the caller falls back to the 30 second default.
pub(crate) fn parse_keep_alive(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("keep-alive")?.to_str().ok()?;

    for element in value.split(',') {
        let mut parts = element.splitn(2, '=');
        let name = parts.next().map(str::trim)?;
        if let Some(seconds) = parts.next() {
            if name.eq_ignore_ascii_case("timeout") {
                return seconds.trim().parse::<u64>().ok().map(Duration::from_secs);
            }
        }
    }
    None
}

/// Whether the server asked for the connection to be torn down.
pub(crate) fn wants_close(headers: &HeaderMap) -> bool {
    headers.get_all(header::CONNECTION).iter().any(|value| {
        value
            .to_str()
            .is_ok_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("close")))
    })
}
