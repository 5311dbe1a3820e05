use crate::config::{API_ROOT, Endpoint};
use crate::error::Error;
use bytes::Bytes;
use http::{Method, Request, header};
use http_body_util::Full;
use serde::Serialize;

/// Ordered query parameters.
///
/// Parameters are percent-encoded and appended to the URL in insertion
/// order, which keeps constructed URLs deterministic. Values are converted
/// with [`ToString`], so identifiers and numbers can be pushed directly.
///
/// # Example
///
/// ```ignore
/// let mut query = Query::new();
/// query.push("channelId", 3);
/// query.push("status", "RECORDING");
/// let jobs: Vec<CaptureJob> = client.get_list_with("capture-jobs", &query).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter; insertion order is preserved on the wire.
    pub fn push(&mut self, name: impl Into<String>, value: impl ToString) {
        self.pairs.push((name.into(), value.to_string()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Percent-encoded `k1=v1&k2=v2...` in insertion order.
    pub(crate) fn encode(&self) -> Result<String, Error> {
        Ok(serde_urlencoded::to_string(&self.pairs)?)
    }
}

/// Build the outbound request for one dispatch cycle.
///
/// The URI is origin-form (`/api/v1/<path>[?query]`) with an explicit
/// `Host` header, as required when driving an HTTP/1.1 connection
/// directly. `Accept: application/json` is always set; `Content-Type`
/// only when a body is present: `application/json` for POST/PUT,
/// `application/merge-patch+json` for PATCH. GET/DELETE never carry a
/// request content type.
pub(crate) fn build_request<B: Serialize>(
    endpoint: &Endpoint,
    method: Method,
    path: &str,
    query: &Query,
    body: Option<&B>,
) -> Result<Request<Full<Bytes>>, Error> {
    let mut target = format!("{API_ROOT}{path}");
    if !query.is_empty() {
        target.push('?');
        target.push_str(&query.encode()?);
    }

    let mut builder = Request::builder()
        .method(method.clone())
        .uri(target)
        .header(header::HOST, endpoint.authority())
        .header(header::ACCEPT, "application/json");

    let payload = match body {
        Some(value) => {
            let content_type = match method {
                Method::PATCH => "application/merge-patch+json",
                _ => "application/json",
            };
            builder = builder.header(header::CONTENT_TYPE, content_type);
            Bytes::from(serde_json::to_vec(value).map_err(Error::BodyEncode)?)
        }
        None => Bytes::new(),
    };

    Ok(builder.body(Full::new(payload))?)
}
