use crate::builder::CaptureClientBuilder;
use crate::config::{ClientConfig, Endpoint};
use crate::error::Error;
use crate::pool::ConnectionPool;
use crate::reaper::IdleReaper;
use crate::request::{Query, build_request};
use crate::response::{self, Payload};
use bytes::Bytes;
use http::Method;
use http_body_util::BodyExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Client for the capture/playout control service.
///
/// One instance manages one bounded connection pool to one `host:port`
/// pair, with a background reaper reclaiming idle and expired
/// connections. Every operation funnels through a single dispatch path:
/// build the request, lease a pooled connection, exchange under the
/// socket read timeout, return the connection once the body is fully
/// read, then classify and decode.
///
/// The client is `Clone + Send + Sync`; clones share the pool. Callers
/// may issue operations concurrently — the pool bounds the number of
/// simultaneously leased connections and never hands one connection to
/// two requests at once.
///
/// Resource operations are deliberately generic: callers supply the
/// resource path, optional query parameters, an optional body and the
/// expected element type. A server answering with a JSON array or a
/// single JSON object for the same endpoint decodes uniformly; binary
/// endpoints are read through [`get_bytes`](CaptureClient::get_bytes).
///
/// # Example
///
/// ```ignore
/// let client = CaptureClient::new("capture-host", 8080);
///
/// let channels: Vec<Channel> = client.get_list("channels").await?;
/// let job: Option<CaptureJob> = client.get("capture-jobs/42").await?;
///
/// client.close();
/// ```
#[derive(Clone)]
pub struct CaptureClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    endpoint: Endpoint,
    config: ClientConfig,
    pool: Arc<ConnectionPool>,
    reaper: IdleReaper,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        // Last clone gone without an explicit close(): tear both down.
        self.reaper.stop();
        self.pool.shutdown();
    }
}

impl CaptureClient {
    /// Create a client with default configuration (pool of 8 connections).
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::builder(host, port).build()
    }

    /// Create a builder for non-default pool sizing or timing.
    pub fn builder(host: impl Into<String>, port: u16) -> CaptureClientBuilder {
        CaptureClientBuilder::new(host, port)
    }

    pub(crate) fn from_parts(endpoint: Endpoint, config: ClientConfig) -> Self {
        let pool = Arc::new(ConnectionPool::new(
            endpoint.clone(),
            config.max_connections,
        ));
        let reaper = IdleReaper::spawn(
            Arc::clone(&pool),
            config.reap_interval,
            config.idle_timeout,
        );

        Self {
            inner: Arc::new(ClientInner {
                endpoint,
                config,
                pool,
                reaper,
            }),
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        self.inner.endpoint.host()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.endpoint.port()
    }

    /// Shut the client down: the reaper stops and the pool closes all
    /// idle connections and rejects further acquisition. In-flight
    /// requests complete or time out independently. Idempotent.
    pub fn close(&self) {
        self.inner.reaper.stop();
        self.inner.pool.shutdown();
    }

    /// GET a single object.
    ///
    /// `Ok(None)` means the server answered successfully but the envelope
    /// was empty (e.g. an accepted-without-body response or a tolerated
    /// payload shape mismatch) — distinct from a failed request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, Error> {
        let list = self.get_list(path).await?;
        Ok(list.into_iter().next())
    }

    /// GET a collection.
    pub async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        self.get_list_with(path, &Query::new()).await
    }

    /// GET a collection with query parameters (appended in insertion order).
    pub async fn get_list_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
    ) -> Result<Vec<T>, Error> {
        let payload = self
            .dispatch::<()>(Method::GET, path, query, None)
            .await?;
        match payload {
            Some(payload) => response::decode_list(payload),
            None => Ok(Vec::new()),
        }
    }

    /// GET a binary payload (non-JSON content type), e.g. a thumbnail.
    ///
    /// `Ok(None)` when the server answered with JSON or an empty body.
    pub async fn get_bytes(&self, path: &str) -> Result<Option<Bytes>, Error> {
        let payload = self
            .dispatch::<()>(Method::GET, path, &Query::new(), None)
            .await?;
        Ok(payload.and_then(response::decode_bytes))
    }

    /// POST a body (create or create-like action) and decode the reply.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, Error> {
        let payload = self
            .dispatch(Method::POST, path, &Query::new(), body)
            .await?;
        first(payload)
    }

    /// POST without a body (bare actions such as stop/cancel/restart).
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, Error> {
        self.post::<(), T>(path, None).await
    }

    /// PUT a full replacement of an entity that already has an identity.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, Error> {
        let payload = self
            .dispatch(Method::PUT, path, &Query::new(), Some(body))
            .await?;
        first(payload)
    }

    /// PATCH a partial update; sent as `application/merge-patch+json`.
    pub async fn patch<B: Serialize>(&self, path: &str, body: &B) -> Result<(), Error> {
        self.dispatch(Method::PATCH, path, &Query::new(), Some(body))
            .await?;
        Ok(())
    }

    /// DELETE a resource.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        self.dispatch::<()>(Method::DELETE, path, &Query::new(), None)
            .await?;
        Ok(())
    }

    /// The single code path every operation funnels through.
    ///
    /// Stateless per call: no retry, no session state beyond the shared
    /// pool. A transport failure or timeout drops the lease, which
    /// discards the connection and frees the slot.
    async fn dispatch<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<&B>,
    ) -> Result<Option<Payload>, Error> {
        let request = build_request(&self.inner.endpoint, method.clone(), path, query, body)?;

        let mut lease = self.inner.pool.acquire().await?;
        let read_timeout = self.inner.config.read_timeout;

        let exchange = async {
            let response = lease.send_request(request).await?;
            let (parts, body) = response.into_parts();
            // Read the body to completion while the lease is held; the
            // connection goes back to the pool right after, so slow
            // decoding cannot starve other callers.
            let bytes = body.collect().await?.to_bytes();
            Ok::<_, Error>((parts, bytes))
        };

        let (parts, bytes) = match tokio::time::timeout(read_timeout, exchange).await {
            Ok(Ok(exchange)) => exchange,
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(Error::Timeout(read_timeout)),
        };

        let keep_alive = response::parse_keep_alive(&parts.headers)
            .unwrap_or(self.inner.config.default_keep_alive);
        let reusable = !response::wants_close(&parts.headers);
        self.inner.pool.release(lease, keep_alive, reusable);

        tracing::debug!(
            method = %method,
            path,
            status = parts.status.as_u16(),
            "request completed"
        );

        response::evaluate(parts.status, &parts.headers, bytes, &self.inner.endpoint.url(path))
    }
}

fn first<T: DeserializeOwned>(payload: Option<Payload>) -> Result<Option<T>, Error> {
    match payload {
        Some(payload) => Ok(response::decode_list(payload)?.into_iter().next()),
        None => Ok(None),
    }
}
