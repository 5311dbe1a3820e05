//! Typed HTTP/JSON client for the capture/playout control API
//!
//! This crate provides the generic request-dispatch engine every resource
//! operation of the capture service funnels through:
//! - An explicit bounded connection pool per `host:port` with negotiated
//!   keep-alive lifetimes (`Keep-Alive: timeout=N`, 30s fallback)
//! - A background reaper that closes expired and idle connections
//! - Request construction (ordered query encoding, per-method content types)
//! - Response classification (success vs. API error, JSON vs. raw bytes,
//!   single object vs. collection) and typed decoding
//!
//! Resource-specific convenience methods are thin wrappers callers build on
//! top of the generic operations; the engine only needs a path, optional
//! query parameters, an optional body and the expected element type.
//!
//! # Example
//!
//! ```ignore
//! use capture_client::{CaptureClient, Query};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct CaptureJob {
//!     id: String,
//!     status: String,
//! }
//!
//! let client = CaptureClient::new("capture-host", 8080);
//!
//! // Collection endpoint; the server may answer with an array or a
//! // single object, both decode uniformly.
//! let mut query = Query::new();
//! query.push("channelId", 3);
//! let jobs: Vec<CaptureJob> = client.get_list_with("capture-jobs", &query).await?;
//!
//! // Binary endpoint (non-JSON content type).
//! let thumbnail = client.get_bytes("capture-jobs/42/thumbnail").await?;
//!
//! client.close();
//! ```

mod builder;
mod client;
mod config;
mod error;
mod pool;
mod reaper;
mod request;
mod response;

pub use builder::CaptureClientBuilder;
pub use client::CaptureClient;
pub use config::{
    ClientConfig, DEFAULT_IDLE_TIMEOUT, DEFAULT_KEEP_ALIVE, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_READ_TIMEOUT, DEFAULT_REAP_INTERVAL, Endpoint,
};
pub use error::{ApiError, Error};
pub use request::Query;
