use std::time::Duration;

/// Default maximum number of pooled connections per client.
pub const DEFAULT_MAX_CONNECTIONS: usize = 8;

/// Socket read timeout applied to every request, independent of keep-alive.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Keep-alive lifetime used when the server does not negotiate one.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Idle threshold after which the reaper closes an unused connection.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between reaper sweeps.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Root path every resource path is resolved against.
pub(crate) const API_ROOT: &str = "/api/v1/";

/// Pool sizing and timing knobs for a [`CaptureClient`](crate::CaptureClient).
///
/// The defaults match the wire contract of the capture service: at most 8
/// pooled connections, a 5 second socket read timeout, a 30 second
/// keep-alive fallback and a reaper that sweeps every second, closing
/// connections idle for longer than 30 seconds.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum number of concurrently leased connections (default: 8)
    pub max_connections: usize,

    /// Per-request read timeout, bounding the whole exchange from send
    /// to last body byte (default: 5s)
    pub read_timeout: Duration,

    /// Keep-alive lifetime when the server sends no `Keep-Alive` header
    /// (default: 30s)
    pub default_keep_alive: Duration,

    /// Idle threshold for the background reaper (default: 30s)
    pub idle_timeout: Duration,

    /// Sleep between reaper sweeps (default: 1s)
    pub reap_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            read_timeout: DEFAULT_READ_TIMEOUT,
            default_keep_alive: DEFAULT_KEEP_ALIVE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

/// The fixed `host:port` a client talks to, plus its derived URL prefix.
///
/// Set at construction, never mutated. All requests are issued against
/// `http://<host>:<port>/api/v1/<resource-path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, as sent in the `Host` header.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Absolute URL prefix, ending in a slash: `http://host:port/api/v1/`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, API_ROOT)
    }

    /// Absolute URL for a resource path, without any query string.
    ///
    /// Used for diagnostics (the `path` field of synthesized API errors).
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }
}
