use crate::client::CaptureClient;
use crate::config::{ClientConfig, Endpoint};
use std::time::Duration;

/// Builder for [`CaptureClient`] instances with non-default pool sizing
/// or timing.
///
/// # Example
///
/// ```ignore
/// use capture_client::CaptureClient;
/// use std::time::Duration;
///
/// let client = CaptureClient::builder("capture-host", 8080)
///     .max_connections(16)
///     .read_timeout(Duration::from_secs(10))
///     .build();
/// ```
#[must_use = "CaptureClientBuilder does nothing until .build() is called"]
pub struct CaptureClientBuilder {
    endpoint: Endpoint,
    config: ClientConfig,
}

impl CaptureClientBuilder {
    pub(crate) fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            endpoint: Endpoint::new(host, port),
            config: ClientConfig::default(),
        }
    }

    /// Maximum number of concurrently leased connections (default: 8)
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.config.max_connections = max_connections;
        self
    }

    /// Per-request read timeout (default: 5s). The deadline covers the
    /// whole exchange, from sending the request to collecting the last
    /// body byte, not the gap between individual reads.
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.config.read_timeout = read_timeout;
        self
    }

    /// Keep-alive lifetime applied when the server sends no
    /// `Keep-Alive` header (default: 30s)
    pub fn default_keep_alive(mut self, default_keep_alive: Duration) -> Self {
        self.config.default_keep_alive = default_keep_alive;
        self
    }

    /// Idle threshold for the background reaper (default: 30s)
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.config.idle_timeout = idle_timeout;
        self
    }

    /// Sleep between reaper sweeps (default: 1s)
    pub fn reap_interval(mut self, reap_interval: Duration) -> Self {
        self.config.reap_interval = reap_interval;
        self
    }

    /// Create the client: the pool and its reaper are brought up together.
    /// Connections are dialed lazily on first use.
    pub fn build(self) -> CaptureClient {
        CaptureClient::from_parts(self.endpoint, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_are_applied() {
        let builder = CaptureClientBuilder::new("h", 1)
            .max_connections(3)
            .read_timeout(Duration::from_secs(1))
            .default_keep_alive(Duration::from_secs(2))
            .idle_timeout(Duration::from_secs(3))
            .reap_interval(Duration::from_millis(250));

        assert_eq!(builder.config.max_connections, 3);
        assert_eq!(builder.config.read_timeout, Duration::from_secs(1));
        assert_eq!(builder.config.default_keep_alive, Duration::from_secs(2));
        assert_eq!(builder.config.idle_timeout, Duration::from_secs(3));
        assert_eq!(builder.config.reap_interval, Duration::from_millis(250));
    }
}
