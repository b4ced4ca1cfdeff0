//! Remote artifact origins
//!
//! The origin is the static artifact store behind the cache. [`Origin`] keeps
//! the fetcher agnostic about how bytes are retrieved, so tests can swap the
//! HTTP implementation for an in-memory one.

use crate::error::FetchError;
use std::fmt;
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum response size (50MB)
pub const DEFAULT_MAX_SIZE: u64 = 50 * 1024 * 1024;

/// Default User-Agent header value
pub const DEFAULT_USER_AGENT: &str = concat!("ci-dashboard/", env!("CARGO_PKG_VERSION"));

/// Source of remote artifact bytes
#[cfg_attr(test, mockall::automock)]
pub trait Origin {
    /// Blocking GET of `url`
    ///
    /// # Errors
    /// Returns [`FetchError::Network`] when the origin is unreachable, times
    /// out, answers with a non-success status, or the body cannot be read
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

impl<O: Origin + ?Sized> Origin for &O {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).get(url)
    }
}

impl<O: Origin + ?Sized> Origin for Box<O> {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).get(url)
    }
}

/// Blocking HTTP origin
#[derive(Clone)]
pub struct HttpOrigin {
    agent: ureq::Agent,
    timeout: Duration,
    user_agent: String,
    max_size: u64,
}

impl HttpOrigin {
    /// Create an origin with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.agent = build_agent(timeout);
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the maximum response size in bytes
    #[must_use]
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Configured request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    config.into()
}

impl Default for HttpOrigin {
    fn default() -> Self {
        Self {
            agent: build_agent(DEFAULT_TIMEOUT),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl fmt::Debug for HttpOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpOrigin")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

impl Origin for HttpOrigin {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| FetchError::network(url, e))?;

        response
            .body_mut()
            .with_config()
            .limit(self.max_size)
            .read_to_vec()
            .map_err(|e| FetchError::network(url, format!("error reading body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_origin_defaults() {
        let origin = HttpOrigin::new();
        assert_eq!(origin.timeout(), DEFAULT_TIMEOUT);
        assert!(format!("{origin:?}").contains("ci-dashboard/"));
    }

    #[test]
    fn http_origin_builder() {
        let origin = HttpOrigin::new()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent")
            .with_max_size(1024);
        assert_eq!(origin.timeout(), Duration::from_secs(5));
        let debug = format!("{origin:?}");
        assert!(debug.contains("test-agent"));
        assert!(debug.contains("1024"));
    }

    #[test]
    fn unreachable_origin_is_a_network_error() {
        let origin = HttpOrigin::new().with_timeout(Duration::from_secs(2));
        // Port 9 (discard) on localhost is closed on any sane test host.
        let err = origin.get("http://127.0.0.1:9/job/").unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[test]
    fn borrowed_origin_delegates() {
        let mut mock = MockOrigin::new();
        mock.expect_get()
            .withf(|url| url.ends_with("https://example.com/a"))
            .times(1)
            .returning(|_| Ok(b"content".to_vec()));

        let borrowed = &mock;
        assert_eq!(borrowed.get("https://example.com/a").unwrap(), b"content");
    }
}
