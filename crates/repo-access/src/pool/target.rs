//! Connection targets and per-host connect settings.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Credentials, HostVerifier, RejectAll, SharedVerifier};

/// Identity of one pooled connection: host, port and principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionTarget {
    /// Host name or address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Principal the connection authenticates as.
    pub username: String,
}

impl ConnectionTarget {
    /// Create a target.
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
        }
    }

    /// `host:port` form used for socket addressing.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

/// Everything needed to reach one host.
#[derive(Clone)]
pub struct HostConfig {
    /// Host to connect to.
    pub host: String,
    /// Port (default 22).
    pub port: u16,
    /// Credentials.
    pub credentials: Credentials,
    /// Handshake timeout; `None` uses the pool default.
    pub connect_timeout: Option<Duration>,
    /// Server key verification callback.
    pub host_verifier: SharedVerifier,
}

impl fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("credentials", &self.credentials)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl HostConfig {
    /// Create new config for a host.
    ///
    /// The default verifier rejects every key; install a real one with
    /// [`HostConfig::host_verifier`].
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            credentials: Credentials::default(),
            connect_timeout: None,
            host_verifier: Arc::new(RejectAll),
        }
    }

    /// Build a config from the raw connect parameters.
    ///
    /// A zero `connect_timeout_ms` means "use the pool default".
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_parts(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        private_key: Option<String>,
        passphrase: Option<String>,
        password: Option<String>,
        host_verifier: SharedVerifier,
        connect_timeout_ms: u64,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: Credentials::from_parts(username, private_key, passphrase, password),
            connect_timeout: (connect_timeout_ms > 0)
                .then(|| Duration::from_millis(connect_timeout_ms)),
            host_verifier,
        }
    }

    /// Set port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.credentials.username = username.into();
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the host key verifier.
    #[must_use]
    pub fn host_verifier(mut self, verifier: impl HostVerifier + 'static) -> Self {
        self.host_verifier = Arc::new(verifier);
        self
    }

    /// The pooling key for this config.
    #[must_use]
    pub fn target(&self) -> ConnectionTarget {
        ConnectionTarget::new(&self.host, self.port, &self.credentials.username)
    }

    /// Connect timeout, falling back to `default`.
    #[must_use]
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.connect_timeout.unwrap_or(default)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONNECT_TIMEOUT;
    use std::collections::HashSet;

    #[test]
    fn target_identity() {
        let a = ConnectionTarget::new("svn.example.com", 22, "alice");
        let b = ConnectionTarget::new("svn.example.com", 22, "alice");
        let c = ConnectionTarget::new("svn.example.com", 22, "bob");

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(a.to_string(), "alice@svn.example.com:22");
        assert_eq!(a.address(), "svn.example.com:22");
    }

    #[test]
    fn host_config_builder() {
        let config = HostConfig::new("svn.example.com")
            .port(2222)
            .username("admin")
            .connect_timeout(Duration::from_secs(5));

        assert_eq!(config.target(), ConnectionTarget::new("svn.example.com", 2222, "admin"));
        assert_eq!(config.effective_timeout(Duration::from_secs(30)), Duration::from_secs(5));
    }

    #[test]
    fn host_config_from_parts() {
        let config = HostConfig::from_parts(
            "h",
            22,
            "u",
            None,
            None,
            Some("pw".into()),
            Arc::new(RejectAll),
            0,
        );
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.effective_timeout(DEFAULT_CONNECT_TIMEOUT), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.credentials.auth_methods.len(), 1);
        assert!(!format!("{config:?}").contains("pw"));
    }
}
