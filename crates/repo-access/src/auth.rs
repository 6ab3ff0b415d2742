//! Credentials and host key verification.

use std::fmt;
use std::sync::Arc;

/// Authentication method.
#[derive(Clone)]
pub enum AuthMethod {
    /// Password authentication.
    Password(String),
    /// Public key authentication with in-memory key material.
    PublicKey {
        /// Private key in OpenSSH or PEM encoding.
        private_key: String,
        /// Passphrase for the key (if encrypted).
        passphrase: Option<String>,
    },
}

impl AuthMethod {
    /// Create password auth.
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password(password.into())
    }

    /// Create public key auth.
    #[must_use]
    pub fn public_key(private_key: impl Into<String>) -> Self {
        Self::PublicKey {
            private_key: private_key.into(),
            passphrase: None,
        }
    }

    /// Create public key auth with passphrase.
    #[must_use]
    pub fn public_key_with_passphrase(
        private_key: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self::PublicKey {
            private_key: private_key.into(),
            passphrase: Some(passphrase.into()),
        }
    }

    /// Check if this is password auth.
    #[must_use]
    pub const fn is_password(&self) -> bool {
        matches!(self, Self::Password(_))
    }

    /// Check if this is public key auth.
    #[must_use]
    pub const fn is_public_key(&self) -> bool {
        matches!(self, Self::PublicKey { .. })
    }
}

// Secrets stay out of logs.
impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::PublicKey { passphrase, .. } => f
                .debug_struct("PublicKey")
                .field("private_key", &"<redacted>")
                .field("encrypted", &passphrase.is_some())
                .finish(),
        }
    }
}

/// Credentials for one principal.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Authentication methods to try (in order).
    pub auth_methods: Vec<AuthMethod>,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            auth_methods: Vec::new(),
        }
    }

    /// Build credentials from whichever secrets are present.
    ///
    /// A private key is tried before a password; a passphrase only applies
    /// to the key.
    #[must_use]
    pub fn from_parts(
        username: impl Into<String>,
        private_key: Option<String>,
        passphrase: Option<String>,
        password: Option<String>,
    ) -> Self {
        let mut credentials = Self::new(username);
        if let Some(private_key) = private_key {
            credentials = credentials.with_auth(AuthMethod::PublicKey {
                private_key,
                passphrase,
            });
        }
        if let Some(password) = password {
            credentials = credentials.with_password(password);
        }
        credentials
    }

    /// Add an authentication method.
    #[must_use]
    pub fn with_auth(mut self, method: AuthMethod) -> Self {
        self.auth_methods.push(method);
        self
    }

    /// Add password authentication.
    #[must_use]
    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.with_auth(AuthMethod::password(password))
    }

    /// Add public key authentication.
    #[must_use]
    pub fn with_key(self, private_key: impl Into<String>) -> Self {
        self.with_auth(AuthMethod::public_key(private_key))
    }
}

impl Default for Credentials {
    fn default() -> Self {
        let username = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "root".to_string());
        Self::new(username)
    }
}

/// A server public key as presented during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostKey {
    /// Key algorithm name, e.g. `ssh-ed25519`.
    pub algorithm: String,
    /// SHA-256 fingerprint in OpenSSH notation (`SHA256:...`).
    pub fingerprint: String,
}

impl HostKey {
    /// Create a host key description.
    pub fn new(algorithm: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

/// Decides whether a server key is trusted.
pub trait HostVerifier: Send + Sync {
    /// Return `true` to accept `key` for `host:port`.
    fn verify(&self, host: &str, port: u16, key: &HostKey) -> bool;
}

impl<F> HostVerifier for F
where
    F: Fn(&str, u16, &HostKey) -> bool + Send + Sync,
{
    fn verify(&self, host: &str, port: u16, key: &HostKey) -> bool {
        self(host, port, key)
    }
}

/// Rejects every key.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl HostVerifier for RejectAll {
    fn verify(&self, host: &str, _port: u16, key: &HostKey) -> bool {
        tracing::debug!(host = %host, fingerprint = %key.fingerprint, "Rejecting host key");
        false
    }
}

/// Accepts every key without verification.
///
/// # Security Warning
///
/// **DANGEROUS:** This disables host key verification entirely, allowing
/// man-in-the-middle attacks. Only available with the `insecure-skip-verify`
/// feature.
#[cfg(feature = "insecure-skip-verify")]
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[cfg(feature = "insecure-skip-verify")]
impl HostVerifier for AcceptAll {
    fn verify(&self, host: &str, _port: u16, _key: &HostKey) -> bool {
        tracing::warn!(host = %host, "Accepting server key without verification (INSECURE)");
        true
    }
}

/// Shared handle to a verifier.
pub type SharedVerifier = Arc<dyn HostVerifier>;
