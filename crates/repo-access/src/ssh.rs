//! russh-backed [`Connector`].
//!
//! Each pooled host owns one russh client handle; every [`Session`] the
//! pool hands out is a separate session channel on that handle.
//!
//! [`Session`]: crate::pool::Session

mod known_hosts;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use russh::client;
use russh::keys::{HashAlg, PrivateKeyWithHashAlg, PublicKey};
use tokio::sync::Mutex;

pub use self::known_hosts::KnownHosts;
use crate::auth::{AuthMethod, Credentials, HostKey, SharedVerifier};
use crate::error::{ConnectError, Result};
use crate::pool::{ConnectionTarget, Connector, HostConfig, Transport};

/// Client handler that defers host key decisions to a [`HostVerifier`].
///
/// [`HostVerifier`]: crate::auth::HostVerifier
struct ClientHandler {
    host: String,
    port: u16,
    verifier: SharedVerifier,
    rejected: Arc<AtomicBool>,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let key = HostKey::new(
            server_public_key.algorithm().as_str(),
            server_public_key.fingerprint(HashAlg::Sha256).to_string(),
        );
        let accepted = self.verifier.verify(&self.host, self.port, &key);
        if !accepted {
            tracing::warn!(
                host = %self.host,
                port = self.port,
                fingerprint = %key.fingerprint,
                "Server key rejected"
            );
            self.rejected.store(true, Ordering::Release);
        }
        Ok(accepted)
    }
}

/// Connects to SSH servers with russh.
#[derive(Clone)]
pub struct SshConnector {
    config: Arc<client::Config>,
}

impl std::fmt::Debug for SshConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnector").finish_non_exhaustive()
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SshConnector {
    /// Create a connector with the default russh client settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(client::Config::default())
    }

    /// Create a connector with custom russh client settings.
    #[must_use]
    pub fn with_config(config: client::Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Connector for SshConnector {
    type Transport = SshTransport;

    async fn connect(
        &self,
        target: &ConnectionTarget,
        config: &HostConfig,
        timeout: Duration,
    ) -> Result<SshTransport> {
        let rejected = Arc::new(AtomicBool::new(false));
        let handler = ClientHandler {
            host: target.host.clone(),
            port: target.port,
            verifier: Arc::clone(&config.host_verifier),
            rejected: Arc::clone(&rejected),
        };

        tracing::info!(host = %target.host, port = target.port, "Connecting to SSH server");
        let handshake = async {
            let addr = (target.host.as_str(), target.port);
            let mut handle = client::connect(Arc::clone(&self.config), addr, handler)
                .await
                .map_err(|e| {
                    if rejected.load(Ordering::Acquire) {
                        ConnectError::host_key_verification(&target.host, "server key not trusted")
                    } else {
                        ConnectError::connection(&target.host, target.port, e.to_string())
                    }
                })?;
            authenticate(&mut handle, &config.credentials).await?;
            Ok::<_, crate::error::AccessError>(handle)
        };

        let handle = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| ConnectError::timeout(timeout))??;

        Ok(SshTransport {
            handle: Mutex::new(handle),
            closed: AtomicBool::new(false),
        })
    }
}

/// An authenticated russh client connection.
pub struct SshTransport {
    handle: Mutex<client::Handle<ClientHandler>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for SshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTransport")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Transport for SshTransport {
    type Channel = russh::Channel<client::Msg>;

    async fn open_channel(&self) -> Result<Self::Channel> {
        let handle = self.handle.lock().await;
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| ConnectError::channel(e.to_string()))?;
        Ok(channel)
    }

    fn is_closed(&self) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return true;
        }
        // A held lock means a channel is being opened over a live handle.
        self.handle
            .try_lock()
            .is_ok_and(|handle| handle.is_closed())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let handle = self.handle.lock().await;
        if let Err(e) = handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            tracing::debug!(error = %e, "Disconnect failed");
        }
    }
}

/// Try each configured method in order until one succeeds.
async fn authenticate(
    handle: &mut client::Handle<ClientHandler>,
    credentials: &Credentials,
) -> Result<()> {
    let username = &credentials.username;
    if credentials.auth_methods.is_empty() {
        return Err(ConnectError::authentication(username, "no authentication methods configured").into());
    }

    for method in &credentials.auth_methods {
        match method {
            AuthMethod::Password(password) => {
                tracing::debug!(user = %username, "Attempting password authentication");
                match handle.authenticate_password(username, password).await {
                    Ok(auth_result) if auth_result.success() => {
                        tracing::info!(user = %username, "Password authentication successful");
                        return Ok(());
                    }
                    Ok(_) => tracing::debug!(user = %username, "Password authentication failed"),
                    Err(e) => tracing::debug!(
                        user = %username,
                        error = %e,
                        "Password authentication error"
                    ),
                }
            }
            AuthMethod::PublicKey {
                private_key,
                passphrase,
            } => {
                tracing::debug!(user = %username, "Attempting public key authentication");
                let key = match russh::keys::decode_secret_key(private_key, passphrase.as_deref()) {
                    Ok(key) => Arc::new(key),
                    Err(e) => {
                        tracing::debug!(
                            user = %username,
                            error = %e,
                            encrypted = passphrase.is_some(),
                            "Failed to decode private key"
                        );
                        continue;
                    }
                };

                let rsa_hash = handle
                    .best_supported_rsa_hash()
                    .await
                    .ok()
                    .flatten()
                    .flatten();
                let key_with_hash = PrivateKeyWithHashAlg::new(key, rsa_hash);

                match handle.authenticate_publickey(username, key_with_hash).await {
                    Ok(auth_result) if auth_result.success() => {
                        tracing::info!(user = %username, "Public key authentication successful");
                        return Ok(());
                    }
                    Ok(_) => tracing::debug!(user = %username, "Public key authentication failed"),
                    Err(e) => tracing::debug!(
                        user = %username,
                        error = %e,
                        "Public key authentication error"
                    ),
                }
            }
        }
    }

    Err(ConnectError::authentication(username, "All authentication methods exhausted").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RejectAll;

    #[tokio::test]
    async fn unreachable_host_fails_fast() {
        let connector = SshConnector::new();
        let config = HostConfig::new("127.0.0.1")
            .port(1)
            .username("alice")
            .host_verifier(RejectAll);

        let err = connector
            .connect(&config.target(), &config, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::AccessError::Connect(_)));
    }
}
