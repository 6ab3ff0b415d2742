//! Pooled connections to remote hosts.
//!
//! The pool keeps at most one host connection per [`ConnectionTarget`] and
//! hands out logical [`Session`]s that multiplex over that connection's
//! single physical link. A background task sweeps
//! the pool periodically and retires connections that have been idle past
//! the configured threshold.
//!
//! Two kinds of lock are involved: the pool lock guards only the target
//! map and is never held across an `.await`; each host connection has its
//! own async lock that serializes its handshake and state changes. The pool
//! lock is never held while a host lock is acquired.
//!
//! # Example
//!
//! ```ignore
//! use repo_access::pool::{HostConfig, SessionPool};
//! use repo_access::ssh::{KnownHosts, SshConnector};
//!
//! let pool = SessionPool::with_defaults(SshConnector::new());
//! let config = HostConfig::new("svn.example.com")
//!     .username("alice")
//!     .host_verifier(KnownHosts::default_location());
//!
//! let session = pool.open(&config).await?;
//! // ... use session.channel_mut()
//! pool.shutdown().await;
//! ```

mod host;
mod session;
mod target;
mod transport;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use self::host::{HostConnection, OpenError};
pub use self::host::ConnectionState;
pub use self::session::Session;
pub use self::target::{ConnectionTarget, HostConfig};
pub use self::transport::{Connector, Transport};
use crate::config::PoolConfig;
use crate::error::Result;

type HostMap<T> = HashMap<ConnectionTarget, Arc<HostConnection<T>>>;

struct PoolInner<C: Connector> {
    connector: C,
    config: PoolConfig,
    hosts: Mutex<HostMap<C::Transport>>,
}

impl<C: Connector> PoolInner<C> {
    fn hosts(&self) -> MutexGuard<'_, HostMap<C::Transport>> {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<Arc<HostConnection<C::Transport>>> {
        self.hosts().values().cloned().collect()
    }

    /// Find the live connection for `target`, inserting a fresh one if needed.
    fn lookup(&self, config: &HostConfig) -> Arc<HostConnection<C::Transport>> {
        let target = config.target();
        let mut hosts = self.hosts();
        match hosts.get(&target) {
            Some(existing) if !existing.is_disposed() => return Arc::clone(existing),
            _ => {}
        }

        let host = Arc::new(HostConnection::new(
            target.clone(),
            config.clone(),
            config.effective_timeout(self.config.connect_timeout),
            self.config.idle_timeout,
        ));
        hosts.insert(target, Arc::clone(&host));
        host
    }

    /// Remove `host` from the map unless it was already replaced.
    fn remove_if_same(&self, host: &Arc<HostConnection<C::Transport>>) {
        let mut hosts = self.hosts();
        if hosts
            .get(host.target())
            .is_some_and(|current| Arc::ptr_eq(current, host))
        {
            hosts.remove(host.target());
        }
    }

    async fn purge_idle(&self) -> usize {
        let mut evicted = 0;
        for host in self.snapshot() {
            if host.purge().await {
                evicted += 1;
                tracing::debug!(host = %host.target(), "Evicted idle connection");
                self.remove_if_same(&host);
            } else if host.is_disposed() {
                self.remove_if_same(&host);
            }
        }
        evicted
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Pooled connection targets.
    pub hosts: usize,
    /// Targets with an established link.
    pub connected: usize,
    /// Live sessions across all targets.
    pub active_sessions: usize,
}

impl PoolStats {
    /// Check if the pool is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.hosts == 0
    }
}

/// A pool of authenticated connections keyed by [`ConnectionTarget`].
pub struct SessionPool<C: Connector> {
    inner: Arc<PoolInner<C>>,
    purger: Option<JoinHandle<()>>,
}

impl<C: Connector> std::fmt::Debug for SessionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .field("background_purge", &self.purger.is_some())
            .finish()
    }
}

impl<C: Connector> SessionPool<C> {
    /// Create a pool and start its eviction task on the current runtime.
    ///
    /// Without a tokio runtime, or with a zero purge interval, no task is
    /// started and eviction only happens through [`SessionPool::purge_idle`].
    #[must_use]
    pub fn new(connector: C, config: PoolConfig) -> Self {
        let purge_interval = config.purge_interval;
        let inner = Arc::new(PoolInner {
            connector,
            config,
            hosts: Mutex::new(HashMap::new()),
        });
        let purger = spawn_purger(Arc::downgrade(&inner), purge_interval);
        Self { inner, purger }
    }

    /// Create with default config.
    #[must_use]
    pub fn with_defaults(connector: C) -> Self {
        Self::new(connector, PoolConfig::default())
    }

    /// Open a session to the host described by `config`.
    ///
    /// The first open for a target performs the handshake; later opens reuse
    /// the established link. If the pooled connection is retired while this
    /// call waits on it, the lookup starts over with a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns the handshake or channel error when the connection cannot be
    /// established for reasons other than retirement.
    pub async fn open(&self, config: &HostConfig) -> Result<Session<C::Transport>> {
        loop {
            let host = self.inner.lookup(config);
            match host.open_session(&self.inner.connector).await {
                Ok(session) => return Ok(session),
                Err(OpenError::Disposed(signal)) => {
                    tracing::debug!(host = %host.target(), reason = %signal, "Retrying open");
                    self.inner.remove_if_same(&host);
                    tokio::task::yield_now().await;
                }
                Err(OpenError::Failed(err)) => {
                    tracing::debug!(host = %host.target(), error = %err, "Open failed");
                    return Err(err);
                }
            }
        }
    }

    /// Retire every pooled connection. Idempotent.
    ///
    /// The pool stays usable: a later [`SessionPool::open`] connects afresh.
    pub async fn shutdown(&self) {
        let hosts = self.inner.snapshot();
        let count = hosts.len();
        for host in hosts {
            host.dispose().await;
            self.inner.remove_if_same(&host);
        }
        tracing::info!(disposed = count, "Session pool shut down");
    }

    /// Run one eviction sweep now; returns the number of evicted connections.
    pub async fn purge_idle(&self) -> usize {
        self.inner.purge_idle().await
    }

    /// Get pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let hosts = self.inner.snapshot();
        PoolStats {
            hosts: hosts.len(),
            connected: hosts
                .iter()
                .filter(|host| host.state() == Some(ConnectionState::Connected))
                .count(),
            active_sessions: hosts.iter().map(|host| host.active_sessions()).sum(),
        }
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Get the connector.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.inner.connector
    }
}

impl<C: Connector> Drop for SessionPool<C> {
    fn drop(&mut self) {
        if let Some(purger) = self.purger.take() {
            purger.abort();
        }
    }
}

fn spawn_purger<C: Connector>(pool: Weak<PoolInner<C>>, period: Duration) -> Option<JoinHandle<()>> {
    if period.is_zero() {
        return None;
    }
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("No tokio runtime; idle connections are only evicted by purge_idle()");
        return None;
    };

    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(pool) = pool.upgrade() else {
                break;
            };
            let evicted = pool.purge_idle().await;
            tracing::trace!(evicted, "Pool purge sweep");
        }
    }))
}
