//! One pooled connection target and its connection state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use super::session::{Activity, Lease, Session};
use super::target::{ConnectionTarget, HostConfig};
use super::transport::{Connector, Transport};
use crate::error::{AccessError, HostDisposed};

/// Observable state of a host connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No handshake has succeeded yet.
    Fresh,
    /// A transport is established.
    Connected,
    /// Retired; never used again.
    Disposed,
}

enum HostState<T> {
    Fresh,
    Connected(Arc<T>),
    Disposed,
}

impl<T> HostState<T> {
    const fn kind(&self) -> ConnectionState {
        match self {
            Self::Fresh => ConnectionState::Fresh,
            Self::Connected(_) => ConnectionState::Connected,
            Self::Disposed => ConnectionState::Disposed,
        }
    }
}

/// Why a session could not be opened.
#[derive(Debug)]
pub(crate) enum OpenError {
    /// The host was retired; the caller should look it up again.
    Disposed(HostDisposed),
    /// Handshake or channel failure.
    Failed(AccessError),
}

/// A single connection target in the pool.
///
/// Every state change happens under `state`; `disposed` mirrors the
/// terminal state so callers can fail fast without waiting for the lock.
pub(crate) struct HostConnection<T: Transport> {
    target: ConnectionTarget,
    config: HostConfig,
    connect_timeout: Duration,
    idle_timeout: Duration,
    state: Mutex<HostState<T>>,
    disposed: AtomicBool,
    activity: Arc<Activity>,
}

impl<T: Transport> HostConnection<T> {
    pub(crate) fn new(
        target: ConnectionTarget,
        config: HostConfig,
        connect_timeout: Duration,
        idle_timeout: Duration,
    ) -> Self {
        let activity = Arc::new(Activity::new());
        activity.touch();
        Self {
            target,
            config,
            connect_timeout,
            idle_timeout,
            state: Mutex::new(HostState::Fresh),
            disposed: AtomicBool::new(false),
            activity,
        }
    }

    pub(crate) const fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of live sessions over this connection.
    pub(crate) fn active_sessions(&self) -> usize {
        self.activity.sessions()
    }

    /// Current state, or `None` while a handshake or state change holds the lock.
    pub(crate) fn state(&self) -> Option<ConnectionState> {
        self.state.try_lock().ok().map(|state| state.kind())
    }

    /// Open a logical session, connecting first if needed.
    ///
    /// The first caller performs the handshake while holding the connection
    /// lock; concurrent callers wait on the lock and then reuse the link.
    pub(crate) async fn open_session<C>(&self, connector: &C) -> Result<Session<T>, OpenError>
    where
        C: Connector<Transport = T>,
    {
        if self.is_disposed() {
            return Err(OpenError::Disposed(HostDisposed));
        }

        let mut state = self.state.lock().await;
        let reusable = match &*state {
            HostState::Disposed => return Err(OpenError::Disposed(HostDisposed)),
            HostState::Connected(transport) if !transport.is_closed() => Some(Arc::clone(transport)),
            HostState::Connected(_) => {
                tracing::debug!(host = %self.target, "Pooled link closed, reconnecting");
                None
            }
            HostState::Fresh => None,
        };

        let transport = match reusable {
            Some(transport) => transport,
            None => {
                tracing::debug!(
                    host = %self.target,
                    timeout = ?self.connect_timeout,
                    "Establishing connection"
                );
                let transport = connector
                    .connect(&self.target, &self.config, self.connect_timeout)
                    .await
                    .map_err(OpenError::Failed)?;
                let transport = Arc::new(transport);
                *state = HostState::Connected(Arc::clone(&transport));
                tracing::info!(host = %self.target, "Connection established");
                transport
            }
        };

        // Leased under the lock so an eviction sweep cannot slip in between.
        let lease = Lease::acquire(&self.activity);
        drop(state);

        // Retired between the checkout and the channel reply: the channel is
        // dropped and the caller goes back through the pool.
        match transport.open_channel().await {
            _ if self.is_disposed() => Err(OpenError::Disposed(HostDisposed)),
            Ok(channel) => Ok(Session::new(channel, transport, self.target.clone(), lease)),
            Err(err) => Err(OpenError::Failed(err)),
        }
    }

    /// Retire this connection if it has been idle long enough.
    ///
    /// Returns `false` without waiting if a handshake is in progress, if
    /// any session is alive, or if the idle threshold has not passed.
    pub(crate) async fn purge(&self) -> bool {
        let Ok(mut state) = self.state.try_lock() else {
            return false;
        };
        if matches!(*state, HostState::Disposed)
            || self.activity.sessions() > 0
            || self.activity.idle_for() < self.idle_timeout
        {
            return false;
        }

        let previous = std::mem::replace(&mut *state, HostState::Disposed);
        self.disposed.store(true, Ordering::Release);
        drop(state);

        if let HostState::Connected(transport) = previous {
            transport.close().await;
        }
        true
    }

    /// Retire this connection unconditionally. Idempotent.
    pub(crate) async fn dispose(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            self.disposed.store(true, Ordering::Release);
            std::mem::replace(&mut *state, HostState::Disposed)
        };

        if let HostState::Connected(transport) = previous {
            transport.close().await;
        }
    }
}
