//! Logical sessions handed out by the pool.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use super::target::ConnectionTarget;
use super::transport::Transport;

/// Usage bookkeeping shared between a host connection and its sessions.
#[derive(Debug)]
pub(crate) struct Activity {
    epoch: Instant,
    sessions: AtomicUsize,
    /// Milliseconds since `epoch` at the last checkout or release.
    last_used: AtomicU64,
}

impl Activity {
    pub(crate) fn new() -> Self {
        Self {
            epoch: Instant::now(),
            sessions: AtomicUsize::new(0),
            last_used: AtomicU64::new(0),
        }
    }

    pub(crate) fn touch(&self) {
        let now = self.epoch.elapsed().as_millis() as u64;
        self.last_used.store(now, Ordering::Relaxed);
    }

    pub(crate) fn sessions(&self) -> usize {
        self.sessions.load(Ordering::Acquire)
    }

    pub(crate) fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_used.load(Ordering::Relaxed));
        self.epoch.elapsed().saturating_sub(last)
    }
}

/// Keeps its host connection marked as in use until dropped.
#[derive(Debug)]
pub(crate) struct Lease {
    activity: Arc<Activity>,
}

impl Lease {
    pub(crate) fn acquire(activity: &Arc<Activity>) -> Self {
        activity.sessions.fetch_add(1, Ordering::AcqRel);
        activity.touch();
        Self {
            activity: Arc::clone(activity),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.activity.touch();
        self.activity.sessions.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A logical channel to a pooled host.
///
/// The session shares the host's physical link with every other session to
/// the same target. While it is alive the host connection counts as busy
/// and will not be evicted.
pub struct Session<T: Transport> {
    channel: T::Channel,
    transport: Arc<T>,
    target: ConnectionTarget,
    _lease: Lease,
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.target)
            .field("closed", &self.transport.is_closed())
            .finish()
    }
}

impl<T: Transport> Session<T> {
    pub(crate) fn new(
        channel: T::Channel,
        transport: Arc<T>,
        target: ConnectionTarget,
        lease: Lease,
    ) -> Self {
        Self {
            channel,
            transport,
            target,
            _lease: lease,
        }
    }

    /// The target this session is connected to.
    #[must_use]
    pub const fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// The logical channel.
    #[must_use]
    pub const fn channel(&self) -> &T::Channel {
        &self.channel
    }

    /// Mutable access to the logical channel.
    pub fn channel_mut(&mut self) -> &mut T::Channel {
        &mut self.channel
    }

    /// Whether the underlying link has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }
}
