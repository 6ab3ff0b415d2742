//! The seam between the pool and a concrete wire protocol.
//!
//! A [`Connector`] performs the (expensive) handshake for a target and
//! yields a [`Transport`]; the transport multiplexes any number of logical
//! channels over the one physical link it owns.

use std::future::Future;
use std::time::Duration;

use super::target::{ConnectionTarget, HostConfig};
use crate::error::Result;

/// An established, authenticated physical link.
pub trait Transport: Send + Sync + 'static {
    /// A logical channel multiplexed over this link.
    type Channel: Send + 'static;

    /// Open a new logical channel.
    fn open_channel(&self) -> impl Future<Output = Result<Self::Channel>> + Send;

    /// Whether the peer or the network closed the link.
    fn is_closed(&self) -> bool;

    /// Close the link. Must be safe to call more than once.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Establishes transports.
pub trait Connector: Send + Sync + 'static {
    /// The transport this connector produces.
    type Transport: Transport;

    /// Connect, verify the server and authenticate within `timeout`.
    fn connect(
        &self,
        target: &ConnectionTarget,
        config: &HostConfig,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}
