//! repo-access: client runtime for remote version-control repositories
//!
//! This crate keeps authenticated connections to repository hosts pooled so
//! that repeated operations reuse an established link, and discovers the
//! starting properties (repository UUID, root, version-controlled
//! configuration) of arbitrary repository paths.
//!
//! # Features
//!
//! - **Connection pooling** keyed by host, port and principal, with
//!   deduplicated handshakes and background eviction of idle links
//! - **Starting-property discovery** that walks up unversioned path
//!   segments and caches results per repository context
//! - **SSH backend** built on russh (feature: `ssh`)
//! - **Mock connector and property server** for testing (feature: `mock`)
//!
//! # Example
//!
//! ```ignore
//! use repo_access::prelude::*;
//! use repo_access::ssh::{KnownHosts, SshConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let pool = SessionPool::with_defaults(SshConnector::new());
//!     let host = HostConfig::new("svn.example.com")
//!         .username("alice")
//!         .host_verifier(KnownHosts::default_location());
//!     let session = pool.open(&host).await?;
//!
//!     let resolver = ResourceResolver::new(MyFetcher::over(session));
//!     let mut ctx = RepositoryContext::new("svn+ssh://svn.example.com/repos/p/trunk/src");
//!     let props = resolver.resolve_starting_properties(&mut ctx, "/repos/p/trunk/src").await?;
//!     println!("root: {:?}, below: {}", ctx.root_url(), props.lopped_path());
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod dav;
pub mod error;
pub mod logging;
pub mod path;
pub mod pool;
pub mod prelude;

/// russh-backed connector.
#[cfg(feature = "ssh")]
pub mod ssh;

/// In-memory connector and property server for testing.
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use auth::{AuthMethod, Credentials, HostKey, HostVerifier, RejectAll};
#[cfg(feature = "insecure-skip-verify")]
pub use auth::AcceptAll;
pub use config::{LogFormat, LoggingConfig, PoolConfig, RuntimeConfig};
pub use dav::{
    Depth, PropertyBundle, PropertyCache, PropertyFetcher, PropertyName, RepositoryContext,
    ResourceResolver,
};
pub use error::{AccessError, ConnectError, ErrorCode, ProtocolError, Result};
pub use logging::init_logging;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockConnector, MockServer};
pub use pool::{
    ConnectionState, ConnectionTarget, Connector, HostConfig, PoolStats, Session, SessionPool,
    Transport,
};
#[cfg(feature = "ssh")]
pub use ssh::{KnownHosts, SshConnector};
