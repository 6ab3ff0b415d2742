//! Convenient re-exports for common repo-access usage.
//!
//! ```ignore
//! use repo_access::prelude::*;
//! ```

// Errors
pub use crate::error::{AccessError, ConnectError, ErrorCode, ProtocolError, Result};

// Configuration
pub use crate::config::{LogFormat, LoggingConfig, PoolConfig, RuntimeConfig};

// Pooling
pub use crate::auth::{AuthMethod, Credentials, HostKey, HostVerifier};
pub use crate::pool::{ConnectionTarget, Connector, HostConfig, Session, SessionPool, Transport};

// Discovery
pub use crate::dav::{
    Depth, PropertyBundle, PropertyFetcher, PropertyName, RepositoryContext, ResourceResolver,
    STARTING_PROPERTIES,
};
