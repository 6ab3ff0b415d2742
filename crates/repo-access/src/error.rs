//! Error types for repo-access.
//!
//! Connection failures, server-reported protocol failures and the two
//! discovery failures of the resolver each keep their classification and
//! the path/label they were raised for, so callers can render precise
//! diagnostics or decide on their own retry policy.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Classification codes reported by the remote server.
///
/// The numeric values match the codes the server puts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// The requested resource does not exist.
    NotFound,
    /// A request failed for a reason other than a missing resource.
    RequestFailed,
    /// The OPTIONS exchange did not yield the expected data.
    OptionsRequestFailed,
}

impl ErrorCode {
    /// Numeric wire code.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::NotFound => 160_013,
            Self::RequestFailed => 175_002,
            Self::OptionsRequestFailed => 175_003,
        }
    }

    /// Look up a code by its numeric wire value.
    #[must_use]
    pub const fn from_u32(code: u32) -> Option<Self> {
        match code {
            160_013 => Some(Self::NotFound),
            175_002 => Some(Self::RequestFailed),
            175_003 => Some(Self::OptionsRequestFailed),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.as_u32())
    }
}

/// Substitute positional `{N}` placeholders in a message template.
///
/// Placeholders without a matching argument are left untouched.
#[must_use]
pub fn format_template(template: &str, args: &[&dyn fmt::Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg.to_string(), close))
        });
        match substituted {
            Some((value, close)) => {
                out.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// A structured failure reported by the remote server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProtocolError {
    code: ErrorCode,
    message: String,
    #[source]
    cause: Option<Box<ProtocolError>>,
}

impl ProtocolError {
    /// Create an error with a literal message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Create an error from a template with positional substitutions.
    ///
    /// ```
    /// use repo_access::error::{ErrorCode, ProtocolError};
    ///
    /// let err = ProtocolError::with_args(
    ///     ErrorCode::RequestFailed,
    ///     "Failed to find label '{0}' for URL '{1}'",
    ///     &[&"NULL", &"/repo/trunk"],
    /// );
    /// assert_eq!(err.to_string(), "Failed to find label 'NULL' for URL '/repo/trunk'");
    /// ```
    #[must_use]
    pub fn with_args(code: ErrorCode, template: &str, args: &[&dyn fmt::Display]) -> Self {
        Self::new(code, format_template(template, args))
    }

    /// Shorthand for a "not found" error naming a path.
    pub fn not_found(path: impl AsRef<str>) -> Self {
        Self::with_args(
            ErrorCode::NotFound,
            "Path '{0}' not found",
            &[&path.as_ref()],
        )
    }

    /// Attach the error that caused this one.
    #[must_use]
    pub fn caused_by(mut self, cause: Self) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// The classification code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// The rendered message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&Self> {
        self.cause.as_deref()
    }
}

/// Errors raised while establishing a transport or opening a channel.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Connection failed.
    #[error("failed to connect to {host}:{port}: {reason}")]
    Connection {
        /// The host that could not be connected to.
        host: String,
        /// The port that was used.
        port: u16,
        /// The reason for the failure.
        reason: String,
    },

    /// Authentication failed.
    #[error("authentication failed for user '{user}': {reason}")]
    Authentication {
        /// The user that failed to authenticate.
        user: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Host key verification failed.
    #[error("host key verification failed for {host}: {reason}")]
    HostKeyVerification {
        /// The host whose key verification failed.
        host: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Channel error.
    #[error("channel error: {reason}")]
    Channel {
        /// The reason for the channel error.
        reason: String,
    },

    /// The handshake did not finish within the connect timeout.
    #[error("connection timed out after {duration:?}")]
    Timeout {
        /// The duration that elapsed.
        duration: Duration,
    },
}

impl ConnectError {
    /// Create a connection error.
    pub fn connection(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(user: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authentication {
            user: user.into(),
            reason: reason.into(),
        }
    }

    /// Create a host key verification error.
    pub fn host_key_verification(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HostKeyVerification {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Create a channel error.
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::Channel {
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub const fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }
}

/// The main error type for repo-access operations.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Handshake or transport failure.
    #[error("connection error: {0}")]
    Connect(#[from] ConnectError),

    /// The server returned no resource for a path/label.
    #[error("Failed to find label '{}' for URL '{path}'", .label.as_deref().unwrap_or("NULL"))]
    PropertyNotFound {
        /// The requested path.
        path: String,
        /// The requested label, if any.
        label: Option<String>,
    },

    /// The upward path walk ran out of ancestors.
    #[error("The path was not part of repository")]
    NotPartOfRepository {
        /// The path the walk started from.
        path: String,
        /// The error returned for the last ancestor tried.
        #[source]
        source: ProtocolError,
    },

    /// Any other server-reported failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for repo-access operations.
pub type Result<T> = std::result::Result<T, AccessError>;

impl AccessError {
    /// Create a property-not-found error.
    pub fn property_not_found(path: impl Into<String>, label: Option<&str>) -> Self {
        Self::PropertyNotFound {
            path: path.into(),
            label: label.map(str::to_owned),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// The server classification of this error, if it carries one.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::PropertyNotFound { .. } => Some(ErrorCode::RequestFailed),
            Self::NotPartOfRepository { source, .. } => Some(source.code()),
            Self::Protocol(err) => Some(err.code()),
            _ => None,
        }
    }

    /// Check if the server reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Protocol(err) if matches!(err.code(), ErrorCode::NotFound))
    }
}

/// Raised by a disposed host connection; consumed by the pool, which retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("host connection has been disposed")]
pub(crate) struct HostDisposed;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_substitution() {
        let msg = format_template("a '{0}' b '{1}' c", &[&"x", &42]);
        assert_eq!(msg, "a 'x' b '42' c");
    }

    #[test]
    fn template_keeps_unmatched_placeholders() {
        assert_eq!(format_template("{0} {5} {x}", &[&"a"]), "a {5} {x}");
        assert_eq!(format_template("open { only", &[]), "open { only");
    }

    #[test]
    fn property_not_found_renders_null_label() {
        let err = AccessError::property_not_found("/repo/trunk", None);
        assert_eq!(
            err.to_string(),
            "Failed to find label 'NULL' for URL '/repo/trunk'"
        );
        assert_eq!(err.code(), Some(ErrorCode::RequestFailed));

        let err = AccessError::property_not_found("/repo", Some("HEAD"));
        assert_eq!(err.to_string(), "Failed to find label 'HEAD' for URL '/repo'");
    }

    #[test]
    fn not_part_of_repository_keeps_cause() {
        use std::error::Error as _;

        let err = AccessError::NotPartOfRepository {
            path: "/x".into(),
            source: ProtocolError::not_found("/"),
        };
        assert_eq!(err.code(), Some(ErrorCode::NotFound));
        assert!(!err.is_not_found());
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("Path '/' not found"));
    }

    #[test]
    fn protocol_error_chain() {
        let inner = ProtocolError::not_found("/a");
        let outer = ProtocolError::new(ErrorCode::RequestFailed, "outer").caused_by(inner.clone());
        assert_eq!(outer.cause(), Some(&inner));
        assert!(AccessError::from(inner).is_not_found());
    }

    #[test]
    fn error_code_wire_values() {
        for code in [
            ErrorCode::NotFound,
            ErrorCode::RequestFailed,
            ErrorCode::OptionsRequestFailed,
        ] {
            assert_eq!(ErrorCode::from_u32(code.as_u32()), Some(code));
        }
        assert_eq!(ErrorCode::NotFound.to_string(), "E160013");
        assert_eq!(ErrorCode::from_u32(1), None);
    }
}
