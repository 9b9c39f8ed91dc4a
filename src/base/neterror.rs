use std::{io, sync::Arc};
use thiserror::Error;

/// How a [`NetError`] should be treated by the owner of a resolver.
///
/// Every failure travels through the same completion channel; the kind tells
/// the channel whether to keep waiting, report the target as unreachable, or
/// treat the failure as a bug in its own use of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A single query failed; the backend will try again on its own.
    Transient,
    /// No further resolution is possible for this target.
    Fatal,
    /// The resolver was orphaned while a delivery was pending.
    Shutdown,
    /// The caller broke the calling contract (wrong thread, double request).
    ProtocolViolation,
}

#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Resolution errors
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("Name {domain} not resolved: {source}")]
    NameNotResolvedFor {
        domain: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Name resolution timed out for {domain}")]
    LookupTimedOut { domain: String },
    #[error("Invalid target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },
    #[error("No resolver registered for scheme {0:?}")]
    UnknownScheme(String),
    #[error("Subscription to {name} closed")]
    SubscriptionClosed { name: String },
    #[error("Invalid resolver configuration: {0}")]
    InvalidConfig(String),

    // Lifecycle errors
    #[error("Resolver shut down")]
    ResolverShutdown,
    #[error("Pending delivery dropped without a result")]
    DeliveryAbandoned,
    #[error("Serializer closed")]
    SerializerClosed,

    // Contract violations
    #[error("A delivery request is already pending")]
    NextAlreadyPending,
    #[error("Locked operation called outside the serializer")]
    NotOnSerializer,
    #[error("Locked operation re-entered while the resolver was busy")]
    ReentrantLockedCall,
}

impl NetError {
    /// Wraps an I/O failure from a lookup for `domain`.
    pub fn dns_failed(domain: impl Into<String>, source: io::Error) -> Self {
        NetError::NameNotResolvedFor { domain: domain.into(), source: Arc::new(source) }
    }

    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        NetError::InvalidTarget { target: target.into(), reason: reason.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::NameNotResolved
            | NetError::NameNotResolvedFor { .. }
            | NetError::LookupTimedOut { .. } => ErrorKind::Transient,
            NetError::InvalidTarget { .. }
            | NetError::UnknownScheme(_)
            | NetError::SubscriptionClosed { .. }
            | NetError::InvalidConfig(_)
            | NetError::DeliveryAbandoned
            | NetError::SerializerClosed => ErrorKind::Fatal,
            NetError::ResolverShutdown => ErrorKind::Shutdown,
            NetError::NextAlreadyPending
            | NetError::NotOnSerializer
            | NetError::ReentrantLockedCall => ErrorKind::ProtocolViolation,
        }
    }

    /// The RPC status code a channel reports when it surfaces this error.
    pub fn status_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Transient | ErrorKind::Fatal => match self {
                NetError::InvalidTarget { .. }
                | NetError::UnknownScheme(_)
                | NetError::InvalidConfig(_) => 3, // INVALID_ARGUMENT
                _ => 14, // UNAVAILABLE
            },
            ErrorKind::Shutdown => 1,           // CANCELLED
            ErrorKind::ProtocolViolation => 13, // INTERNAL
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
