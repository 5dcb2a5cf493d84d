//! Inspector errors

/// Attach error
#[derive(Debug, thiserror::Error)]
pub enum InspectorError {
    #[error("Host exposes no entry points to intercept")]
    NothingToIntercept,
}

/// None of the known host API shapes matched at attach time.
///
/// Not fatal: native lookups are disabled, tree operations keep flowing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported host: no native-tag registry, instance tree or legacy mount found")]
pub struct UnsupportedHost;

/// Failure raised by a host while resolving a native handle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostLookupError {
    #[error("Unknown host key: {0}")]
    UnknownKey(String),

    #[error("Native node detached: {0}")]
    Detached(String),
}
