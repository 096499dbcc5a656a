//! Error types for the client core.
//!
//! Note what is *not* here: malformed protocol input. The inbound
//! choke point degrades bad lines to a `Garbage` event instead of
//! returning errors, so only configuration and transport problems
//! surface as `Err` values.

use thiserror::Error;

use crate::server::ServerId;

/// Convenience type alias for Results using [`CoreError`].
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Top-level client-core errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Failed to read a preferences file.
    #[error("failed to read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Failed to parse a preferences file.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An operation referenced a server that no longer exists.
    #[error("unknown server id {0:?}")]
    UnknownServer(ServerId),

    /// The transport reported a failure; surfaced to the reconnect
    /// policy, never retried inside the core.
    #[error("transport failure: {0}")]
    Transport(String),
}
