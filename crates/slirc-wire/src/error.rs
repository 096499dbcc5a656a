//! Error types for the wire layer.

use thiserror::Error;

/// Convenience type alias for Results using [`WireError`].
pub type Result<T, E = WireError> = std::result::Result<T, E>;

/// Top-level wire errors.
///
/// Malformed protocol input is deliberately *not* represented here:
/// the client core degrades bad lines to a displayed event instead of
/// erroring the connection, so only transport-level failures surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WireError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the legacy Diffie-Hellman SASL key exchange.
///
/// Every variant is fail-closed: the caller must abort the SASL
/// round (`AUTHENTICATE *`) rather than transmit a partial credential.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DhError {
    /// The server's challenge was not valid base64.
    #[error("challenge is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The challenge ended before a length-prefixed field was complete.
    #[error("short buffer while reading DH parameters")]
    ShortBuffer,

    /// A DH parameter had an unusable value (zero prime, oversized key).
    #[error("invalid DH parameter: {0}")]
    InvalidParameter(&'static str),
}
