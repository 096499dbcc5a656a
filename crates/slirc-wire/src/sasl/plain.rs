//! PLAIN SASL mechanism (RFC 4616).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Encode credentials for the PLAIN mechanism.
///
/// The payload is `authzid NUL authcid NUL password`, with the
/// authorization identity filled in with the username (this client
/// has always sent `user\0user\0pass`, and some services packages
/// reject a change).
///
/// # Example
///
/// ```
/// use slirc_wire::sasl::encode_plain;
///
/// let encoded = encode_plain("bob", "hunter2");
/// // Decodes to: "bob\0bob\0hunter2"
/// assert!(!encoded.is_empty());
/// ```
pub fn encode_plain(username: &str, password: &str) -> String {
    let payload = format!("{}\0{}\0{}", username, username, password);
    BASE64.encode(payload.as_bytes())
}
