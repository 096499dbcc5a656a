//! SASL authentication helpers.
//!
//! Mechanism selection and payload encoding for the CAP/AUTHENTICATE
//! exchange. PLAIN and EXTERNAL follow the published standards; the
//! DH-AES and DH-BLOWFISH mechanisms are this client's own legacy
//! scheme, preserved for interop with existing deployments behind the
//! `legacy-dh` feature.
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

#[cfg(feature = "legacy-dh")]
pub mod dh;
mod plain;

pub use plain::encode_plain;

/// Maximum length of a single AUTHENTICATE payload chunk.
///
/// Longer responses (the DH mechanisms can exceed this with large
/// primes) must be split across multiple AUTHENTICATE commands.
pub const SASL_CHUNK_SIZE: usize = 400;

/// A SASL mechanism, ordered weakest to strongest within the
/// password-based ladder. EXTERNAL sits outside the ladder: it is
/// chosen only when a client certificate is loaded and has no
/// password fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Mechanism {
    /// PLAIN (RFC 4616).
    Plain,
    /// Legacy Diffie-Hellman + Blowfish-ECB.
    DhBlowfish,
    /// Legacy Diffie-Hellman + AES-CBC.
    DhAes,
    /// EXTERNAL (TLS client certificate).
    External,
}

impl Mechanism {
    /// Parse a mechanism name. Returns `None` for mechanisms this
    /// client cannot drive.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "DH-BLOWFISH" => Some(Self::DhBlowfish),
            "DH-AES" => Some(Self::DhAes),
            "EXTERNAL" => Some(Self::External),
            _ => None,
        }
    }

    /// The on-the-wire mechanism name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::DhBlowfish => "DH-BLOWFISH",
            Self::DhAes => "DH-AES",
            Self::External => "EXTERNAL",
        }
    }

    /// Whether this build can actually produce payloads for the
    /// mechanism.
    pub fn is_supported(self) -> bool {
        match self {
            Self::Plain | Self::External => true,
            Self::DhBlowfish | Self::DhAes => cfg!(feature = "legacy-dh"),
        }
    }

    /// Position in the downgrade ladder; higher is stronger.
    pub fn tier(self) -> u8 {
        match self {
            Self::Plain => 0,
            Self::DhBlowfish => 1,
            Self::DhAes => 2,
            Self::External => 3,
        }
    }

    /// Step down exactly one tier toward PLAIN.
    ///
    /// Selection never steps back up within one connection attempt;
    /// EXTERNAL has no fallback (a certificate failure is not
    /// recoverable with a password retry).
    pub fn step_down(self) -> Option<Self> {
        match self {
            Self::DhAes => Some(Self::DhBlowfish),
            Self::DhBlowfish => Some(Self::Plain),
            Self::Plain | Self::External => None,
        }
    }

    /// The strongest password-based mechanism this build supports.
    pub fn strongest_password_mech() -> Self {
        if cfg!(feature = "legacy-dh") {
            Self::DhAes
        } else {
            Self::Plain
        }
    }
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a comma-separated mechanism list (the `RPL_SASLMECHS` form,
/// also sent by some servers in place of a challenge). Unsupported
/// names are dropped.
pub fn parse_mechanisms(list: &str) -> Vec<Mechanism> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(Mechanism::parse)
        .filter(|m| m.is_supported())
        .collect()
}

/// Choose the strongest supported password mechanism from an
/// advertised list, clamped so selection never exceeds `ceiling`
/// (mechanism downgrade must stay monotonic within one attempt).
pub fn choose_from(available: &[Mechanism], ceiling: Mechanism) -> Option<Mechanism> {
    available
        .iter()
        .copied()
        .filter(|m| *m != Mechanism::External)
        .filter(|m| m.tier() <= ceiling.tier())
        .max_by_key(|m| m.tier())
}

/// Decode a base64 AUTHENTICATE payload. `+` means empty.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if encoded == "+" {
        return Ok(Vec::new());
    }
    BASE64.decode(encoded)
}

/// Split an encoded response into AUTHENTICATE-sized chunks.
pub fn chunk_response(encoded: &str) -> impl Iterator<Item = &str> {
    encoded.as_bytes().chunks(SASL_CHUNK_SIZE).map(|chunk| {
        // base64 output is always ASCII
        std::str::from_utf8(chunk).unwrap_or("")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known() {
        assert_eq!(Mechanism::parse("plain"), Some(Mechanism::Plain));
        assert_eq!(Mechanism::parse("DH-AES"), Some(Mechanism::DhAes));
        assert_eq!(Mechanism::parse("dh-blowfish"), Some(Mechanism::DhBlowfish));
        assert_eq!(Mechanism::parse("EXTERNAL"), Some(Mechanism::External));
        assert_eq!(Mechanism::parse("SCRAM-SHA-256"), None);
    }

    #[test]
    fn test_step_down_ladder() {
        assert_eq!(Mechanism::DhAes.step_down(), Some(Mechanism::DhBlowfish));
        assert_eq!(Mechanism::DhBlowfish.step_down(), Some(Mechanism::Plain));
        assert_eq!(Mechanism::Plain.step_down(), None);
        assert_eq!(Mechanism::External.step_down(), None);
    }

    #[test]
    fn test_parse_mechanism_list() {
        let mechs = parse_mechanisms("PLAIN,DH-BLOWFISH,ECDSA-NIST256P-CHALLENGE");
        assert!(mechs.contains(&Mechanism::Plain));
        #[cfg(feature = "legacy-dh")]
        assert!(mechs.contains(&Mechanism::DhBlowfish));
        assert_eq!(mechs.iter().filter(|m| m.tier() > 2).count(), 0);
    }

    #[test]
    fn test_choose_respects_ceiling() {
        let avail = vec![Mechanism::Plain, Mechanism::DhAes, Mechanism::DhBlowfish];
        assert_eq!(
            choose_from(&avail, Mechanism::DhBlowfish),
            Some(Mechanism::DhBlowfish)
        );
        assert_eq!(choose_from(&avail, Mechanism::Plain), Some(Mechanism::Plain));
        assert_eq!(choose_from(&avail, Mechanism::DhAes), Some(Mechanism::DhAes));
    }

    #[test]
    fn test_choose_skips_external() {
        let avail = vec![Mechanism::External];
        assert_eq!(choose_from(&avail, Mechanism::DhAes), None);
    }

    #[test]
    fn test_decode_base64_plus() {
        assert!(decode_base64("+").unwrap().is_empty());
        assert_eq!(decode_base64("aGk=").unwrap(), b"hi");
    }

    #[test]
    fn test_chunking() {
        let long = "A".repeat(900);
        let chunks: Vec<_> = chunk_response(&long).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 400);
        assert_eq!(chunks[2].len(), 100);
    }
}
