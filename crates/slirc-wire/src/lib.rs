//! # slirc-wire
//!
//! The wire layer of the Straylight IRC client: everything needed to
//! turn an adversarial byte stream into material a protocol engine can
//! dispatch on, and to encode the handful of payloads (SASL, CTCP)
//! that have a format of their own.
//!
//! ## Features
//!
//! - `\r\n` line framing as a tokio codec (lossy UTF-8, never errors
//!   the connection on bad bytes)
//! - IRCv3 message-tag extraction and `server-time` parsing
//! - The `word[]` / `word_eol[]` token views consumed by dispatchers
//! - RFC 1459 / ASCII casemapping
//! - CTCP framing
//! - SASL mechanism selection and payload encoding, including the
//!   legacy DH-BLOWFISH / DH-AES mechanisms behind the `legacy-dh`
//!   feature
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_wire::tags::split_tags;
//! use slirc_wire::words::Words;
//!
//! let raw = "@time=2023-01-01T12:00:00Z :nick!u@h PRIVMSG #chan :hi there";
//! let (tags, rest) = split_tags(raw);
//! assert!(tags.is_some());
//!
//! let words = Words::split(rest);
//! assert_eq!(words.word(1), ":nick!u@h");
//! assert_eq!(words.word(2), "PRIVMSG");
//! assert_eq!(words.word_eol(4), ":hi there");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod ctcp;
pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod numeric;
pub mod sasl;
pub mod tags;
pub mod words;

pub use self::casemap::Casemap;
pub use self::ctcp::{Ctcp, CtcpKind};
pub use self::error::WireError;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::sasl::Mechanism;
pub use self::words::{Words, WordsOwned, WORD_LIMIT};

/// The protocol-recommended maximum length of an outbound line,
/// including the trailing `\r\n`.
pub const MAX_LINE_LEN: usize = 512;

/// Inbound lines up to this length are handled on the fast path;
/// longer lines are still accepted (some bouncers and ircds pad the
/// nominal 512-byte limit with tags or sloppy accounting).
pub const MAX_INBOUND_LEN: usize = 522;
