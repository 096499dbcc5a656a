//! CTCP (Client-to-Client Protocol) framing.
//!
//! CTCP requests and replies travel inside PRIVMSG/NOTICE bodies
//! framed by `\x01`. The engine answers a handful of built-ins
//! (VERSION, PING, SOUND, DCC hand-off) and a user-configurable reply
//! table; this module only recognizes and splits the framing.
//!
//! # Reference
//! - CTCP specification: <https://modern.ircdocs.horse/ctcp.html>

use std::fmt;

/// The CTCP delimiter character (`\x01`).
pub const CTCP_DELIM: char = '\x01';

/// Known CTCP command types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CtcpKind {
    /// ACTION - an emote, displayed rather than answered.
    Action,
    /// VERSION - client version request.
    Version,
    /// PING - round-trip latency probe.
    Ping,
    /// TIME - local time request.
    Time,
    /// SOUND - play a named sound file (legacy mIRC extension).
    Sound,
    /// DCC - Direct Client-to-Client hand-off.
    Dcc,
    /// CLIENTINFO - list of supported CTCP commands.
    Clientinfo,
    /// Unknown or user-defined CTCP command.
    Unknown(String),
}

impl CtcpKind {
    /// Parse a CTCP command name.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "ACTION" => Self::Action,
            "VERSION" => Self::Version,
            "PING" => Self::Ping,
            "TIME" => Self::Time,
            "SOUND" => Self::Sound,
            "DCC" => Self::Dcc,
            "CLIENTINFO" => Self::Clientinfo,
            _ => Self::Unknown(name.to_ascii_uppercase()),
        }
    }

    /// The canonical uppercase name of this command.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "ACTION",
            Self::Version => "VERSION",
            Self::Ping => "PING",
            Self::Time => "TIME",
            Self::Sound => "SOUND",
            Self::Dcc => "DCC",
            Self::Clientinfo => "CLIENTINFO",
            Self::Unknown(s) => s,
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed CTCP message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// The CTCP command type.
    pub kind: CtcpKind,
    /// Parameters following the command, if any.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse a CTCP message from a PRIVMSG/NOTICE body.
    ///
    /// Returns `None` when the body is not CTCP-framed. A missing
    /// trailing delimiter is tolerated (some clients omit it).
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.strip_prefix(CTCP_DELIM)?;
        let text = text.strip_suffix(CTCP_DELIM).unwrap_or(text);
        if text.is_empty() {
            return None;
        }
        let (command, params) = match text.find(' ') {
            Some(pos) => {
                let rest = &text[pos + 1..];
                (&text[..pos], (!rest.is_empty()).then_some(rest))
            }
            None => (text, None),
        };
        Some(Self {
            kind: CtcpKind::parse(command),
            params,
        })
    }

    /// Check whether a message body carries CTCP framing.
    #[inline]
    pub fn is_ctcp(text: &str) -> bool {
        text.starts_with(CTCP_DELIM)
    }
}

impl fmt::Display for Ctcp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\x01{}", self.kind)?;
        if let Some(params) = self.params {
            write!(f, " {}", params)?;
        }
        write!(f, "\x01")
    }
}

/// Frame arbitrary text as a CTCP body: `\x01text\x01`.
pub fn frame(text: &str) -> String {
    format!("\x01{}\x01", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let c = Ctcp::parse("\x01VERSION\x01").unwrap();
        assert_eq!(c.kind, CtcpKind::Version);
        assert_eq!(c.params, None);
    }

    #[test]
    fn test_parse_action() {
        let c = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
        assert_eq!(c.kind, CtcpKind::Action);
        assert_eq!(c.params, Some("waves hello"));
    }

    #[test]
    fn test_parse_case_insensitive() {
        let c = Ctcp::parse("\x01sound boom.wav\x01").unwrap();
        assert_eq!(c.kind, CtcpKind::Sound);
    }

    #[test]
    fn test_missing_trailing_delim() {
        let c = Ctcp::parse("\x01DCC SEND f 1 2 3").unwrap();
        assert_eq!(c.kind, CtcpKind::Dcc);
        assert_eq!(c.params, Some("SEND f 1 2 3"));
    }

    #[test]
    fn test_not_ctcp() {
        assert!(Ctcp::parse("hello").is_none());
        assert!(Ctcp::parse("").is_none());
        assert!(Ctcp::parse("\x01\x01").is_none());
    }

    #[test]
    fn test_unknown_uppercased() {
        let c = Ctcp::parse("\x01slap target\x01").unwrap();
        assert_eq!(c.kind, CtcpKind::Unknown("SLAP".into()));
    }

    #[test]
    fn test_display_roundtrip() {
        let raw = "\x01PING 12345\x01";
        assert_eq!(Ctcp::parse(raw).unwrap().to_string(), raw);
    }

    #[test]
    fn test_frame() {
        assert_eq!(frame("VERSION x 1.0"), "\x01VERSION x 1.0\x01");
    }
}
