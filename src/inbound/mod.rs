//! Inbound line dispatch.
//!
//! `inline` is the single entry point the transport calls per
//! received line. It must be panic-free for any byte sequence:
//! malformed lines degrade to a `Garbage` display event, never an
//! error or a dropped connection.

mod cap;
mod ctcp;
mod named;
mod numeric;

use slirc_wire::{tags, Casemap, Words};
use tracing::trace;

use crate::engine::Engine;
use crate::server::ServerId;

/// Strip the leading `:` from a trailing parameter, if present.
pub(crate) fn strip_colon(s: &str) -> &str {
    s.strip_prefix(':').unwrap_or(s)
}

/// Split a `nick!user@host` prefix into (nick, user@host).
pub(crate) fn split_prefix(prefix: &str) -> (&str, &str) {
    match prefix.split_once('!') {
        Some((nick, host)) => (nick, host),
        None => (prefix, ""),
    }
}

/// Whether `text` mentions `nick` as a standalone word.
pub(crate) fn mentions_nick(text: &str, nick: &str, casemap: Casemap) -> bool {
    if nick.is_empty() {
        return false;
    }
    let folded = casemap.lower(text);
    let needle = casemap.lower(nick);
    let mut start = 0;
    while let Some(pos) = folded[start..].find(&needle) {
        let abs = start + pos;
        let before_ok = abs == 0
            || !folded[..abs]
                .chars()
                .next_back()
                .map_or(false, |c| c.is_alphanumeric());
        let after = abs + needle.len();
        let after_ok = after >= folded.len()
            || !folded[after..]
                .chars()
                .next()
                .map_or(false, |c| c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = abs + needle.len();
    }
    false
}

impl Engine {
    /// Process one inbound line. Unknown servers are a silent no-op
    /// (the connection may have been torn down under us).
    pub fn inline(&mut self, server: ServerId, raw: &str) {
        let Some(srv) = self.servers.get(&server) else {
            return;
        };
        trace!(server = server.0, line = %raw, "inbound");

        let (tag_str, rest) = tags::split_tags(raw);
        let ts = match tag_str {
            Some(t) if srv.caps.have_server_time => tags::server_time(t),
            _ => 0,
        };

        if let Some(prefixed) = rest.strip_prefix(':') {
            let words = Words::split(prefixed);
            let command = words.word(2);
            if command.is_empty() {
                self.garbage(server, raw, ts);
            } else if let Ok(code) = command.parse::<u16>() {
                self.process_numeric(server, code, &words, ts);
            } else {
                self.process_named_msg(server, &words, ts);
            }
        } else {
            let words = Words::split(rest);
            if words.word(1).is_empty() {
                self.garbage(server, raw, ts);
            } else {
                self.process_named_servermsg(server, &words, ts);
            }
        }
    }

    fn garbage(&mut self, server: ServerId, raw: &str, ts: i64) {
        self.emit_console(server, crate::event::EventKind::Garbage, &[raw], ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_colon() {
        assert_eq!(strip_colon(":hello there"), "hello there");
        assert_eq!(strip_colon("hello"), "hello");
    }

    #[test]
    fn test_split_prefix() {
        assert_eq!(split_prefix("nick!u@h"), ("nick", "u@h"));
        assert_eq!(split_prefix("irc.example.net"), ("irc.example.net", ""));
    }

    #[test]
    fn test_mentions_nick() {
        let cm = Casemap::Rfc1459;
        assert!(mentions_nick("hey Bob, you there?", "bob", cm));
        assert!(mentions_nick("bob: hi", "bob", cm));
        assert!(!mentions_nick("bobcat is an animal", "bob", cm));
        assert!(!mentions_nick("no mention here", "bob", cm));
        assert!(mentions_nick("ping bob", "BOB", cm));
    }
}
