//! IRCv3 message-tag extraction.
//!
//! Tags arrive as an `@key=value;key2;key3=value3 ` prefix ahead of
//! the normal line. Unknown keys are tolerated and ignored; the only
//! tag the client core currently acts on is `time` (server-time).
//!
//! # Reference
//! - Message tags: <https://ircv3.net/specs/extensions/message-tags>
//! - server-time: <https://ircv3.net/specs/extensions/server-time>

use std::borrow::Cow;

/// Split an inbound line into its raw tag string and the remainder.
///
/// Returns `(Some(tags), rest)` when the line begins with `@`, where
/// `tags` excludes the leading `@`. A tag prefix with no following
/// space yields an empty remainder rather than an error.
///
/// # Example
///
/// ```
/// use slirc_wire::tags::split_tags;
///
/// let (tags, rest) = split_tags("@time=2023-01-01T00:00:00Z :srv PING");
/// assert_eq!(tags, Some("time=2023-01-01T00:00:00Z"));
/// assert_eq!(rest, ":srv PING");
///
/// let (tags, rest) = split_tags(":srv PING");
/// assert_eq!(tags, None);
/// assert_eq!(rest, ":srv PING");
/// ```
pub fn split_tags(line: &str) -> (Option<&str>, &str) {
    let Some(tagged) = line.strip_prefix('@') else {
        return (None, line);
    };
    match tagged.split_once(' ') {
        Some((tags, rest)) => (Some(tags), rest.trim_start_matches(' ')),
        None => (Some(tagged), ""),
    }
}

/// Look up a tag value by key in a raw tag string.
///
/// Keys without `=` report an empty value. The value is returned with
/// IRCv3 escapes resolved.
pub fn tag_value<'a>(tags: &'a str, key: &str) -> Option<Cow<'a, str>> {
    for tag in tags.split(';') {
        match tag.split_once('=') {
            Some((k, v)) if k == key => return Some(unescape_value(v)),
            None if tag == key => return Some(Cow::Borrowed("")),
            _ => {}
        }
    }
    None
}

/// Resolve the IRCv3 tag-value escapes (`\:` `\s` `\\` `\r` `\n`).
///
/// A trailing lone backslash and unknown escapes drop the backslash,
/// per the IRCv3 message-tags error tolerance.
pub fn unescape_value(value: &str) -> Cow<'_, str> {
    if !value.contains('\\') {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Cow::Owned(out)
}

/// Parse a `time=` tag value into seconds since the Unix epoch.
///
/// Accepts the standard ISO-8601 form with a trailing `Z`
/// (`2011-10-19T16:40:51.620Z`, sub-second precision dropped) and the
/// raw decimal unix-timestamp form some bouncers emit. Returns 0 when
/// the value does not parse; consumers treat 0 as "now".
pub fn parse_server_time(raw: &str) -> i64 {
    if raw.is_empty() {
        return 0;
    }
    // Bouncer legacy format: plain unix timestamp.
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse().unwrap_or(0);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

/// Extract the server-time of a raw tag string, or 0.
pub fn server_time(tags: &str) -> i64 {
    tag_value(tags, "time")
        .map(|v| parse_server_time(&v))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tags_basic() {
        let (tags, rest) = split_tags("@a=1;b :srv 001 me :hi");
        assert_eq!(tags, Some("a=1;b"));
        assert_eq!(rest, ":srv 001 me :hi");
    }

    #[test]
    fn test_split_tags_no_remainder() {
        let (tags, rest) = split_tags("@a=1");
        assert_eq!(tags, Some("a=1"));
        assert_eq!(rest, "");
    }

    #[test]
    fn test_tag_value() {
        assert_eq!(tag_value("time=123;account=x", "time").unwrap(), "123");
        assert_eq!(tag_value("time=123;account=x", "account").unwrap(), "x");
        assert_eq!(tag_value("bot;time=1", "bot").unwrap(), "");
        assert!(tag_value("time=1", "msgid").is_none());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_value(r"a\:b\s\\c"), "a;b \\c");
        assert_eq!(unescape_value(r"trailing\"), "trailing");
        assert_eq!(unescape_value(r"\x"), "x");
        // No-escape fast path borrows
        assert!(matches!(unescape_value("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_server_time_iso() {
        // 2011-10-19T16:40:51.620Z, sub-second dropped
        assert_eq!(parse_server_time("2011-10-19T16:40:51.620Z"), 1319042451);
        assert_eq!(parse_server_time("2011-10-19T16:40:51Z"), 1319042451);
    }

    #[test]
    fn test_server_time_unix() {
        assert_eq!(parse_server_time("1319042451"), 1319042451);
    }

    #[test]
    fn test_server_time_garbage() {
        assert_eq!(parse_server_time("yesterday"), 0);
        assert_eq!(parse_server_time(""), 0);
        assert_eq!(parse_server_time("2011-13-45T99:00:00Z"), 0);
    }

    #[test]
    fn test_server_time_of_tags() {
        assert_eq!(server_time("msgid=x;time=1319042451"), 1319042451);
        assert_eq!(server_time("msgid=x"), 0);
    }
}
