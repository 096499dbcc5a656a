//! IRC case-mapping functions.
//!
//! IRC comparison is case-insensitive with a twist: under the
//! `rfc1459` mapping some punctuation characters are considered
//! equivalent (e.g. `[` and `{`). Servers advertise their mapping via
//! `ISUPPORT CASEMAPPING`; channel and nick lookups must use the
//! negotiated mapping of the server that owns them.

/// A negotiated case mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Casemap {
    /// RFC 1459 mapping: ASCII plus `[]\~` == `{}|^`. The default.
    #[default]
    Rfc1459,
    /// Plain ASCII mapping.
    Ascii,
}

impl Casemap {
    /// Parse an `ISUPPORT CASEMAPPING=` value. Unknown values fall
    /// back to `rfc1459`, the behavior of most deployed clients.
    pub fn from_isupport(value: &str) -> Self {
        if value.eq_ignore_ascii_case("ascii") {
            Casemap::Ascii
        } else {
            Casemap::Rfc1459
        }
    }

    /// Lowercase a single character under this mapping.
    #[inline]
    pub const fn lower_char(self, c: char) -> char {
        match (self, c) {
            (Casemap::Rfc1459, '[') => '{',
            (Casemap::Rfc1459, ']') => '}',
            (Casemap::Rfc1459, '\\') => '|',
            (Casemap::Rfc1459, '~') => '^',
            (_, 'A'..='Z') => (c as u8 + 32) as char,
            _ => c,
        }
    }

    /// Lowercase a string under this mapping.
    pub fn lower(self, s: &str) -> String {
        s.chars().map(|c| self.lower_char(c)).collect()
    }

    /// Compare two strings case-insensitively under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.chars()
            .zip(b.chars())
            .all(|(ca, cb)| self.lower_char(ca) == self.lower_char(cb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc1459_specials() {
        let cm = Casemap::Rfc1459;
        assert_eq!(cm.lower("#Chan[1]~"), "#chan{1}^");
        assert!(cm.eq("nick\\away", "NICK|AWAY"));
    }

    #[test]
    fn test_ascii_leaves_specials() {
        let cm = Casemap::Ascii;
        assert_eq!(cm.lower("#Chan[1]"), "#chan[1]");
        assert!(!cm.eq("a[b", "a{b"));
        assert!(cm.eq("Hello", "hELLO"));
    }

    #[test]
    fn test_from_isupport() {
        assert_eq!(Casemap::from_isupport("ascii"), Casemap::Ascii);
        assert_eq!(Casemap::from_isupport("ASCII"), Casemap::Ascii);
        assert_eq!(Casemap::from_isupport("rfc1459"), Casemap::Rfc1459);
        assert_eq!(Casemap::from_isupport("rfc7613"), Casemap::Rfc1459);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(!Casemap::Rfc1459.eq("short", "longer"));
    }
}
