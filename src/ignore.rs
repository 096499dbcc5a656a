//! The ignore list.
//!
//! Entries pair a `nick!user@host` wildcard mask with a bitmask of
//! message types. UNIGNORE entries are checked first and win over any
//! positive match, so a broad ignore can carry narrow exceptions.
//!
//! This list and the per-server away cache are the only state mutated
//! by handlers outside their owning server, so access is serialized
//! behind a single lock.

use parking_lot::RwLock;

/// Ignore type bits.
pub mod ig {
    /// Private messages.
    pub const PRIV: u32 = 1 << 0;
    /// Notices.
    pub const NOTI: u32 = 1 << 1;
    /// Channel messages.
    pub const CHAN: u32 = 1 << 2;
    /// CTCP requests.
    pub const CTCP: u32 = 1 << 3;
    /// Invitations.
    pub const INVI: u32 = 1 << 4;
    /// Unignore: a match here defeats any positive ignore.
    pub const UNIG: u32 = 1 << 5;
    /// Entry is not persisted by the embedder.
    pub const NOSAVE: u32 = 1 << 6;
    /// DCC offers.
    pub const DCC: u32 = 1 << 7;
}

#[derive(Clone, Debug)]
struct IgnoreEntry {
    mask: String,
    flags: u32,
}

/// Shared ignore list.
#[derive(Default)]
pub struct IgnoreList {
    entries: RwLock<Vec<IgnoreEntry>>,
}

impl IgnoreList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; an existing entry with the same mask has its
    /// flags replaced.
    pub fn add(&self, mask: &str, flags: u32) {
        let mut entries = self.entries.write();
        if let Some(e) = entries
            .iter_mut()
            .find(|e| e.mask.eq_ignore_ascii_case(mask))
        {
            e.flags = flags;
        } else {
            entries.push(IgnoreEntry {
                mask: mask.to_string(),
                flags,
            });
        }
    }

    /// Remove an entry by mask. Returns true if one was removed.
    pub fn remove(&self, mask: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| !e.mask.eq_ignore_ascii_case(mask));
        entries.len() != before
    }

    /// Check whether a `nick!user@host` source is ignored for the
    /// given type bit. Unignore entries short-circuit a positive
    /// match.
    pub fn check(&self, source: &str, type_bit: u32) -> bool {
        let entries = self.entries.read();
        for e in entries.iter() {
            if e.flags & ig::UNIG != 0 && e.flags & type_bit != 0 && mask_match(&e.mask, source) {
                return false;
            }
        }
        for e in entries.iter() {
            if e.flags & ig::UNIG == 0 && e.flags & type_bit != 0 && mask_match(&e.mask, source) {
                return true;
            }
        }
        false
    }

    /// Whether any entry has this exact mask.
    pub fn contains(&self, mask: &str) -> bool {
        self.entries
            .read()
            .iter()
            .any(|e| e.mask.eq_ignore_ascii_case(mask))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when no entries exist.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Case-insensitive wildcard match: `*` spans any run, `?` one char.
pub fn mask_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    let t: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();

    // Iterative glob with backtracking over the last '*'
    let (mut pi, mut ti) = (0usize, 0usize);
    let (mut star, mut mark) = (None::<usize>, 0usize);
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_match() {
        assert!(mask_match("*!*@evil.host", "troll!u@evil.host"));
        assert!(mask_match("TROLL!*@*", "troll!u@h"));
        assert!(mask_match("t?oll!*@*", "troll!u@h"));
        assert!(!mask_match("*!*@good.host", "troll!u@evil.host"));
        assert!(mask_match("*", "anything"));
        assert!(!mask_match("", "x"));
    }

    #[test]
    fn test_check_types() {
        let list = IgnoreList::new();
        list.add("*!*@evil.host", ig::CTCP | ig::PRIV);
        assert!(list.check("troll!u@evil.host", ig::CTCP));
        assert!(list.check("troll!u@evil.host", ig::PRIV));
        assert!(!list.check("troll!u@evil.host", ig::CHAN));
        assert!(!list.check("nice!u@home", ig::CTCP));
    }

    #[test]
    fn test_unignore_wins() {
        let list = IgnoreList::new();
        list.add("*!*@shared.host", ig::PRIV);
        list.add("friend!*@shared.host", ig::PRIV | ig::UNIG);
        assert!(list.check("troll!u@shared.host", ig::PRIV));
        assert!(!list.check("friend!u@shared.host", ig::PRIV));
    }

    #[test]
    fn test_add_replaces_flags() {
        let list = IgnoreList::new();
        list.add("x!*@*", ig::PRIV);
        list.add("X!*@*", ig::CHAN);
        assert_eq!(list.len(), 1);
        assert!(!list.check("x!u@h", ig::PRIV));
        assert!(list.check("x!u@h", ig::CHAN));
    }

    #[test]
    fn test_remove() {
        let list = IgnoreList::new();
        list.add("x!*@*", ig::PRIV);
        assert!(list.remove("X!*@*"));
        assert!(!list.remove("x!*@*"));
        assert!(list.is_empty());
    }
}
