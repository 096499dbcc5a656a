//! The per-session user list seam.
//!
//! Front-ends own the visible nick list; the engine only pushes
//! membership deltas through this trait. A memory-backed
//! implementation is provided for headless embedders and the test
//! harness.

use std::collections::HashMap;

use parking_lot::Mutex;
use slirc_wire::Casemap;

use crate::session::SessionId;

/// Receiver of user-list deltas; implemented by the front-end.
pub trait UserList: Send + Sync {
    /// A user appeared in a session (JOIN, NAMES, WHO fill-in).
    fn add(&self, session: SessionId, nick: &str, host: &str, account: &str);
    /// A user left (PART, KICK, QUIT). Returns true if the nick was
    /// present, so QUIT handling can tell which sessions to notify.
    fn remove(&self, session: SessionId, nick: &str) -> bool;
    /// Whether the nick is present in the session.
    fn find(&self, session: SessionId, nick: &str) -> bool;
    /// A user changed nick.
    fn rename(&self, session: SessionId, old: &str, new: &str);
    /// Away status changed (WHO reply or away-notify push).
    fn set_away(&self, session: SessionId, nick: &str, away: bool);
    /// Identified account name changed (ACCOUNT push or extended-join).
    fn set_account(&self, session: SessionId, nick: &str, account: &str);
    /// Drop every entry of a session (tab reuse, rejoin).
    fn clear(&self, session: SessionId);
}

#[derive(Clone, Debug, Default)]
struct UserEntry {
    nick: String,
    host: String,
    account: String,
    away: bool,
}

/// Memory-backed [`UserList`] keyed by case-folded nick.
///
/// Folding uses RFC1459 rules unconditionally; per-server casemapping
/// only matters for session routing, where the engine folds before
/// calling in here.
#[derive(Default)]
pub struct MemoryUserList {
    sessions: Mutex<HashMap<SessionId, HashMap<String, UserEntry>>>,
}

impl MemoryUserList {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn fold(nick: &str) -> String {
        Casemap::Rfc1459.lower(nick)
    }

    /// Number of users in a session.
    pub fn len(&self, session: SessionId) -> usize {
        self.sessions
            .lock()
            .get(&session)
            .map_or(0, HashMap::len)
    }

    /// Away status of a nick, if known.
    pub fn away(&self, session: SessionId, nick: &str) -> Option<bool> {
        self.sessions
            .lock()
            .get(&session)?
            .get(&Self::fold(nick))
            .map(|e| e.away)
    }

    /// Account name of a nick, if known.
    pub fn account(&self, session: SessionId, nick: &str) -> Option<String> {
        self.sessions
            .lock()
            .get(&session)?
            .get(&Self::fold(nick))
            .map(|e| e.account.clone())
    }
}

impl UserList for MemoryUserList {
    fn add(&self, session: SessionId, nick: &str, host: &str, account: &str) {
        let mut sessions = self.sessions.lock();
        let users = sessions.entry(session).or_default();
        users.insert(
            Self::fold(nick),
            UserEntry {
                nick: nick.to_string(),
                host: host.to_string(),
                account: account.to_string(),
                away: false,
            },
        );
    }

    fn remove(&self, session: SessionId, nick: &str) -> bool {
        let mut sessions = self.sessions.lock();
        sessions
            .get_mut(&session)
            .map_or(false, |users| users.remove(&Self::fold(nick)).is_some())
    }

    fn find(&self, session: SessionId, nick: &str) -> bool {
        self.sessions
            .lock()
            .get(&session)
            .map_or(false, |users| users.contains_key(&Self::fold(nick)))
    }

    fn rename(&self, session: SessionId, old: &str, new: &str) {
        let mut sessions = self.sessions.lock();
        if let Some(users) = sessions.get_mut(&session) {
            if let Some(mut entry) = users.remove(&Self::fold(old)) {
                entry.nick = new.to_string();
                users.insert(Self::fold(new), entry);
            }
        }
    }

    fn set_away(&self, session: SessionId, nick: &str, away: bool) {
        let mut sessions = self.sessions.lock();
        if let Some(entry) = sessions
            .get_mut(&session)
            .and_then(|users| users.get_mut(&Self::fold(nick)))
        {
            entry.away = away;
        }
    }

    fn set_account(&self, session: SessionId, nick: &str, account: &str) {
        let mut sessions = self.sessions.lock();
        if let Some(entry) = sessions
            .get_mut(&session)
            .and_then(|users| users.get_mut(&Self::fold(nick)))
        {
            entry.account = account.to_string();
        }
    }

    fn clear(&self, session: SessionId) {
        self.sessions.lock().remove(&session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: SessionId = SessionId(1);

    #[test]
    fn test_add_find_remove() {
        let ul = MemoryUserList::new();
        ul.add(S, "Alice", "a@host", "");
        assert!(ul.find(S, "alice"));
        assert!(ul.find(S, "ALICE"));
        assert!(ul.remove(S, "aLiCe"));
        assert!(!ul.remove(S, "alice"));
        assert_eq!(ul.len(S), 0);
    }

    #[test]
    fn test_rfc1459_folding() {
        let ul = MemoryUserList::new();
        ul.add(S, "nick[a]", "", "");
        // { } | fold to [ ] \ under RFC1459
        assert!(ul.find(S, "nick{a}"));
    }

    #[test]
    fn test_rename_keeps_state() {
        let ul = MemoryUserList::new();
        ul.add(S, "old", "u@h", "acct");
        ul.set_away(S, "old", true);
        ul.rename(S, "old", "new");
        assert!(!ul.find(S, "old"));
        assert_eq!(ul.away(S, "new"), Some(true));
        assert_eq!(ul.account(S, "new"), Some("acct".into()));
    }

    #[test]
    fn test_clear() {
        let ul = MemoryUserList::new();
        ul.add(S, "a", "", "");
        ul.add(S, "b", "", "");
        ul.clear(S);
        assert_eq!(ul.len(S), 0);
    }
}
