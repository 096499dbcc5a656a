//! Session routing: map a server plus channel/nick to the session
//! that should display it, creating or reusing tabs on JOIN.

use tracing::debug;

use crate::engine::Engine;
use crate::event::EventKind;
use crate::server::ServerId;
use crate::session::{SessionId, SessionKind};

impl Engine {
    /// Find the channel session for `name`, case-folded per the
    /// server's negotiated casemapping.
    pub fn find_channel(&self, server: ServerId, name: &str) -> Option<SessionId> {
        let srv = self.servers.get(&server)?;
        self.sessions
            .iter()
            .find(|(_, s)| {
                s.server == server
                    && s.kind == SessionKind::Channel
                    && srv.name_eq(&s.channel, name)
            })
            .map(|(id, _)| *id)
    }

    /// Find the dialog session for `nick`.
    pub fn find_dialog(&self, server: ServerId, nick: &str) -> Option<SessionId> {
        let srv = self.servers.get(&server)?;
        self.sessions
            .iter()
            .find(|(_, s)| {
                s.server == server && s.kind == SessionKind::Dialog && srv.name_eq(&s.channel, nick)
            })
            .map(|(id, _)| *id)
    }

    /// Best session to show text about `nick`: the front session if
    /// that channel has the nick, else any channel containing it,
    /// else the server console.
    pub fn find_session_from_nick(&self, server: ServerId, nick: &str) -> Option<SessionId> {
        if let Some(front) = self.servers.get(&server).and_then(|s| s.front_session) {
            if self.users.find(front, nick) {
                return Some(front);
            }
        }
        for (id, s) in &self.sessions {
            if s.server == server && s.kind == SessionKind::Channel && self.users.find(*id, nick) {
                return Some(*id);
            }
        }
        self.servers.get(&server).and_then(|s| s.server_session)
    }

    /// Generic-print fallback for unrecognized numerics: channel
    /// session if the target is channel-shaped and known, else an
    /// existing dialog, else the console.
    pub(crate) fn fallback_session(&self, server: ServerId, target: &str) -> Option<SessionId> {
        if let Some(srv) = self.servers.get(&server) {
            if srv.is_channel(target) {
                if let Some(id) = self.find_channel(server, target) {
                    return Some(id);
                }
            } else if let Some(id) = self.find_dialog(server, target) {
                return Some(id);
            }
            return srv.server_session;
        }
        None
    }

    /// Resolve the session for our own confirmed JOIN.
    ///
    /// Reuse order: an existing channel session (bounce replay), a
    /// session waiting on this channel name, any blank channel tab,
    /// and only then a brand-new session. Reusing a blank tab emits
    /// `SessionReset` once so the front-end reloads per-channel
    /// settings and scrollback.
    pub fn resolve_or_create_on_join(&mut self, server: ServerId, channel: &str) -> SessionId {
        if let Some(id) = self.find_channel(server, channel) {
            return id;
        }

        let waiting = self.sessions.iter().find_map(|(id, s)| {
            let srv = self.servers.get(&server)?;
            (s.server == server
                && s.kind == SessionKind::Channel
                && srv.name_eq(&s.waitchannel, channel))
            .then_some(*id)
        });
        if let Some(id) = waiting {
            self.users.clear(id);
            if let Some(s) = self.sessions.get_mut(&id) {
                s.reset_for_join(channel);
            }
            return id;
        }

        let blank = self
            .sessions
            .iter()
            .find(|(_, s)| s.server == server && s.is_blank_channel_tab())
            .map(|(id, _)| *id);
        if let Some(id) = blank {
            debug!(server = server.0, channel, "reusing blank tab");
            self.users.clear(id);
            if let Some(s) = self.sessions.get_mut(&id) {
                s.reset_for_join(channel);
            }
            self.emit(id, EventKind::SessionReset, &[channel], 0);
            return id;
        }

        let id = self.add_session(server, SessionKind::Channel);
        if let Some(s) = self.sessions.get_mut(&id) {
            s.reset_for_join(channel);
        }
        id
    }

    /// Session for a NAMES reply: the channel if known, else the
    /// console (a reply for a closed tab must not be an error).
    pub(crate) fn names_session(&self, server: ServerId, channel: &str) -> Option<SessionId> {
        self.find_channel(server, channel)
            .or_else(|| self.servers.get(&server).and_then(|s| s.server_session))
    }

    /// Dialog session for an inbound private message, creating one
    /// when auto-open allows.
    pub(crate) fn dialog_for(
        &mut self,
        server: ServerId,
        nick: &str,
        may_autoopen: bool,
    ) -> Option<SessionId> {
        if let Some(id) = self.find_dialog(server, nick) {
            return Some(id);
        }
        if !may_autoopen {
            return self.front_or_console(server);
        }
        let id = self.add_session(server, SessionKind::Dialog);
        if let Some(s) = self.sessions.get_mut(&id) {
            s.channel = nick.to_string();
        }
        Some(id)
    }

    /// The notices (or snotices) collector session, created on first
    /// use.
    pub(crate) fn notices_session(&mut self, server: ServerId, server_notices: bool) -> Option<SessionId> {
        let existing = self.servers.get(&server).and_then(|s| {
            if server_notices {
                s.snotices_session
            } else {
                s.notices_session
            }
        })?;
        Some(existing)
    }

    /// As above but allocates the collector tab when absent.
    pub(crate) fn notices_session_or_create(
        &mut self,
        server: ServerId,
        server_notices: bool,
    ) -> Option<SessionId> {
        if let Some(id) = self.notices_session(server, server_notices) {
            return Some(id);
        }
        self.servers.get(&server)?;
        let kind = if server_notices {
            SessionKind::SNotices
        } else {
            SessionKind::Notices
        };
        let id = self.add_session(server, kind);
        if let Some(s) = self.servers.get_mut(&server) {
            if server_notices {
                s.snotices_session = Some(id);
            } else {
                s.notices_session = Some(id);
            }
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Prefs, ServerConfig};
    use crate::event::MemorySink;
    use crate::userlist::MemoryUserList;
    use std::sync::Arc;

    fn engine_with_sink() -> (Engine, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let e = Engine::new(
            Prefs::default(),
            sink.clone(),
            Arc::new(MemoryUserList::new()),
        );
        (e, sink)
    }

    #[test]
    fn test_find_channel_casefolds() {
        let (mut e, _) = engine_with_sink();
        let sid = e.add_server(ServerConfig::default());
        let id = e.resolve_or_create_on_join(sid, "#Test[1]");
        assert_eq!(e.find_channel(sid, "#test{1}"), Some(id));
        assert_eq!(e.find_channel(sid, "#other"), None);
    }

    #[test]
    fn test_join_reuses_existing() {
        let (mut e, _) = engine_with_sink();
        let sid = e.add_server(ServerConfig::default());
        let a = e.resolve_or_create_on_join(sid, "#dup");
        let b = e.resolve_or_create_on_join(sid, "#DUP");
        assert_eq!(a, b);
    }

    #[test]
    fn test_join_matches_waitchannel() {
        let (mut e, _) = engine_with_sink();
        let sid = e.add_server(ServerConfig::default());
        let waiting = e.add_session(sid, SessionKind::Channel);
        e.session_mut(waiting).unwrap().waitchannel = "#pending".into();
        let resolved = e.resolve_or_create_on_join(sid, "#pending");
        assert_eq!(resolved, waiting);
        let s = e.session(resolved).unwrap();
        assert_eq!(s.channel, "#pending");
        assert!(s.waitchannel.is_empty());
    }

    #[test]
    fn test_join_reuses_blank_tab_with_reset() {
        let (mut e, sink) = engine_with_sink();
        let sid = e.add_server(ServerConfig::default());
        let blank = e.add_session(sid, SessionKind::Channel);
        let resolved = e.resolve_or_create_on_join(sid, "#fresh");
        assert_eq!(resolved, blank);
        assert_eq!(sink.count(EventKind::SessionReset), 1);
        // second join of another channel creates a new tab, no reset
        let other = e.resolve_or_create_on_join(sid, "#more");
        assert_ne!(other, blank);
        assert_eq!(sink.count(EventKind::SessionReset), 1);
    }

    #[test]
    fn test_names_for_unknown_channel_hits_console() {
        let (mut e, _) = engine_with_sink();
        let sid = e.add_server(ServerConfig::default());
        let console = e.server(sid).unwrap().server_session;
        assert_eq!(e.names_session(sid, "#ghost"), console);
    }

    #[test]
    fn test_dialog_autoopen_gate() {
        let (mut e, _) = engine_with_sink();
        let sid = e.add_server(ServerConfig::default());
        let console = e.server(sid).unwrap().server_session.unwrap();
        // suppressed: falls back to front/console
        assert_eq!(e.dialog_for(sid, "bob", false), Some(console));
        // allowed: creates and remembers
        let d = e.dialog_for(sid, "bob", true).unwrap();
        assert_ne!(d, console);
        assert_eq!(e.find_dialog(sid, "BOB"), Some(d));
    }
}
