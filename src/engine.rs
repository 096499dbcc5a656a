//! The engine: owned registries of servers and sessions plus the
//! collaborator seams.
//!
//! Historically this state lived in global intrusive linked lists
//! walked from everywhere. Here a single `Engine` owns id-keyed maps
//! and every "walk all sessions of this server" becomes a filtered
//! iteration. All mutation of one server's protocol state happens
//! from the task that owns the `Engine` (or a per-server engine);
//! nothing in here is internally threaded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::config::{Prefs, ServerConfig};
use crate::event::{EventKind, EventSink};
use crate::ignore::IgnoreList;
use crate::server::{Server, ServerId};
use crate::session::{Session, SessionId, SessionKind};
use crate::userlist::UserList;

/// A user-configured CTCP auto-reply.
#[derive(Clone, Debug)]
pub struct CtcpReply {
    /// CTCP name, matched case-insensitively.
    pub name: String,
    /// Reply template; `%s` expands to the asking nick, `%m` to the
    /// request's trailing data.
    pub template: String,
}

/// The client core. One of these per UI process (or per server, if
/// the embedder prefers full isolation).
pub struct Engine {
    /// Global preferences, read-only here.
    pub prefs: Prefs,
    /// The shared ignore list.
    pub ignore: IgnoreList,

    pub(crate) servers: HashMap<ServerId, Server>,
    pub(crate) sessions: HashMap<SessionId, Session>,
    next_id: u64,

    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) users: Arc<dyn UserList>,

    pub(crate) ctcp_replies: Vec<CtcpReply>,
    pub(crate) notify_list: Vec<String>,
}

impl Engine {
    /// Build an engine around the front-end seams.
    pub fn new(prefs: Prefs, sink: Arc<dyn EventSink>, users: Arc<dyn UserList>) -> Self {
        Engine {
            prefs,
            ignore: IgnoreList::new(),
            servers: HashMap::new(),
            sessions: HashMap::new(),
            next_id: 1,
            sink,
            users,
            ctcp_replies: Vec::new(),
            notify_list: Vec::new(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Register a connection. Creates the server console session and
    /// points both back-references at it.
    pub fn add_server(&mut self, config: ServerConfig) -> ServerId {
        let sid = ServerId(self.next_id());
        let mut server = Server::new(config, &self.prefs.nick1);
        let console = SessionId(self.next_id());
        self.sessions
            .insert(console, Session::new(sid, SessionKind::Server));
        server.server_session = Some(console);
        server.front_session = Some(console);
        debug!(server = sid.0, host = %server.hostname, "server added");
        self.servers.insert(sid, server);
        sid
    }

    /// Look up a server; `None` after removal.
    pub fn server(&self, id: ServerId) -> Option<&Server> {
        self.servers.get(&id)
    }

    /// Mutable server lookup.
    pub fn server_mut(&mut self, id: ServerId) -> Option<&mut Server> {
        self.servers.get_mut(&id)
    }

    /// Look up a session; `None` after close.
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Mutable session lookup.
    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Ids of every session belonging to a server, unordered.
    pub fn sessions_of(&self, server: ServerId) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|(_, s)| s.server == server)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Create a session of the given kind for a server.
    pub fn add_session(&mut self, server: ServerId, kind: SessionKind) -> SessionId {
        let id = SessionId(self.next_id());
        self.sessions.insert(id, Session::new(server, kind));
        id
    }

    /// Close a session, repairing the owning server's back-references
    /// and dropping its user list. A stale id is a no-op.
    pub fn close_session(&mut self, id: SessionId) {
        let Some(session) = self.sessions.remove(&id) else {
            return;
        };
        self.users.clear(id);
        if let Some(server) = self.servers.get_mut(&session.server) {
            if server.front_session == Some(id) {
                server.front_session = server.server_session;
            }
            if server.server_session == Some(id) {
                server.server_session = None;
                if server.front_session == Some(id) {
                    server.front_session = None;
                }
            }
            if server.notices_session == Some(id) {
                server.notices_session = None;
            }
            if server.snotices_session == Some(id) {
                server.snotices_session = None;
            }
        }
    }

    /// Remove a server and every session it owns.
    pub fn remove_server(&mut self, id: ServerId) {
        for sess in self.sessions_of(id) {
            self.sessions.remove(&sess);
            self.users.clear(sess);
        }
        self.servers.remove(&id);
        debug!(server = id.0, "server removed");
    }

    /// The session the user is looking at, falling back to the
    /// console. Callers must tolerate `None` only during teardown.
    pub(crate) fn front_or_console(&self, server: ServerId) -> Option<SessionId> {
        let s = self.servers.get(&server)?;
        s.front_session.or(s.server_session)
    }

    /// Mark a session as the front-most one of its server.
    pub fn set_front_session(&mut self, id: SessionId) {
        if let Some(server) = self.sessions.get(&id).map(|s| s.server) {
            if let Some(server) = self.servers.get_mut(&server) {
                server.front_session = Some(id);
            }
        }
    }

    /// Emit one text event.
    pub(crate) fn emit(&self, session: SessionId, kind: EventKind, args: &[&str], ts: i64) {
        self.sink.emit(session, kind, args, ts);
    }

    /// Emit to the server console (or silently drop during teardown).
    pub(crate) fn emit_console(&self, server: ServerId, kind: EventKind, args: &[&str], ts: i64) {
        if let Some(console) = self.servers.get(&server).and_then(|s| s.server_session) {
            self.emit(console, kind, args, ts);
        }
    }

    /// Install a user-configured CTCP reply, replacing a same-named
    /// one.
    pub fn add_ctcp_reply(&mut self, name: &str, template: &str) {
        if let Some(r) = self
            .ctcp_replies
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(name))
        {
            r.template = template.to_string();
        } else {
            self.ctcp_replies.push(CtcpReply {
                name: name.to_string(),
                template: template.to_string(),
            });
        }
    }

    /// Watch a nick for online/away transitions.
    pub fn add_notify(&mut self, nick: &str) {
        if !self.is_notified(nick) {
            self.notify_list.push(nick.to_string());
        }
    }

    /// Stop watching a nick.
    pub fn remove_notify(&mut self, nick: &str) {
        self.notify_list.retain(|n| !n.eq_ignore_ascii_case(nick));
    }

    pub(crate) fn is_notified(&self, nick: &str) -> bool {
        self.notify_list.iter().any(|n| n.eq_ignore_ascii_case(nick))
    }

    /// Queue a raw line on a server's outbound queue. Unknown server
    /// ids are silently dropped (the connection may already be gone).
    pub fn send_raw(&mut self, server: ServerId, line: String) {
        if let Some(s) = self.servers.get_mut(&server) {
            debug!(server = server.0, line = %line, "queue");
            s.queue.push(line);
        }
    }

    /// Pop the next outbound line whose pacing deadline has passed.
    /// The transport task calls this on its write tick.
    pub fn pop_outbound(&mut self, server: ServerId, now: Instant) -> Option<String> {
        self.servers.get_mut(&server)?.queue.pop_ready(now)
    }

    /// Deadline of the next outbound line, for timer scheduling.
    pub fn outbound_deadline(&self, server: ServerId) -> Option<Instant> {
        self.servers.get(&server)?.queue.next_deadline()
    }

    /// Drain the queue ignoring pacing. Tests and the final-QUIT
    /// flush use this.
    pub fn drain_outbound(&mut self, server: ServerId) -> Vec<String> {
        match self.servers.get_mut(&server) {
            Some(s) => std::iter::from_fn(|| s.queue.pop_now()).collect(),
            None => Vec::new(),
        }
    }

    /// Tear down a connection's protocol state: discard queued lines
    /// except a final QUIT, abandon SASL, emit `Disconnected`. The
    /// server and its sessions stay registered for reconnect.
    pub fn disconnect(&mut self, server: ServerId, reason: &str) {
        let Some(s) = self.servers.get_mut(&server) else {
            return;
        };
        let dropped = s.queue.clear();
        if s.connected || s.connecting {
            s.queue.push(format!("QUIT :{reason}"));
        }
        s.sasl_mech = None;
        s.connecting = false;
        s.connected = false;
        debug!(server = server.0, dropped, "disconnect");
        self.emit_console(server, EventKind::Disconnected, &[reason], 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MemorySink;
    use crate::userlist::MemoryUserList;

    fn engine() -> Engine {
        Engine::new(
            Prefs::default(),
            Arc::new(MemorySink::new()),
            Arc::new(MemoryUserList::new()),
        )
    }

    #[test]
    fn test_add_server_creates_console() {
        let mut e = engine();
        let sid = e.add_server(ServerConfig::default());
        let s = e.server(sid).unwrap();
        let console = s.server_session.unwrap();
        assert_eq!(s.front_session, Some(console));
        assert_eq!(e.session(console).unwrap().kind, SessionKind::Server);
    }

    #[test]
    fn test_close_session_repairs_backrefs() {
        let mut e = engine();
        let sid = e.add_server(ServerConfig::default());
        let chan = e.add_session(sid, SessionKind::Channel);
        e.set_front_session(chan);
        assert_eq!(e.server(sid).unwrap().front_session, Some(chan));
        e.close_session(chan);
        let s = e.server(sid).unwrap();
        assert_eq!(s.front_session, s.server_session);
        // stale close is a no-op
        e.close_session(chan);
    }

    #[test]
    fn test_remove_server_drops_sessions() {
        let mut e = engine();
        let sid = e.add_server(ServerConfig::default());
        let chan = e.add_session(sid, SessionKind::Channel);
        e.remove_server(sid);
        assert!(e.server(sid).is_none());
        assert!(e.session(chan).is_none());
    }

    #[test]
    fn test_disconnect_keeps_final_quit() {
        let mut e = engine();
        let sid = e.add_server(ServerConfig::default());
        e.server_mut(sid).unwrap().connected = true;
        e.send_raw(sid, "PRIVMSG #a :unsent".into());
        e.send_raw(sid, "WHO #a".into());
        e.disconnect(sid, "bye");
        let out = e.drain_outbound(sid);
        assert_eq!(out, vec!["QUIT :bye"]);
    }

    #[test]
    fn test_notify_list() {
        let mut e = engine();
        e.add_notify("Friend");
        e.add_notify("friend");
        assert!(e.is_notified("FRIEND"));
        e.remove_notify("friend");
        assert!(!e.is_notified("friend"));
    }
}
