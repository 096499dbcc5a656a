//! Shared test harness: an engine wired to recording collaborators,
//! driven by feeding raw inbound lines.

#![allow(dead_code)]

use std::sync::Arc;

use slircc::{
    Emitted, Engine, EventKind, MemorySink, MemoryUserList, Prefs, ServerConfig, ServerId,
    SessionId,
};

pub struct Harness {
    pub engine: Engine,
    pub sink: Arc<MemorySink>,
    pub users: Arc<MemoryUserList>,
    pub server: ServerId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Prefs::default(), ServerConfig::default())
    }

    pub fn with(prefs: Prefs, config: ServerConfig) -> Self {
        let sink = Arc::new(MemorySink::new());
        let users = Arc::new(MemoryUserList::new());
        let mut engine = Engine::new(prefs, sink.clone(), users.clone());
        let server = engine.add_server(config);
        Harness {
            engine,
            sink,
            users,
            server,
        }
    }

    /// Feed raw inbound lines through the dispatcher.
    pub fn feed(&mut self, lines: &[&str]) {
        for line in lines {
            self.engine.inline(self.server, line);
        }
    }

    /// Drain everything queued for sending, ignoring throttle timing.
    pub fn out(&mut self) -> Vec<String> {
        self.engine.drain_outbound(self.server)
    }

    /// Registration burst with the default nick; clears the outbound
    /// queue and captured events afterward so tests start clean.
    pub fn register(&mut self) {
        self.feed(&[":irc.test.net 001 slirc :Welcome to TestNet, slirc"]);
        self.out();
        self.sink.clear();
    }

    /// Register and join a channel as ourselves.
    pub fn join(&mut self, channel: &str) -> SessionId {
        self.feed(&[&format!(":slirc!u@h JOIN :{channel}")]);
        self.out();
        self.sink.clear();
        self.engine
            .sessions_of(self.server)
            .into_iter()
            .find(|s| {
                self.engine
                    .session(*s)
                    .map_or(false, |sess| sess.channel == channel)
            })
            .unwrap_or_else(|| panic!("no session for {channel}"))
    }

    /// All captured events of one kind.
    pub fn events(&self, kind: EventKind) -> Vec<Emitted> {
        self.sink
            .events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }
}
