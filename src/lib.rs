//! # slircc
//!
//! The protocol core of the Straylight IRC client: everything between
//! a line-framed transport and a front-end, with no rendering and no
//! sockets of its own.
//!
//! ## What lives here
//!
//! - [`Engine`]: id-keyed registries of servers and sessions, the
//!   inbound dispatchers (numerics, named commands, CAP/SASL, CTCP),
//!   and the outbound protocol verbs
//! - [`queue::SendQueue`]: the flood-safe outbound throttle
//! - [`flood::FloodGuard`]: inbound CTCP/PRIVMSG flood detection
//! - [`lifecycle::run_connection`]: the per-server pump task that
//!   bridges a [`lifecycle::Transport`] to the engine
//!
//! Display goes through the [`EventSink`] seam, channel membership
//! through [`UserList`]; a front-end implements both and owns the
//! actual windows. The wire-format layer (tokenizing, tags, CTCP and
//! SASL payloads) is the separate `slirc-wire` crate.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use slircc::{Engine, MemorySink, MemoryUserList, Prefs, ServerConfig};
//!
//! let sink = Arc::new(MemorySink::new());
//! let mut engine = Engine::new(Prefs::default(), sink.clone(), Arc::new(MemoryUserList::new()));
//! let server = engine.add_server(ServerConfig::default());
//!
//! engine.inline(server, ":irc.example.net 001 slirc :Welcome to ExampleNet");
//! assert_eq!(engine.server(server).unwrap().servername, "irc.example.net");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod flood;
pub mod ignore;
mod inbound;
pub mod lifecycle;
mod outbound;
pub mod queue;
mod route;
pub mod server;
pub mod session;
pub mod userlist;

pub use self::config::{FavChannel, LoginMethod, NoticeRouting, Prefs, ServerConfig};
pub use self::engine::{CtcpReply, Engine};
pub use self::error::{CoreError, Result};
pub use self::event::{Emitted, EventKind, EventSink, MemorySink};
pub use self::flood::FloodGuard;
pub use self::ignore::{ig, IgnoreList};
pub use self::lifecycle::{run_connection, FramedTransport, Transport};
pub use self::queue::{SendQueue, Urgency};
pub use self::server::{Server, ServerId};
pub use self::session::{Session, SessionId, SessionKind};
pub use self::userlist::{MemoryUserList, UserList};
