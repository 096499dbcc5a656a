//! Preferences and per-connection configuration.
//!
//! The engine only ever *reads* these values; loading, saving, and UI
//! editing belong to the embedder. Field defaults match the behavior
//! long-standing users expect from the C lineage of this client.

use serde::Deserialize;
use std::path::Path;

use crate::error::CoreError;

/// How unsolicited NOTICEs are routed.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeRouting {
    /// Show in the currently front-most session of the server.
    #[default]
    Front,
    /// Show in the server console session.
    Server,
    /// Collect in a dedicated notices session, created on demand.
    Extra,
}

/// Account login strategy used during connection registration.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    /// No authentication.
    #[default]
    None,
    /// Send PASS before NICK/USER.
    ServerPass,
    /// Identify with NickServ after end of MOTD.
    NickServ,
    /// SASL with a password (mechanism negotiated).
    SaslPlain,
    /// SASL EXTERNAL via TLS client certificate.
    SaslExternal,
}

/// Global preferences, read-only from the engine's perspective.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prefs {
    /// Primary nickname.
    pub nick1: String,
    /// Second choice on collision.
    pub nick2: String,
    /// Third choice on collision.
    pub nick3: String,
    /// Username for USER registration.
    pub username: String,
    /// Realname for USER registration.
    pub realname: String,

    /// CTCP flood window in seconds.
    pub ctcp_flood_time: u64,
    /// CTCP events within the window before the flood action fires.
    pub ctcp_flood_num: u32,
    /// PRIVMSG flood window in seconds.
    pub msg_flood_time: u64,
    /// PRIVMSGs within the window before dialog auto-open is paused.
    pub msg_flood_num: u32,

    /// Open a dialog session when a private message arrives.
    pub auto_open_dialog: bool,
    /// Rejoin automatically after being kicked.
    pub auto_rejoin: bool,
    /// Suppress the CTCP VERSION reply.
    pub hide_version: bool,
    /// Take the DCC-visible IP from the server (001 heuristic) rather
    /// than local discovery.
    pub ip_from_server: bool,
    /// Show a user's away message only once per away period.
    pub away_show_once: bool,

    /// Routing for user notices.
    pub notice_routing: NoticeRouting,
    /// Routing for server notices.
    pub snotice_routing: NoticeRouting,

    /// Seconds between reconnect attempts (consumed by the embedder's
    /// reconnect policy).
    pub reconnect_delay: u64,
}

impl Default for Prefs {
    fn default() -> Self {
        Prefs {
            nick1: "slirc".into(),
            nick2: "slirc_".into(),
            nick3: "slirc__".into(),
            username: "slirc".into(),
            realname: "slirc user".into(),
            ctcp_flood_time: 30,
            ctcp_flood_num: 5,
            msg_flood_time: 30,
            msg_flood_num: 5,
            auto_open_dialog: true,
            auto_rejoin: false,
            hide_version: false,
            ip_from_server: false,
            away_show_once: true,
            notice_routing: NoticeRouting::Front,
            snotice_routing: NoticeRouting::Server,
            reconnect_delay: 10,
        }
    }
}

impl Prefs {
    /// Load preferences from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The nick candidate for the given collision-retry count.
    ///
    /// Count 0 is the primary nick; past the third choice there is
    /// nothing left to try.
    pub fn nick_candidate(&self, count: u8) -> Option<&str> {
        match count {
            0 => Some(&self.nick1),
            1 => Some(&self.nick2),
            2 => Some(&self.nick3),
            _ => None,
        }
    }
}

/// A favorite channel: joined automatically after end of MOTD.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FavChannel {
    /// Channel name.
    pub name: String,
    /// Optional channel key.
    pub key: Option<String>,
}

impl FavChannel {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, key: Option<&str>) -> Self {
        FavChannel {
            name: name.into(),
            key: key.map(str::to_owned),
        }
    }
}

/// Per-connection configuration handed to `Engine::add_server`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Hostname to connect to (display/identity only; the transport
    /// is the embedder's concern).
    pub hostname: String,
    /// Server or account password, depending on `login`.
    #[serde(default)]
    pub password: Option<String>,
    /// Login strategy.
    #[serde(default)]
    pub login: LoginMethod,
    /// A TLS client certificate is loaded (enables SASL EXTERNAL).
    #[serde(default)]
    pub use_client_cert: bool,
    /// Channels to join after end of MOTD.
    #[serde(default)]
    pub favorites: Vec<FavChannel>,
    /// Override the global nick for this connection.
    #[serde(default)]
    pub nick: Option<String>,
}
