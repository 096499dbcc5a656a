//! Per-connection protocol state.

use std::collections::HashMap;
use std::time::Instant;

use slirc_wire::sasl::Mechanism;
use slirc_wire::Casemap;

use crate::config::{LoginMethod, ServerConfig};
use crate::flood::FloodGuard;
use crate::queue::SendQueue;
use crate::session::SessionId;

/// Opaque handle to a server in the engine's registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(pub u64);

/// Capability flags negotiated via CAP or inferred from numerics.
#[derive(Clone, Copy, Debug, Default)]
pub struct Caps {
    /// `sasl` was advertised.
    pub have_sasl: bool,
    /// `identify-msg` acknowledged: PRIVMSG text carries a +/- prefix.
    pub have_idmsg: bool,
    /// `away-notify` acknowledged.
    pub have_awaynotify: bool,
    /// `userhost-in-names` acknowledged.
    pub have_uhnames: bool,
    /// `server-time` acknowledged: honor @time tags.
    pub have_server_time: bool,
    /// WHOX support (005 token).
    pub have_whox: bool,
    /// `extended-join` acknowledged.
    pub have_extjoin: bool,
    /// `account-notify` acknowledged.
    pub have_accnotify: bool,
}

/// One connection's worth of protocol state.
///
/// Everything here is mutated from the single task that owns the
/// connection; nothing is shared.
pub struct Server {
    /// Connection config as handed to `add_server`.
    pub config: ServerConfig,
    /// Hostname we dialed.
    pub hostname: String,
    /// Server name from the 001 prefix, once known.
    pub servername: String,

    /// Current (or candidate) nick.
    pub nick: String,
    /// Collision-retry ladder position.
    pub nickcount: u8,
    /// Nick was accepted by the server at least once.
    pub nick_acquired: bool,

    /// TCP established, registration in progress.
    pub connecting: bool,
    /// 001 received.
    pub connected: bool,
    /// End of MOTD seen; gates autojoin, latches once per connection.
    pub end_of_motd: bool,

    /// Negotiated capability flags.
    pub caps: Caps,
    /// Casemapping from 005, RFC1459 until told otherwise.
    pub casemap: Casemap,
    /// Channel-type prefixes from 005.
    pub chantypes: String,

    /// Login strategy for this connection.
    pub loginmethod: LoginMethod,
    /// Mechanism currently being attempted.
    pub sasl_mech: Option<Mechanism>,
    /// AUTHENTICATE <mech> has been sent this attempt.
    pub sent_saslauth: bool,
    /// CAP END has been sent; must-set-once guard.
    pub sent_capend: bool,
    /// One step-down retry remains after a SASL failure.
    pub retry_sasl: bool,
    /// Accumulated CAP REQ list during LS.
    pub want_cap: String,

    /// WHOIS numerics are being assembled for display.
    pub inside_whois: bool,
    /// Drop the next WHOIS burst (internally solicited).
    pub skip_next_whois: bool,

    /// Periodic WHO for away tracking is enabled.
    pub use_who: bool,
    /// Our IP as parsed from the 001 welcome line, when the heuristic
    /// applies and `ip_from_server` is set.
    pub found_ip: Option<String>,
    /// When our own LAG ping went out.
    pub lag_sent: Option<Instant>,

    /// ircd supports MODE +b with no argument returning the list.
    pub use_listargs: bool,
    /// 005 advertised ban exceptions (EXCEPTS).
    pub have_except: bool,
    /// 005 advertised invite exemptions (INVEX).
    pub have_invite: bool,
    /// Mode changes we may batch per MODE line.
    pub modes_per_line: u32,

    /// Away-message cache, folded nick to last message shown. Used
    /// with the show-once preference to avoid repeating 301 spam.
    pub away_cache: HashMap<String, String>,
    /// We are marked away.
    pub is_away: bool,

    /// The session the user is looking at for this server.
    pub front_session: Option<SessionId>,
    /// The server console session.
    pub server_session: Option<SessionId>,
    /// Dedicated user-notices session, created on demand.
    pub notices_session: Option<SessionId>,
    /// Dedicated server-notices session, created on demand.
    pub snotices_session: Option<SessionId>,

    /// Paced outbound queue.
    pub queue: SendQueue,
    /// Flood counters.
    pub flood: FloodGuard,
}

impl Server {
    /// New server state for one connection attempt.
    pub fn new(config: ServerConfig, default_nick: &str) -> Self {
        let nick = config
            .nick
            .clone()
            .unwrap_or_else(|| default_nick.to_string());
        let hostname = config.hostname.clone();
        let loginmethod = config.login;
        Server {
            config,
            hostname,
            servername: String::new(),
            nick,
            nickcount: 0,
            nick_acquired: false,
            connecting: false,
            connected: false,
            end_of_motd: false,
            caps: Caps::default(),
            casemap: Casemap::Rfc1459,
            chantypes: "#&".to_string(),
            loginmethod,
            sasl_mech: None,
            sent_saslauth: false,
            sent_capend: false,
            retry_sasl: false,
            want_cap: String::new(),
            inside_whois: false,
            skip_next_whois: false,
            use_who: true,
            found_ip: None,
            lag_sent: None,
            use_listargs: false,
            have_except: false,
            have_invite: false,
            modes_per_line: 3,
            away_cache: HashMap::new(),
            is_away: false,
            front_session: None,
            server_session: None,
            notices_session: None,
            snotices_session: None,
            queue: SendQueue::new(),
            flood: FloodGuard::new(),
        }
    }

    /// Whether SASL should be attempted at all on this connection.
    pub fn wants_sasl(&self) -> bool {
        match self.loginmethod {
            LoginMethod::SaslPlain => self.config.password.is_some(),
            LoginMethod::SaslExternal => self.config.use_client_cert,
            _ => false,
        }
    }

    /// Is `name` channel-shaped for this server's CHANTYPES.
    pub fn is_channel(&self, name: &str) -> bool {
        name.chars()
            .next()
            .map_or(false, |c| self.chantypes.contains(c))
    }

    /// Case-folded equality under the negotiated casemapping.
    pub fn name_eq(&self, a: &str, b: &str) -> bool {
        self.casemap.eq(a, b)
    }

    /// Record an away message; returns true when it should be shown
    /// (first time, or changed, per the show-once rule).
    pub fn cache_away(&mut self, nick: &str, msg: &str) -> bool {
        let key = self.casemap.lower(nick);
        match self.away_cache.get(&key) {
            Some(prev) if prev == msg => false,
            _ => {
                self.away_cache.insert(key, msg.to_string());
                true
            }
        }
    }

    /// Forget a nick's cached away message (user came back).
    pub fn uncache_away(&mut self, nick: &str) {
        let key = self.casemap.lower(nick);
        self.away_cache.remove(&key);
    }

    /// Reset per-connection state before a reconnect attempt.
    pub fn reset_connection_state(&mut self) {
        self.servername.clear();
        self.nickcount = 0;
        self.nick_acquired = false;
        self.connecting = false;
        self.connected = false;
        self.end_of_motd = false;
        self.caps = Caps::default();
        self.sasl_mech = None;
        self.sent_saslauth = false;
        self.sent_capend = false;
        self.retry_sasl = false;
        self.want_cap.clear();
        self.inside_whois = false;
        self.skip_next_whois = false;
        self.found_ip = None;
        self.lag_sent = None;
        self.away_cache.clear();
        self.is_away = false;
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FavChannel;

    fn srv() -> Server {
        Server::new(ServerConfig::default(), "tester")
    }

    #[test]
    fn test_nick_from_config_overrides() {
        let mut cfg = ServerConfig::default();
        cfg.nick = Some("other".into());
        let s = Server::new(cfg, "tester");
        assert_eq!(s.nick, "other");
    }

    #[test]
    fn test_wants_sasl() {
        let mut s = srv();
        assert!(!s.wants_sasl());
        s.loginmethod = LoginMethod::SaslPlain;
        assert!(!s.wants_sasl());
        s.config.password = Some("pw".into());
        assert!(s.wants_sasl());
        s.loginmethod = LoginMethod::SaslExternal;
        assert!(!s.wants_sasl());
        s.config.use_client_cert = true;
        assert!(s.wants_sasl());
    }

    #[test]
    fn test_is_channel() {
        let mut s = srv();
        assert!(s.is_channel("#chan"));
        assert!(s.is_channel("&local"));
        assert!(!s.is_channel("nick"));
        s.chantypes = "#!+".into();
        assert!(s.is_channel("!ephemeral"));
        assert!(!s.is_channel("&local"));
    }

    #[test]
    fn test_away_cache_show_once() {
        let mut s = srv();
        assert!(s.cache_away("Bob", "gone fishing"));
        assert!(!s.cache_away("BOB", "gone fishing"));
        assert!(s.cache_away("bob", "back soon"));
        s.uncache_away("bob");
        assert!(s.cache_away("bob", "back soon"));
    }

    #[test]
    fn test_reset_keeps_favorites() {
        let mut cfg = ServerConfig::default();
        cfg.favorites.push(FavChannel::new("#home", None));
        let mut s = Server::new(cfg, "tester");
        s.connected = true;
        s.end_of_motd = true;
        s.sent_capend = true;
        s.reset_connection_state();
        assert!(!s.connected);
        assert!(!s.end_of_motd);
        assert!(!s.sent_capend);
        assert_eq!(s.config.favorites.len(), 1);
    }
}
