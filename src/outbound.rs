//! Outbound protocol verbs.
//!
//! One function per IRC verb the command layer needs; each formats
//! exactly one wire line (or, for the join-list batcher, a 512-byte
//! safe set of lines) and hands it to the server's throttle queue.

use slirc_wire::sasl;
use slirc_wire::MAX_LINE_LEN;

use crate::config::{FavChannel, LoginMethod};
use crate::engine::Engine;
use crate::server::ServerId;

impl Engine {
    /// Begin registration: CAP LS, optional PASS, NICK, USER.
    pub fn start_login(&mut self, server: ServerId) {
        let Some(s) = self.servers.get_mut(&server) else {
            return;
        };
        s.connecting = true;
        s.nickcount = 0;
        let nick = s.nick.clone();
        let pass = if s.loginmethod == LoginMethod::ServerPass {
            s.config.password.clone()
        } else {
            None
        };
        let user = self.prefs.username.clone();
        let real = self.prefs.realname.clone();
        self.send_raw(server, "CAP LS 302".into());
        if let Some(p) = pass {
            self.send_raw(server, format!("PASS {p}"));
        }
        self.send_raw(server, format!("NICK {nick}"));
        self.send_raw(server, format!("USER {user} 0 * :{real}"));
    }

    /// NICK change (also used by the collision-retry ladder).
    pub fn p_nick(&mut self, server: ServerId, nick: &str) {
        self.send_raw(server, format!("NICK {nick}"));
    }

    /// JOIN one channel, with an optional key.
    pub fn p_join(&mut self, server: ServerId, channel: &str, key: Option<&str>) {
        match key {
            Some(k) if !k.is_empty() => self.send_raw(server, format!("JOIN {channel} {k}")),
            _ => self.send_raw(server, format!("JOIN {channel}")),
        }
    }

    /// JOIN a whole favorites list, comma-batched under the 512-byte
    /// line limit. Keyed channels go first in each batch; keyless
    /// channels in a mixed batch use `x` as key placeholder. A batch
    /// with no keys at all omits the key argument.
    pub fn p_join_list(&mut self, server: ServerId, favorites: &[FavChannel]) {
        let keyed = favorites.iter().filter(|f| f.key.is_some());
        let keyless = favorites.iter().filter(|f| f.key.is_none());

        let mut chans = String::new();
        let mut keys = String::new();
        let mut any_key = false;
        for fav in keyed.chain(keyless) {
            let key = fav.key.as_deref().unwrap_or("x");
            // "JOIN " + chans + " " + keys + ",name" + ",key" + "\r\n"
            let projected = 5 + chans.len() + 1 + keys.len() + fav.name.len() + key.len() + 4;
            if !chans.is_empty() && projected > MAX_LINE_LEN {
                self.flush_join_batch(server, &mut chans, &mut keys, &mut any_key);
            }
            if !chans.is_empty() {
                chans.push(',');
                keys.push(',');
            }
            chans.push_str(&fav.name);
            keys.push_str(key);
            any_key |= fav.key.is_some();
        }
        if !chans.is_empty() {
            self.flush_join_batch(server, &mut chans, &mut keys, &mut any_key);
        }
    }

    fn flush_join_batch(
        &mut self,
        server: ServerId,
        chans: &mut String,
        keys: &mut String,
        any_key: &mut bool,
    ) {
        let line = if *any_key {
            format!("JOIN {chans} {keys}")
        } else {
            format!("JOIN {chans}")
        };
        self.send_raw(server, line);
        chans.clear();
        keys.clear();
        *any_key = false;
    }

    /// PART a channel, with an optional reason.
    pub fn p_part(&mut self, server: ServerId, channel: &str, reason: &str) {
        if reason.is_empty() {
            self.send_raw(server, format!("PART {channel}"));
        } else {
            self.send_raw(server, format!("PART {channel} :{reason}"));
        }
    }

    /// KICK a user from a channel.
    pub fn p_kick(&mut self, server: ServerId, channel: &str, nick: &str, reason: &str) {
        if reason.is_empty() {
            self.send_raw(server, format!("KICK {channel} {nick}"));
        } else {
            self.send_raw(server, format!("KICK {channel} {nick} :{reason}"));
        }
    }

    /// Set a topic, or query it when `topic` is `None`.
    pub fn p_topic(&mut self, server: ServerId, channel: &str, topic: Option<&str>) {
        match topic {
            Some(t) => self.send_raw(server, format!("TOPIC {channel} :{t}")),
            None => self.send_raw(server, format!("TOPIC {channel}")),
        }
    }

    /// Raw MODE line; an empty `modes` makes it a query, which the
    /// queue classifies as low urgency.
    pub fn p_mode(&mut self, server: ServerId, target: &str, modes: &str) {
        if modes.is_empty() {
            self.send_raw(server, format!("MODE {target}"));
        } else {
            self.send_raw(server, format!("MODE {target} {modes}"));
        }
    }

    /// PRIVMSG.
    pub fn p_privmsg(&mut self, server: ServerId, target: &str, text: &str) {
        self.send_raw(server, format!("PRIVMSG {target} :{text}"));
    }

    /// NOTICE.
    pub fn p_notice(&mut self, server: ServerId, target: &str, text: &str) {
        self.send_raw(server, format!("NOTICE {target} :{text}"));
    }

    /// /me emote, framed as CTCP ACTION.
    pub fn p_action(&mut self, server: ServerId, target: &str, text: &str) {
        self.send_raw(server, format!("PRIVMSG {target} :\x01ACTION {text}\x01"));
    }

    /// CTCP request via PRIVMSG.
    pub fn p_ctcp(&mut self, server: ServerId, target: &str, ctcp: &str) {
        self.send_raw(server, format!("PRIVMSG {target} :\x01{ctcp}\x01"));
    }

    /// CTCP reply via NOTICE.
    pub fn p_nctcp(&mut self, server: ServerId, target: &str, ctcp: &str) {
        self.send_raw(server, format!("NOTICE {target} :\x01{ctcp}\x01"));
    }

    /// WHOIS (doubled nick asks the user's server for idle info).
    pub fn p_whois(&mut self, server: ServerId, nick: &str) {
        self.send_raw(server, format!("WHOIS {nick} {nick}"));
    }

    /// WHOIS whose reply burst is swallowed (internal away checks).
    pub fn p_whois_quiet(&mut self, server: ServerId, nick: &str) {
        if let Some(s) = self.servers.get_mut(&server) {
            s.skip_next_whois = true;
        }
        self.send_raw(server, format!("WHOIS {nick} {nick}"));
    }

    /// NAMES refresh whose reply only refills the user list, without
    /// being displayed.
    pub fn p_names_quiet(&mut self, server: ServerId, channel: &str) {
        if let Some(sess) = self.find_channel(server, channel) {
            if let Some(s) = self.sessions.get_mut(&sess) {
                s.ignore_names = true;
            }
        }
        self.send_raw(server, format!("NAMES {channel}"));
    }

    /// WHO for a channel; WHOX form when the server supports it so
    /// the reply carries account names and our query-type marker.
    pub fn p_who_channel(&mut self, server: ServerId, channel: &str) {
        let whox = self.servers.get(&server).map_or(false, |s| s.caps.have_whox);
        if whox {
            self.send_raw(
                server,
                format!("WHO {channel} %chtsunfra,{}", slirc_wire::numeric::WHOX_QUERYTYPE),
            );
        } else {
            self.send_raw(server, format!("WHO {channel}"));
        }
    }

    /// Mark away.
    pub fn p_away(&mut self, server: ServerId, reason: &str) {
        self.send_raw(server, format!("AWAY :{reason}"));
    }

    /// Clear away.
    pub fn p_back(&mut self, server: ServerId) {
        self.send_raw(server, "AWAY".into());
    }

    /// INVITE a nick to a channel.
    pub fn p_invite(&mut self, server: ServerId, nick: &str, channel: &str) {
        self.send_raw(server, format!("INVITE {nick} {channel}"));
    }

    /// QUIT with a reason.
    pub fn p_quit(&mut self, server: ServerId, reason: &str) {
        self.send_raw(server, format!("QUIT :{reason}"));
    }

    /// PONG a server ping.
    pub fn p_pong(&mut self, server: ServerId, payload: &str) {
        self.send_raw(server, format!("PONG :{payload}"));
    }

    /// Arbitrary raw line from the command layer.
    pub fn p_raw(&mut self, server: ServerId, line: &str) {
        self.send_raw(server, line.to_string());
    }

    /// AUTHENTICATE payload, split into the protocol's 400-byte
    /// chunks. An empty payload, or one that is an exact multiple of
    /// the chunk size, needs a bare `+` so the server knows we are
    /// done.
    pub fn p_authenticate(&mut self, server: ServerId, payload: &str) {
        let chunks: Vec<&str> = sasl::chunk_response(payload).collect();
        for chunk in &chunks {
            self.send_raw(server, format!("AUTHENTICATE {chunk}"));
        }
        if payload.is_empty() || payload.len() % sasl::SASL_CHUNK_SIZE == 0 {
            self.send_raw(server, "AUTHENTICATE +".into());
        }
    }
}
