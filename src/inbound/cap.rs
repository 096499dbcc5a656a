//! CAP negotiation and the SASL state machine.

use slirc_wire::sasl::{self, Mechanism};
use tracing::debug;

use crate::config::LoginMethod;
use crate::engine::Engine;
use crate::event::EventKind;
use crate::inbound::strip_colon;
use crate::server::ServerId;

/// Capabilities we request when advertised. `sasl` is appended
/// separately, only when this connection wants to authenticate.
const WANTED_CAPS: &[&str] = &[
    "multi-prefix",
    "away-notify",
    "account-notify",
    "extended-join",
    "userhost-in-names",
    "server-time",
    "identify-msg",
];

impl Engine {
    pub(crate) fn process_cap(&mut self, server: ServerId, words: &slirc_wire::Words, ts: i64) {
        let source = words.word(1).to_string();
        match words.word(4).to_ascii_uppercase().as_str() {
            "LS" => {
                // a `*` marker before the list means more LS lines follow
                let more = words.word(5) == "*";
                let caps = if more {
                    strip_colon(words.word_eol(6))
                } else {
                    strip_colon(words.word_eol(5))
                }
                .to_string();
                self.cap_ls(server, &source, &caps, more, ts);
            }
            "ACK" => {
                let caps = strip_colon(words.word_eol(5)).to_string();
                self.cap_ack(server, &source, &caps, ts);
            }
            "NAK" => {
                let caps = strip_colon(words.word_eol(5)).to_string();
                self.emit_console(server, EventKind::CapText, &[&source, &caps], ts);
                self.cap_end_once(server);
            }
            "LIST" => {
                let caps = strip_colon(words.word_eol(5)).to_string();
                self.emit_console(server, EventKind::CapText, &[&source, &caps], ts);
            }
            _ => {
                let text = strip_colon(words.word_eol(4)).to_string();
                self.emit_console(server, EventKind::CapText, &[&source, &text], ts);
            }
        }
    }

    fn cap_ls(&mut self, server: ServerId, source: &str, caps: &str, more: bool, ts: i64) {
        self.emit_console(server, EventKind::CapText, &[source, caps], ts);
        let Some(srv) = self.servers.get_mut(&server) else {
            return;
        };
        let wants_sasl = srv.wants_sasl();
        for token in caps.split_whitespace() {
            // value syntax: "sasl=PLAIN,EXTERNAL"
            let name = token.split('=').next().unwrap_or(token);
            let wanted = WANTED_CAPS.contains(&name) || (name == "sasl" && wants_sasl);
            if wanted {
                if !srv.want_cap.is_empty() {
                    srv.want_cap.push(' ');
                }
                srv.want_cap.push_str(name);
            }
        }
        if more {
            return;
        }
        if srv.want_cap.is_empty() {
            self.cap_end_once(server);
        } else {
            let req = std::mem::take(&mut srv.want_cap);
            // sent as one line; a pathological capability list could
            // exceed the 512-byte limit here (known limitation,
            // kept intentionally)
            self.send_raw(server, format!("CAP REQ :{req}"));
        }
    }

    fn cap_ack(&mut self, server: ServerId, source: &str, caps: &str, ts: i64) {
        self.emit_console(server, EventKind::CapText, &[source, caps], ts);
        let mut sasl_acked = false;
        if let Some(srv) = self.servers.get_mut(&server) {
            for cap in caps.split_whitespace() {
                match cap {
                    "sasl" => {
                        srv.caps.have_sasl = true;
                        sasl_acked = true;
                    }
                    "identify-msg" => srv.caps.have_idmsg = true,
                    "away-notify" => srv.caps.have_awaynotify = true,
                    "userhost-in-names" => srv.caps.have_uhnames = true,
                    "server-time" | "znc.in/server-time-iso" => {
                        srv.caps.have_server_time = true
                    }
                    "extended-join" => srv.caps.have_extjoin = true,
                    "account-notify" => srv.caps.have_accnotify = true,
                    _ => {}
                }
            }
        }
        if sasl_acked {
            self.sasl_begin(server, ts);
        } else {
            self.cap_end_once(server);
        }
    }

    /// Send CAP END exactly once per connection. Registration stalls
    /// until this goes out, and a duplicate is a protocol error, so
    /// every path funnels through this guard.
    pub(crate) fn cap_end_once(&mut self, server: ServerId) {
        let Some(srv) = self.servers.get_mut(&server) else {
            return;
        };
        if srv.sent_capend {
            return;
        }
        srv.sent_capend = true;
        self.send_raw(server, "CAP END".into());
    }

    fn sasl_user(&self, server: ServerId) -> String {
        self.servers
            .get(&server)
            .and_then(|s| s.config.nick.clone())
            .unwrap_or_else(|| self.prefs.username.clone())
    }

    fn sasl_begin(&mut self, server: ServerId, ts: i64) {
        let Some(srv) = self.servers.get_mut(&server) else {
            return;
        };
        if srv.sent_saslauth {
            return;
        }
        let mech = if srv.loginmethod == LoginMethod::SaslExternal && srv.config.use_client_cert {
            Mechanism::External
        } else {
            Mechanism::strongest_password_mech()
        };
        srv.sasl_mech = Some(mech);
        srv.sent_saslauth = true;
        debug!(server = server.0, mech = %mech, "sasl start");
        let user = self.sasl_user(server);
        if let Some(front) = self.front_or_console(server) {
            self.emit(front, EventKind::SaslAuthenticating, &[mech.as_str(), &user], ts);
        }
        self.send_raw(server, format!("AUTHENTICATE {}", mech.as_str()));
    }

    /// Handle an AUTHENTICATE line from the server: either the go-
    /// ahead (`+`), a mechanism list (commas), or a DH challenge
    /// blob.
    pub(crate) fn sasl_challenge(&mut self, server: ServerId, challenge: &str, ts: i64) {
        let Some(mech) = self.servers.get(&server).and_then(|s| s.sasl_mech) else {
            return; // not authenticating; ignore stray challenge
        };

        if challenge.contains(',') {
            // some servers answer with their mechanism list instead
            // of a challenge; re-select under the current ceiling
            let available = sasl::parse_mechanisms(challenge);
            match sasl::choose_from(&available, mech) {
                Some(next) => {
                    if let Some(srv) = self.servers.get_mut(&server) {
                        srv.sasl_mech = Some(next);
                        srv.retry_sasl = true;
                    }
                    self.send_raw(server, format!("AUTHENTICATE {}", next.as_str()));
                }
                None => self.sasl_abort(server, "no shared mechanism", ts),
            }
            return;
        }

        let user = self.sasl_user(server);
        let password = self
            .servers
            .get(&server)
            .and_then(|s| s.config.password.clone());

        match mech {
            Mechanism::Plain => {
                let Some(pass) = password else {
                    self.sasl_abort(server, "no password configured", ts);
                    return;
                };
                let payload = sasl::encode_plain(&user, &pass);
                self.p_authenticate(server, &payload);
            }
            Mechanism::External => {
                self.p_authenticate(server, "");
            }
            #[cfg(feature = "legacy-dh")]
            Mechanism::DhBlowfish | Mechanism::DhAes => {
                let Some(pass) = password else {
                    self.sasl_abort(server, "no password configured", ts);
                    return;
                };
                if challenge == "+" {
                    self.sasl_abort(server, "missing key-exchange challenge", ts);
                    return;
                }
                let result = sasl::dh::DhExchange::from_challenge(challenge).and_then(|ex| {
                    if mech == Mechanism::DhAes {
                        ex.respond_aes(&user, &pass)
                    } else {
                        ex.respond_blowfish(&user, &pass)
                    }
                });
                match result {
                    Ok(payload) => self.p_authenticate(server, &payload),
                    // fail closed: never transmit a partial credential
                    Err(e) => self.sasl_abort(server, &e.to_string(), ts),
                }
            }
            #[allow(unreachable_patterns)]
            _ => self.sasl_abort(server, "mechanism not supported in this build", ts),
        }
    }

    fn sasl_abort(&mut self, server: ServerId, reason: &str, ts: i64) {
        debug!(server = server.0, reason, "sasl abort");
        self.send_raw(server, "AUTHENTICATE *".into());
        if let Some(front) = self.front_or_console(server) {
            self.emit(front, EventKind::SaslFail, &[reason], ts);
        }
    }

    pub(crate) fn sasl_success(&mut self, server: ServerId, text: &str, ts: i64) {
        if let Some(srv) = self.servers.get_mut(&server) {
            let retried = srv.retry_sasl;
            srv.sasl_mech = None;
            srv.retry_sasl = false;
            debug!(server = server.0, retried, "sasl done");
        }
        self.emit_console(server, EventKind::SaslSuccess, &[text], ts);
        self.cap_end_once(server);
    }

    /// A 904/905/906/907 failure: step down one mechanism tier and
    /// retry, or give up and let registration continue.
    pub(crate) fn sasl_failed(&mut self, server: ServerId, text: &str, ts: i64) {
        let next = {
            let Some(srv) = self.servers.get_mut(&server) else {
                return;
            };
            match srv.sasl_mech.and_then(Mechanism::step_down) {
                Some(next) => {
                    srv.sasl_mech = Some(next);
                    srv.retry_sasl = true;
                    Some(next)
                }
                None => {
                    srv.sasl_mech = None;
                    srv.retry_sasl = false;
                    None
                }
            }
        };
        self.emit_console(server, EventKind::SaslFail, &[text], ts);
        match next {
            Some(mech) => {
                debug!(server = server.0, mech = %mech, "sasl retry");
                self.send_raw(server, format!("AUTHENTICATE {}", mech.as_str()));
            }
            None => self.cap_end_once(server),
        }
    }

    /// 908: the server's supported-mechanism list; pick the strongest
    /// one at or below the current tier and retry.
    pub(crate) fn sasl_mechs_advertised(&mut self, server: ServerId, list: &str, ts: i64) {
        let Some(current) = self.servers.get(&server).and_then(|s| s.sasl_mech) else {
            return;
        };
        let available = sasl::parse_mechanisms(list);
        match sasl::choose_from(&available, current) {
            Some(next) => {
                if let Some(srv) = self.servers.get_mut(&server) {
                    srv.sasl_mech = Some(next);
                    srv.retry_sasl = true;
                }
                self.send_raw(server, format!("AUTHENTICATE {}", next.as_str()));
            }
            None => {
                self.emit_console(server, EventKind::SaslFail, &[list], ts);
                if let Some(srv) = self.servers.get_mut(&server) {
                    srv.sasl_mech = None;
                }
                self.cap_end_once(server);
            }
        }
    }
}
