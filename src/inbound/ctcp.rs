//! The CTCP engine: answers, displays, and flood-guards CTCP traffic.
//!
//! ACTION never reaches this module; it is routed as an emote by the
//! PRIVMSG handler before flood counting, since emotes are common and
//! not abuse.

use std::time::{Duration, Instant};

use slirc_wire::ctcp::{Ctcp, CtcpKind};
use slirc_wire::WordsOwned;
use tracing::debug;

use crate::engine::Engine;
use crate::event::EventKind;
use crate::ignore::ig;
use crate::server::ServerId;

impl Engine {
    /// Send our own CTCP PING probe; the round trip is measured
    /// against a monotonic clock when the reply comes back.
    pub fn p_ctcp_ping(&mut self, server: ServerId, nick: &str) {
        let now = Instant::now();
        if let Some(srv) = self.servers.get_mut(&server) {
            srv.lag_sent = Some(now);
        }
        self.p_ctcp(server, nick, "PING LAG");
    }

    pub(crate) fn handle_ctcp_request(
        &mut self,
        server: ServerId,
        nick: &str,
        host: &str,
        target: &str,
        ctcp: &Ctcp<'_>,
        ts: i64,
    ) {
        let mask = format!("{nick}!{host}");
        let now = Instant::now();
        let window = Duration::from_secs(self.prefs.ctcp_flood_time);
        let threshold = self.prefs.ctcp_flood_num;
        let fired = match self.servers.get_mut(&server) {
            Some(srv) => srv.flood.ctcp_hit(now, window, threshold),
            None => return,
        };
        if fired {
            // auto-ignore the offender's host
            let hostname = host.rsplit('@').next().unwrap_or(host);
            let ignore_mask = format!("*!*@{hostname}");
            self.ignore.add(&ignore_mask, ig::CTCP);
            debug!(server = server.0, mask = %ignore_mask, "ctcp flood");
            self.emit_console(server, EventKind::CtcpFloodIgnore, &[&ignore_mask], ts);
            return;
        }
        if self.ignore.check(&mask, ig::CTCP) {
            return;
        }

        let params = ctcp.params.unwrap_or("");
        match &ctcp.kind {
            CtcpKind::Version => {
                if !self.prefs.hide_version {
                    let reply = format!(
                        "VERSION slircc {} [{}]",
                        env!("CARGO_PKG_VERSION"),
                        std::env::consts::OS
                    );
                    self.p_nctcp(server, nick, &reply);
                }
            }
            CtcpKind::Ping => {
                // peer-initiated probe: echo the token back
                self.p_nctcp(server, nick, &format!("PING {params}"));
            }
            CtcpKind::Sound => {
                let name = params.split_whitespace().next().unwrap_or("");
                // a sound name is a bare filename; anything path-like
                // is a traversal attempt
                if name.is_empty() || name.contains('/') || name.contains('\\') {
                    return;
                }
                let sess = self
                    .ctcp_display_session(server, target)
                    .or_else(|| self.front_or_console(server));
                if let Some(sess) = sess {
                    self.emit(sess, EventKind::SoundPlay, &[name, nick], ts);
                }
                return;
            }
            CtcpKind::Dcc => {
                // hand off to the transfer collaborator with quote-
                // aware re-splitting (filenames may contain spaces)
                let sub = WordsOwned::split_quoted(params);
                let mut args: Vec<&str> = vec![nick, host];
                for i in 1..=sub.len() {
                    args.push(sub.word(i));
                }
                if let Some(front) = self.front_or_console(server) {
                    self.emit(front, EventKind::DccRequest, &args, ts);
                }
                return;
            }
            _ => {
                if let Some(template) = self
                    .ctcp_replies
                    .iter()
                    .find(|r| r.name.eq_ignore_ascii_case(ctcp.kind.as_str()))
                    .map(|r| r.template.clone())
                {
                    // the substituted template is a full raw command,
                    // so a reply can be any line the user configured
                    let line = template.replace("%s", nick).replace("%m", params);
                    self.send_raw(server, line);
                }
            }
        }

        let display = if params.is_empty() {
            ctcp.kind.as_str().to_string()
        } else {
            format!("{} {}", ctcp.kind.as_str(), params)
        };
        let sess = self
            .ctcp_display_session(server, target)
            .or_else(|| self.front_or_console(server));
        if let Some(sess) = sess {
            self.emit(sess, EventKind::CtcpRequest, &[nick, &display, target], ts);
        }
    }

    fn ctcp_display_session(
        &self,
        server: ServerId,
        target: &str,
    ) -> Option<crate::session::SessionId> {
        let is_chan = self
            .servers
            .get(&server)
            .map_or(false, |s| s.is_channel(target));
        if is_chan {
            self.find_channel(server, target)
        } else {
            None
        }
    }

    pub(crate) fn handle_ctcp_reply(
        &mut self,
        server: ServerId,
        nick: &str,
        ctcp: &Ctcp<'_>,
        ts: i64,
    ) {
        if ctcp.kind == CtcpKind::Ping {
            // our own probe coming home
            let sent = self.servers.get_mut(&server).and_then(|s| s.lag_sent.take());
            if let Some(sent) = sent {
                let secs = format!("{:.3}", sent.elapsed().as_secs_f64());
                if let Some(front) = self.front_or_console(server) {
                    self.emit(front, EventKind::PingReply, &[nick, &secs], ts);
                }
                return;
            }
        }
        let params = ctcp.params.unwrap_or("");
        let display = if params.is_empty() {
            ctcp.kind.as_str().to_string()
        } else {
            format!("{} {}", ctcp.kind.as_str(), params)
        };
        if let Some(front) = self.front_or_console(server) {
            self.emit(front, EventKind::CtcpReply, &[nick, &display], ts);
        }
    }
}
