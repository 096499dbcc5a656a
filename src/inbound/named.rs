//! Textual command dispatch (JOIN, PART, PRIVMSG, CAP, ...).
//!
//! A plain string match on the command token; the old packed-integer
//! comparison trick was dropped, it bought nothing here.

use std::time::Instant;

use slirc_wire::ctcp::{Ctcp, CtcpKind};
use slirc_wire::Words;

use crate::config::NoticeRouting;
use crate::engine::Engine;
use crate::event::EventKind;
use crate::ignore::ig;
use crate::inbound::{mentions_nick, split_prefix, strip_colon};
use crate::server::ServerId;
use crate::session::SessionKind;

impl Engine {
    /// Dispatch a prefixed non-numeric line. `word(1)` is the source
    /// prefix, `word(2)` the command.
    pub(crate) fn process_named_msg(&mut self, server: ServerId, words: &Words, ts: i64) {
        let prefix = words.word(1).to_string();
        match words.word(2) {
            "JOIN" => self.m_join(server, &prefix, words, ts),
            "PART" => self.m_part(server, &prefix, words, ts),
            "KICK" => self.m_kick(server, &prefix, words, ts),
            "QUIT" => self.m_quit(server, &prefix, words, ts),
            "NICK" => self.m_nick(server, &prefix, words, ts),
            "MODE" => self.m_mode(server, &prefix, words, ts),
            "TOPIC" => self.m_topic(server, &prefix, words, ts),
            "PRIVMSG" => self.m_privmsg(server, &prefix, words, ts),
            "NOTICE" => self.m_notice(server, &prefix, words, ts),
            "WALLOPS" => {
                let (nick, _) = split_prefix(&prefix);
                let text = strip_colon(words.word_eol(3)).to_string();
                if let Some(sess) = self.front_or_console(server) {
                    self.emit(sess, EventKind::Wallops, &[nick, &text], ts);
                }
            }
            "INVITE" => self.m_invite(server, &prefix, words, ts),
            "AWAY" => self.m_away_notify(server, &prefix, words, ts),
            "ACCOUNT" => self.m_account(server, &prefix, words, ts),
            "CAP" => self.process_cap(server, words, ts),
            "AUTHENTICATE" => self.sasl_challenge(server, words.word(3), ts),
            "PING" => {
                let payload = strip_colon(words.word_eol(3)).to_string();
                self.p_pong(server, &payload);
            }
            "PONG" => {} // keepalive answer, nothing to show
            _ => {
                let raw = words.word_eol(1).to_string();
                self.emit_console(server, EventKind::Garbage, &[&raw], ts);
            }
        }
    }

    /// Dispatch an unprefixed line; `word(1)` is the command.
    pub(crate) fn process_named_servermsg(&mut self, server: ServerId, words: &Words, ts: i64) {
        match words.word(1) {
            "PING" => {
                let payload = strip_colon(words.word_eol(2)).to_string();
                self.p_pong(server, &payload);
            }
            "ERROR" => {
                let text = strip_colon(words.word_eol(2)).to_string();
                self.emit_console(server, EventKind::ServerError, &[&text], ts);
            }
            "NOTICE" => {
                let text = strip_colon(words.word_eol(3)).to_string();
                let host = self
                    .servers
                    .get(&server)
                    .map(|s| s.hostname.clone())
                    .unwrap_or_default();
                self.route_server_notice(server, &text, &host, ts);
            }
            "AUTHENTICATE" => self.sasl_challenge(server, words.word(2), ts),
            _ => {
                let raw = words.word_eol(1).to_string();
                self.emit_console(server, EventKind::ServerText, &[&raw], ts);
            }
        }
    }

    fn is_self(&self, server: ServerId, nick: &str) -> bool {
        self.servers
            .get(&server)
            .map_or(false, |s| s.name_eq(&s.nick, nick))
    }

    fn m_join(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (nick, host) = split_prefix(prefix);
        let channel = strip_colon(words.word(3)).to_string();
        let extjoin = self
            .servers
            .get(&server)
            .map_or(false, |s| s.caps.have_extjoin);
        let account = if extjoin {
            let a = words.word(4);
            if a == "*" {
                ""
            } else {
                a
            }
        } else {
            ""
        }
        .to_string();

        if self.is_self(server, nick) {
            let use_who = self.servers.get(&server).map_or(false, |s| s.use_who);
            let sess = self.resolve_or_create_on_join(server, &channel);
            self.emit(sess, EventKind::YouJoin, &[&channel], ts);
            self.p_mode(server, &channel, "");
            if use_who {
                if let Some(s) = self.sessions.get_mut(&sess) {
                    s.doing_who = true;
                }
                self.p_who_channel(server, &channel);
            }
        } else if let Some(sess) = self.find_channel(server, &channel) {
            self.users.add(sess, nick, host, &account);
            self.emit(sess, EventKind::Join, &[nick, &channel, host, &account], ts);
        }
    }

    fn m_part(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (nick, host) = split_prefix(prefix);
        let channel = strip_colon(words.word(3)).to_string();
        let reason = strip_colon(words.word_eol(4)).to_string();
        let Some(sess) = self.find_channel(server, &channel) else {
            return;
        };
        if self.is_self(server, nick) {
            if reason.is_empty() {
                self.emit(sess, EventKind::YouPart, &[&channel], ts);
            } else {
                self.emit(sess, EventKind::YouPartReason, &[&channel, &reason], ts);
            }
            self.users.clear(sess);
            if let Some(s) = self.sessions.get_mut(&sess) {
                s.channel.clear();
                s.waitchannel.clear();
            }
        } else {
            self.users.remove(sess, nick);
            if reason.is_empty() {
                self.emit(sess, EventKind::Part, &[nick, &channel, host], ts);
            } else {
                self.emit(sess, EventKind::PartReason, &[nick, &channel, host, &reason], ts);
            }
        }
    }

    fn m_kick(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (kicker, _) = split_prefix(prefix);
        let channel = words.word(3).to_string();
        let victim = words.word(4).to_string();
        let reason = strip_colon(words.word_eol(5)).to_string();
        let Some(sess) = self.find_channel(server, &channel) else {
            return;
        };
        if self.is_self(server, &victim) {
            self.emit(sess, EventKind::YouKicked, &[kicker, &channel, &reason], ts);
            self.users.clear(sess);
            let rejoin_key = if self.prefs.auto_rejoin {
                self.sessions.get(&sess).map(|s| s.channelkey.clone())
            } else {
                None
            };
            if let Some(s) = self.sessions.get_mut(&sess) {
                s.channel.clear();
                if rejoin_key.is_some() {
                    s.waitchannel = channel.clone();
                }
            }
            if let Some(key) = rejoin_key {
                self.p_join(server, &channel, Some(&key));
            }
        } else {
            self.users.remove(sess, &victim);
            self.emit(sess, EventKind::Kick, &[kicker, &victim, &channel, &reason], ts);
        }
    }

    fn m_quit(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (nick, host) = split_prefix(prefix);
        let reason = strip_colon(words.word_eol(3)).to_string();
        for sess in self.sessions_of(server) {
            let is_channel = self
                .sessions
                .get(&sess)
                .map_or(false, |s| s.kind == SessionKind::Channel);
            if is_channel && self.users.remove(sess, nick) {
                self.emit(sess, EventKind::Quit, &[nick, &reason, host], ts);
            }
        }
        if let Some(dialog) = self.find_dialog(server, nick) {
            self.emit(dialog, EventKind::Quit, &[nick, &reason, host], ts);
        }
        if self.is_notified(nick) {
            if let Some(front) = self.front_or_console(server) {
                self.emit(front, EventKind::NotifyOffline, &[nick], ts);
            }
        }
    }

    fn m_nick(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (old, _) = split_prefix(prefix);
        let new = strip_colon(words.word(3)).to_string();
        let was_self = self.is_self(server, old);
        if was_self {
            if let Some(srv) = self.servers.get_mut(&server) {
                srv.nick = new.clone();
            }
        }
        for sess in self.sessions_of(server) {
            if self.users.find(sess, old) {
                self.users.rename(sess, old, &new);
                let kind = if was_self {
                    EventKind::YourNick
                } else {
                    EventKind::ChangeNick
                };
                self.emit(sess, kind, &[old, &new], ts);
            }
        }
        if let Some(dialog) = self.find_dialog(server, old) {
            if let Some(s) = self.sessions.get_mut(&dialog) {
                s.channel = new.clone();
            }
            self.emit(dialog, EventKind::ChangeNick, &[old, &new], ts);
        }
        if was_self {
            self.emit_console(server, EventKind::YourNick, &[old, &new], ts);
        }
    }

    fn m_mode(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let target = words.word(3).to_string();
        let modes = strip_colon(words.word_eol(4)).to_string();
        // mode-letter semantics belong to an external parser; route
        // the raw line to whoever displays the target
        match self.find_channel(server, &target) {
            Some(sess) => self.emit(sess, EventKind::RawModes, &[prefix, &target, &modes], ts),
            None => self.emit_console(server, EventKind::RawModes, &[prefix, &target, &modes], ts),
        }
    }

    fn m_topic(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (nick, _) = split_prefix(prefix);
        let channel = words.word(3).to_string();
        let topic = strip_colon(words.word_eol(4)).to_string();
        match self.find_channel(server, &channel) {
            Some(sess) => self.emit(sess, EventKind::TopicChange, &[nick, &topic, &channel], ts),
            None => self.emit_console(server, EventKind::TopicChange, &[nick, &topic, &channel], ts),
        }
    }

    fn m_invite(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (nick, _) = split_prefix(prefix);
        if self.ignore.check(prefix, ig::INVI) {
            return;
        }
        let channel = strip_colon(words.word(4)).to_string();
        let servername = self
            .servers
            .get(&server)
            .map(|s| s.servername.clone())
            .unwrap_or_default();
        if let Some(front) = self.front_or_console(server) {
            self.emit(front, EventKind::Invited, &[&channel, nick, &servername], ts);
        }
    }

    fn m_away_notify(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (nick, _) = split_prefix(prefix);
        let msg = strip_colon(words.word_eol(3)).to_string();
        let away = !msg.is_empty();
        for sess in self.sessions_of(server) {
            if self.users.find(sess, nick) {
                self.users.set_away(sess, nick, away);
            }
        }
        if let Some(srv) = self.servers.get_mut(&server) {
            if away {
                srv.cache_away(nick, &msg);
            } else {
                srv.uncache_away(nick);
            }
        }
        if self.is_notified(nick) {
            if let Some(front) = self.front_or_console(server) {
                let kind = if away {
                    EventKind::NotifyAway
                } else {
                    EventKind::NotifyBack
                };
                self.emit(front, kind, &[nick], ts);
            }
        }
    }

    fn m_account(&mut self, server: ServerId, prefix: &str, words: &Words, _ts: i64) {
        let (nick, _) = split_prefix(prefix);
        let account = strip_colon(words.word(3));
        let account = if account == "*" { "" } else { account };
        for sess in self.sessions_of(server) {
            if self.users.find(sess, nick) {
                self.users.set_account(sess, nick, account);
            }
        }
    }

    fn m_privmsg(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (nick, host) = split_prefix(prefix);
        let target = words.word(3).to_string();
        let mut text = strip_colon(words.word_eol(4)).to_string();
        let Some(srv) = self.servers.get(&server) else {
            return;
        };
        let is_chan = srv.is_channel(&target);
        let my_nick = srv.nick.clone();
        let casemap = srv.casemap;
        if srv.caps.have_idmsg && (text.starts_with('+') || text.starts_with('-')) {
            text.remove(0);
        }

        if let Some(ctcp) = Ctcp::parse(&text) {
            if ctcp.kind == CtcpKind::Action {
                let action = ctcp.params.unwrap_or("");
                self.route_action(server, nick, host, &target, action, is_chan, ts);
            } else {
                self.handle_ctcp_request(server, nick, host, &target, &ctcp, ts);
            }
            return;
        }

        if is_chan {
            if self.ignore.check(prefix, ig::CHAN) {
                return;
            }
            let hilight = mentions_nick(&text, &my_nick, casemap);
            let kind = if hilight {
                EventKind::ChannelMsgHilight
            } else {
                EventKind::ChannelMessage
            };
            match self.find_channel(server, &target) {
                Some(sess) => {
                    if let Some(s) = self.sessions.get_mut(&sess) {
                        s.mark_said(hilight);
                    }
                    self.emit(sess, kind, &[nick, &text], ts);
                }
                None => self.emit_console(server, kind, &[nick, &text], ts),
            }
        } else {
            if self.ignore.check(prefix, ig::PRIV) {
                return;
            }
            let now = Instant::now();
            let window = std::time::Duration::from_secs(self.prefs.msg_flood_time);
            let threshold = self.prefs.msg_flood_num;
            let may_open = {
                let Some(srv) = self.servers.get_mut(&server) else {
                    return;
                };
                srv.flood.privmsg_hit(now, window, threshold);
                self.prefs.auto_open_dialog && srv.flood.can_autoopen(now)
            };
            if let Some(sess) = self.dialog_for(server, nick, may_open) {
                if let Some(s) = self.sessions.get_mut(&sess) {
                    s.mark_said(true);
                }
                self.emit(sess, EventKind::PrivateMessage, &[nick, &text], ts);
            }
        }
    }

    pub(crate) fn route_action(
        &mut self,
        server: ServerId,
        nick: &str,
        host: &str,
        target: &str,
        text: &str,
        is_chan: bool,
        ts: i64,
    ) {
        let mask = format!("{nick}!{host}");
        let (my_nick, casemap) = match self.servers.get(&server) {
            Some(s) => (s.nick.clone(), s.casemap),
            None => return,
        };
        if is_chan {
            if self.ignore.check(&mask, ig::CHAN) {
                return;
            }
            let hilight = mentions_nick(text, &my_nick, casemap);
            let kind = if hilight {
                EventKind::ChannelActionHilight
            } else {
                EventKind::ChannelAction
            };
            match self.find_channel(server, target) {
                Some(sess) => {
                    if let Some(s) = self.sessions.get_mut(&sess) {
                        s.mark_said(hilight);
                    }
                    self.emit(sess, kind, &[nick, text], ts);
                }
                None => self.emit_console(server, kind, &[nick, text], ts),
            }
        } else {
            if self.ignore.check(&mask, ig::PRIV) {
                return;
            }
            let now = Instant::now();
            let may_open = self
                .servers
                .get(&server)
                .map_or(false, |s| self.prefs.auto_open_dialog && s.flood.can_autoopen(now));
            if let Some(sess) = self.dialog_for(server, nick, may_open) {
                self.emit(sess, EventKind::PrivateAction, &[nick, text], ts);
            }
        }
    }

    fn m_notice(&mut self, server: ServerId, prefix: &str, words: &Words, ts: i64) {
        let (nick, host) = split_prefix(prefix);
        let target = words.word(3).to_string();
        let mut text = strip_colon(words.word_eol(4)).to_string();
        if host.is_empty() {
            // no user@host means the server itself is talking
            self.route_server_notice(server, &text, nick, ts);
            return;
        }
        let idmsg = self
            .servers
            .get(&server)
            .map_or(false, |s| s.caps.have_idmsg);
        if idmsg && (text.starts_with('+') || text.starts_with('-')) {
            text.remove(0);
        }
        if let Some(ctcp) = Ctcp::parse(&text) {
            self.handle_ctcp_reply(server, nick, &ctcp, ts);
            return;
        }
        if self.ignore.check(prefix, ig::NOTI) {
            return;
        }
        let sess = if self
            .servers
            .get(&server)
            .map_or(false, |s| s.is_channel(&target))
        {
            self.find_channel(server, &target)
                .or_else(|| self.front_or_console(server))
        } else {
            match self.prefs.notice_routing {
                NoticeRouting::Front => self.front_or_console(server),
                NoticeRouting::Server => {
                    self.servers.get(&server).and_then(|s| s.server_session)
                }
                NoticeRouting::Extra => self.notices_session_or_create(server, false),
            }
        };
        if let Some(sess) = sess {
            self.emit(sess, EventKind::NoticeRecv, &[nick, &text], ts);
        }
    }

    fn route_server_notice(&mut self, server: ServerId, text: &str, from: &str, ts: i64) {
        let sess = match self.prefs.snotice_routing {
            NoticeRouting::Front => self.front_or_console(server),
            NoticeRouting::Server => self.servers.get(&server).and_then(|s| s.server_session),
            NoticeRouting::Extra => self.notices_session_or_create(server, true),
        };
        if let Some(sess) = sess {
            self.emit(sess, EventKind::ServerNotice, &[text, from], ts);
        }
    }
}
