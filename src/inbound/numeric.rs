//! Numeric reply dispatch.

use slirc_wire::numeric::*;
use slirc_wire::{Casemap, Words};

use crate::engine::Engine;
use crate::event::EventKind;
use crate::inbound::strip_colon;
use crate::server::ServerId;

/// ircd-version prefixes with known MODE batching quirks. Matched
/// against the 004 version token; best-effort compatibility shims,
/// extended as new families show up.
const IRCD_TABLE: &[(&str, bool, u32)] = &[
    ("bahamut", true, 6),
    ("u2.10.", true, 3),
    ("glx2", true, 3),
];

impl Engine {
    pub(crate) fn process_numeric(&mut self, server: ServerId, code: u16, words: &Words, ts: i64) {
        match code {
            RPL_WELCOME => self.n_welcome(server, words, ts),
            RPL_MYINFO => self.n_myinfo(server, words, ts),
            RPL_ISUPPORT => self.n_isupport(server, words, ts),

            RPL_AWAY => self.n_away(server, words, ts),
            RPL_ISON => self.n_ison(server, words, ts),
            RPL_UNAWAY => self.n_self_back(server, ts),
            RPL_NOWAWAY => self.n_self_away(server, ts),

            RPL_WHOISUSER => {
                if let Some(s) = self.servers.get_mut(&server) {
                    s.inside_whois = true;
                }
                self.whois_emit(
                    server,
                    EventKind::WhoisName,
                    &[
                        words.word(4),
                        words.word(5),
                        words.word(6),
                        strip_colon(words.word_eol(8)),
                    ],
                    ts,
                );
            }
            RPL_WHOISSERVER => self.whois_emit(
                server,
                EventKind::WhoisServer,
                &[words.word(4), words.word(5), strip_colon(words.word_eol(6))],
                ts,
            ),
            RPL_WHOISOPERATOR => self.whois_emit(
                server,
                EventKind::WhoisOper,
                &[words.word(4), strip_colon(words.word_eol(5))],
                ts,
            ),
            RPL_WHOISIDLE => self.whois_emit(
                server,
                EventKind::WhoisIdle,
                &[words.word(4), words.word(5), words.word(6)],
                ts,
            ),
            RPL_ENDOFWHOIS => self.n_end_of_whois(server, words, ts),
            RPL_WHOISCHANNELS => self.whois_emit(
                server,
                EventKind::WhoisChannels,
                &[words.word(4), strip_colon(words.word_eol(5))],
                ts,
            ),
            RPL_WHOISSPECIAL => self.whois_emit(
                server,
                EventKind::WhoisSpecial,
                &[words.word(4), strip_colon(words.word_eol(5))],
                ts,
            ),
            RPL_WHOISLOGGEDIN => self.whois_emit(
                server,
                EventKind::WhoisAccount,
                &[words.word(4), words.word(5)],
                ts,
            ),

            RPL_WHOWASUSER => self.front_emit(
                server,
                EventKind::WhowasName,
                &[
                    words.word(4),
                    words.word(5),
                    words.word(6),
                    strip_colon(words.word_eol(8)),
                ],
                ts,
            ),
            RPL_ENDOFWHOWAS => {
                self.front_emit(server, EventKind::WhowasEnd, &[words.word(4)], ts)
            }

            RPL_LISTSTART => self.emit_console(server, EventKind::ChannelListHead, &[], ts),
            RPL_LIST => self.emit_console(
                server,
                EventKind::ChannelListEntry,
                &[words.word(4), words.word(5), strip_colon(words.word_eol(6))],
                ts,
            ),
            RPL_LISTEND => self.emit_console(server, EventKind::ChannelListEnd, &[], ts),

            RPL_CHANNELMODEIS => self.n_channel_modes(server, words, ts),
            RPL_CREATIONTIME => self.n_channel_emit(
                server,
                words.word(4),
                EventKind::ChannelCreated,
                &[words.word(4), words.word(5)],
                ts,
            ),
            RPL_TOPIC => self.n_channel_emit(
                server,
                words.word(4),
                EventKind::Topic,
                &[words.word(4), strip_colon(words.word_eol(5))],
                ts,
            ),
            RPL_TOPICWHOTIME => self.n_topic_date(server, words, ts),
            RPL_INVITING => self.front_emit(
                server,
                EventKind::InviteConfirm,
                &[words.word(4), words.word(5)],
                ts,
            ),

            RPL_INVITELIST | RPL_EXCEPTLIST | RPL_BANLIST | RPL_QUIETLIST => {
                self.n_list_entry(server, code, words, ts)
            }
            RPL_ENDOFINVITELIST | RPL_ENDOFEXCEPTLIST | RPL_ENDOFBANLIST | RPL_ENDOFQUIETLIST => {
                self.n_list_end(server, code, words, ts)
            }

            RPL_WHOREPLY => self.n_who_reply(server, words, ts),
            RPL_WHOSPCRPL => self.n_whox_reply(server, words, ts),
            RPL_ENDOFWHO => self.n_end_of_who(server, words, ts),
            RPL_NAMREPLY => self.n_names(server, words, ts),
            RPL_ENDOFNAMES => self.n_end_of_names(server, words, ts),

            RPL_MOTD | RPL_MOTDSTART => self.emit_console(
                server,
                EventKind::Motd,
                &[strip_colon(words.word_eol(4))],
                ts,
            ),
            RPL_ENDOFMOTD | ERR_NOMOTD => self.n_end_of_motd(server, ts),

            ERR_ERRONEUSNICKNAME | ERR_NICKNAMEINUSE | ERR_UNAVAILRESOURCE => {
                self.n_nick_clash(server, words, ts)
            }

            ERR_CHANNELISFULL => {
                self.front_emit(server, EventKind::ChannelFull, &[words.word(4)], ts)
            }
            ERR_INVITEONLYCHAN => {
                self.front_emit(server, EventKind::InviteOnlyChan, &[words.word(4)], ts)
            }
            ERR_BANNEDFROMCHAN => {
                self.front_emit(server, EventKind::BannedFromChan, &[words.word(4)], ts)
            }
            ERR_BADCHANNELKEY => {
                self.front_emit(server, EventKind::BadChannelKey, &[words.word(4)], ts)
            }

            RPL_MONONLINE => self.n_monitor(server, words, EventKind::NotifyOnline, ts),
            RPL_MONOFFLINE => self.n_monitor(server, words, EventKind::NotifyOffline, ts),

            RPL_LOGGEDIN => self.emit_console(
                server,
                EventKind::SaslLoggedIn,
                &[words.word(5), strip_colon(words.word_eol(6))],
                ts,
            ),
            RPL_LOGGEDOUT => self.emit_console(
                server,
                EventKind::SaslLoggedOut,
                &[strip_colon(words.word_eol(4))],
                ts,
            ),
            RPL_SASLSUCCESS => self.sasl_success(server, strip_colon(words.word_eol(4)), ts),
            ERR_SASLFAIL | ERR_SASLTOOLONG | ERR_SASLABORTED | ERR_SASLALREADY => {
                self.sasl_failed(server, strip_colon(words.word_eol(4)), ts)
            }
            RPL_SASLMECHS => self.sasl_mechs_advertised(server, words.word(4), ts),

            _ => self.generic_numeric(server, words, ts),
        }
    }

    /// Shared generic-print fallback: channel session if the target
    /// is channel-shaped, else an existing dialog, else the console.
    fn generic_numeric(&mut self, server: ServerId, words: &Words, ts: i64) {
        let text = strip_colon(words.word_eol(4));
        if text.is_empty() {
            return;
        }
        if let Some(sess) = self.fallback_session(server, words.word(4)) {
            self.emit(sess, EventKind::ServerText, &[text], ts);
        }
    }

    fn front_emit(&mut self, server: ServerId, kind: EventKind, args: &[&str], ts: i64) {
        if let Some(sess) = self.front_or_console(server) {
            self.emit(sess, kind, args, ts);
        }
    }

    fn whois_emit(&mut self, server: ServerId, kind: EventKind, args: &[&str], ts: i64) {
        if self
            .servers
            .get(&server)
            .map_or(true, |s| s.skip_next_whois)
        {
            return;
        }
        self.front_emit(server, kind, args, ts);
    }

    fn n_welcome(&mut self, server: ServerId, words: &Words, ts: i64) {
        let ip_from_server = self.prefs.ip_from_server;
        let Some(srv) = self.servers.get_mut(&server) else {
            return;
        };
        if srv.connected {
            // bouncer replay; login-start must fire once
            return;
        }
        srv.connected = true;
        srv.connecting = false;
        srv.nick_acquired = true;
        srv.nick = words.word(3).to_string();
        srv.servername = words.word(1).to_string();
        // One network family lacks usable WHO; its welcome line leaks
        // our visible address instead.
        if words.word(7).starts_with("PTnet") {
            srv.use_who = false;
            if ip_from_server {
                if let Some((_, ip)) = words.word(10).rsplit_once('@') {
                    srv.found_ip = Some(ip.to_string());
                }
            }
        }
        let servername = srv.servername.clone();
        let nick = srv.nick.clone();
        self.emit_console(server, EventKind::Connected, &[&servername, &nick], ts);
    }

    fn n_myinfo(&mut self, server: ServerId, words: &Words, ts: i64) {
        if let Some(srv) = self.servers.get_mut(&server) {
            let version = words.word(5).to_ascii_lowercase();
            for (prefix, listargs, modes) in IRCD_TABLE {
                if version.starts_with(prefix) {
                    srv.use_listargs = *listargs;
                    srv.modes_per_line = *modes;
                    break;
                }
            }
        }
        self.generic_numeric(server, words, ts);
    }

    fn n_isupport(&mut self, server: ServerId, words: &Words, ts: i64) {
        if let Some(srv) = self.servers.get_mut(&server) {
            for i in 4..=slirc_wire::WORD_LIMIT {
                let token = words.word(i);
                if token.is_empty() || token.starts_with(':') {
                    break;
                }
                match token.split_once('=') {
                    Some(("CASEMAPPING", v)) => srv.casemap = Casemap::from_isupport(v),
                    Some(("CHANTYPES", v)) => srv.chantypes = v.to_string(),
                    Some(("MODES", v)) => {
                        if let Ok(n) = v.parse() {
                            srv.modes_per_line = n;
                        }
                    }
                    Some(("WHOX", _)) => srv.caps.have_whox = true,
                    None => match token {
                        "WHOX" => srv.caps.have_whox = true,
                        "EXCEPTS" => srv.have_except = true,
                        "INVEX" => srv.have_invite = true,
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
        self.generic_numeric(server, words, ts);
    }

    fn n_away(&mut self, server: ServerId, words: &Words, ts: i64) {
        let nick = words.word(4).to_string();
        let msg = strip_colon(words.word_eol(5)).to_string();
        let inside = self
            .servers
            .get(&server)
            .map_or(false, |s| s.inside_whois);
        if inside {
            self.whois_emit(server, EventKind::WhoisAway, &[&nick, &msg], ts);
            return;
        }
        let show_once = self.prefs.away_show_once;
        let show = match self.servers.get_mut(&server) {
            Some(srv) if show_once => srv.cache_away(&nick, &msg),
            Some(_) => true,
            None => return,
        };
        if show {
            if let Some(sess) = self.find_session_from_nick(server, &nick) {
                self.emit(sess, EventKind::AwayInfo, &[&nick, &msg], ts);
            }
        }
    }

    fn n_ison(&mut self, server: ServerId, words: &Words, ts: i64) {
        let online = strip_colon(words.word_eol(4)).to_string();
        for nick in online.split_whitespace() {
            if self.is_notified(nick) {
                self.front_emit(server, EventKind::NotifyOnline, &[nick], ts);
            }
        }
    }

    fn n_self_back(&mut self, server: ServerId, ts: i64) {
        if let Some(srv) = self.servers.get_mut(&server) {
            srv.is_away = false;
        }
        self.front_emit(server, EventKind::SelfBack, &[], ts);
    }

    fn n_self_away(&mut self, server: ServerId, ts: i64) {
        if let Some(srv) = self.servers.get_mut(&server) {
            srv.is_away = true;
        }
        self.front_emit(server, EventKind::SelfAway, &[], ts);
    }

    fn n_end_of_whois(&mut self, server: ServerId, words: &Words, ts: i64) {
        let Some(srv) = self.servers.get_mut(&server) else {
            return;
        };
        // Resets even when the burst was suppressed.
        let was_skipped = srv.skip_next_whois;
        srv.skip_next_whois = false;
        srv.inside_whois = false;
        if !was_skipped {
            self.front_emit(server, EventKind::WhoisEnd, &[words.word(4)], ts);
        }
    }

    fn n_channel_modes(&mut self, server: ServerId, words: &Words, ts: i64) {
        let channel = words.word(4).to_string();
        let modes = words.word_eol(5).to_string();
        if let Some(sess) = self.find_channel(server, &channel) {
            let suppressed = self.sessions.get_mut(&sess).map_or(false, |s| {
                let was = s.ignore_mode;
                s.ignore_mode = false;
                was
            });
            if !suppressed {
                self.emit(sess, EventKind::ChannelModes, &[&channel, &modes], ts);
            }
        } else {
            self.emit_console(server, EventKind::ChannelModes, &[&channel, &modes], ts);
        }
    }

    fn n_channel_emit(
        &mut self,
        server: ServerId,
        channel: &str,
        kind: EventKind,
        args: &[&str],
        ts: i64,
    ) {
        match self.find_channel(server, channel) {
            Some(sess) => self.emit(sess, kind, args, ts),
            None => self.emit_console(server, kind, args, ts),
        }
    }

    fn n_topic_date(&mut self, server: ServerId, words: &Words, ts: i64) {
        let channel = words.word(4).to_string();
        if let Some(sess) = self.find_channel(server, &channel) {
            let suppressed = self.sessions.get_mut(&sess).map_or(false, |s| {
                let was = s.ignore_date;
                s.ignore_date = false;
                was
            });
            if suppressed {
                return;
            }
        }
        self.n_channel_emit(
            server,
            &channel,
            EventKind::TopicDate,
            &[&channel, words.word(5), words.word(6)],
            ts,
        );
    }

    fn n_list_entry(&mut self, server: ServerId, code: u16, words: &Words, ts: i64) {
        let channel = words.word(4);
        // 728 carries an extra mode letter before the mask
        let base = if code == RPL_QUIETLIST { 6 } else { 5 };
        let kind = match code {
            RPL_INVITELIST => EventKind::InviteList,
            RPL_EXCEPTLIST => EventKind::ExemptList,
            RPL_QUIETLIST => EventKind::QuietList,
            _ => EventKind::BanList,
        };
        self.n_channel_emit(
            server,
            channel,
            kind,
            &[
                channel,
                words.word(base),
                words.word(base + 1),
                words.word(base + 2),
            ],
            ts,
        );
    }

    fn n_list_end(&mut self, server: ServerId, code: u16, words: &Words, ts: i64) {
        let channel = words.word(4).to_string();
        let kind = match code {
            RPL_ENDOFINVITELIST => EventKind::InviteListEnd,
            RPL_ENDOFEXCEPTLIST => EventKind::ExemptListEnd,
            RPL_ENDOFQUIETLIST => EventKind::QuietListEnd,
            _ => EventKind::BanListEnd,
        };
        if let Some(sess) = self.find_channel(server, &channel) {
            if let Some(s) = self.sessions.get_mut(&sess) {
                let solicited = match code {
                    RPL_ENDOFINVITELIST => std::mem::take(&mut s.invite_list_solicited),
                    RPL_ENDOFEXCEPTLIST => std::mem::take(&mut s.exempt_list_solicited),
                    RPL_ENDOFQUIETLIST => std::mem::take(&mut s.quiet_list_solicited),
                    _ => std::mem::take(&mut s.ban_list_solicited),
                };
                // a solicited list query is answered with the list
                // followed by an informational 324; eat that one
                if solicited {
                    s.ignore_mode = true;
                }
            }
        }
        self.n_channel_emit(server, &channel, kind, &[&channel], ts);
    }

    fn n_who_reply(&mut self, server: ServerId, words: &Words, ts: i64) {
        let channel = words.word(4).to_string();
        if let Some(sess) = self.find_channel(server, &channel) {
            if self.sessions.get(&sess).map_or(false, |s| s.doing_who) {
                let nick = words.word(8);
                let away = words.word(9).contains('G');
                self.users.set_away(sess, nick, away);
                return;
            }
        }
        self.generic_numeric(server, words, ts);
    }

    fn n_whox_reply(&mut self, server: ServerId, words: &Words, ts: i64) {
        if words.word(4) != WHOX_QUERYTYPE {
            self.generic_numeric(server, words, ts);
            return;
        }
        let channel = words.word(5).to_string();
        if let Some(sess) = self.find_channel(server, &channel) {
            if self.sessions.get(&sess).map_or(false, |s| s.doing_who) {
                let nick = words.word(9);
                let away = words.word(10).contains('G');
                let account = words.word(11);
                self.users.set_away(sess, nick, away);
                if account != "0" {
                    self.users.set_account(sess, nick, account);
                }
                return;
            }
        }
        self.generic_numeric(server, words, ts);
    }

    fn n_end_of_who(&mut self, server: ServerId, words: &Words, ts: i64) {
        let target = words.word(4).to_string();
        if let Some(sess) = self.find_channel(server, &target) {
            let was_silent = self.sessions.get_mut(&sess).map_or(false, |s| {
                let was = s.doing_who;
                s.doing_who = false;
                was
            });
            if was_silent {
                return;
            }
        }
        self.generic_numeric(server, words, ts);
    }

    fn n_names(&mut self, server: ServerId, words: &Words, ts: i64) {
        let channel = words.word(5).to_string();
        let names = strip_colon(words.word_eol(6)).to_string();
        let uhnames = self
            .servers
            .get(&server)
            .map_or(false, |s| s.caps.have_uhnames);
        if let Some(sess) = self.find_channel(server, &channel) {
            for raw in names.split_whitespace() {
                let stripped = raw.trim_start_matches(['@', '%', '+', '&', '~']);
                let (nick, host) = match stripped.split_once('!') {
                    Some((n, h)) if uhnames => (n, h),
                    _ => (stripped, ""),
                };
                if !nick.is_empty() {
                    self.users.add(sess, nick, host, "");
                }
            }
            let silent = self.sessions.get(&sess).map_or(false, |s| s.ignore_names);
            if !silent {
                self.emit(sess, EventKind::NamesList, &[&channel, &names], ts);
            }
        } else {
            // reply for a tab closed mid-flight; show it, don't fail
            self.emit_console(server, EventKind::NamesList, &[&channel, &names], ts);
        }
    }

    fn n_end_of_names(&mut self, server: ServerId, words: &Words, ts: i64) {
        let channel = words.word(4).to_string();
        if let Some(sess) = self.find_channel(server, &channel) {
            let silent = self.sessions.get_mut(&sess).map_or(false, |s| {
                let was = s.ignore_names;
                s.ignore_names = false;
                was
            });
            if silent {
                return;
            }
        }
        if let Some(sess) = self.names_session(server, &channel) {
            self.emit(sess, EventKind::EndOfNames, &[&channel], ts);
        }
    }

    fn n_end_of_motd(&mut self, server: ServerId, ts: i64) {
        let Some(srv) = self.servers.get_mut(&server) else {
            return;
        };
        if srv.end_of_motd {
            return;
        }
        srv.end_of_motd = true;
        let favorites = srv.config.favorites.clone();
        let nickserv = if srv.loginmethod == crate::config::LoginMethod::NickServ {
            srv.config.password.clone()
        } else {
            None
        };
        self.emit_console(server, EventKind::EndOfMotd, &[], ts);
        if let Some(pass) = nickserv {
            self.p_privmsg(server, "NickServ", &format!("IDENTIFY {pass}"));
        }
        if !favorites.is_empty() {
            self.p_join_list(server, &favorites);
        }
    }

    fn n_nick_clash(&mut self, server: ServerId, words: &Words, ts: i64) {
        let bad = words.word(4).to_string();
        let reason = strip_colon(words.word_eol(5)).to_string();
        let registered = self
            .servers
            .get(&server)
            .map_or(true, |s| s.connected || s.nick_acquired);
        if registered {
            self.front_emit(server, EventKind::NickError, &[&bad, &reason], ts);
            return;
        }
        let next = {
            let Some(srv) = self.servers.get_mut(&server) else {
                return;
            };
            srv.nickcount += 1;
            let candidate = self.prefs.nick_candidate(srv.nickcount).map(str::to_owned);
            if let Some(ref n) = candidate {
                srv.nick = n.clone();
            }
            candidate
        };
        match next {
            Some(n) => {
                self.emit_console(server, EventKind::NickClash, &[&bad, &n], ts);
                self.p_nick(server, &n);
            }
            None => self.emit_console(server, EventKind::NickFail, &[&bad], ts),
        }
    }

    fn n_monitor(&mut self, server: ServerId, words: &Words, kind: EventKind, ts: i64) {
        let targets = strip_colon(words.word_eol(4)).to_string();
        for target in targets.split(',') {
            let nick = target.split('!').next().unwrap_or(target).trim();
            if !nick.is_empty() {
                self.front_emit(server, kind, &[nick], ts);
            }
        }
    }
}
