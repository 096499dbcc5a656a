//! Logical sessions: server console, channel, dialog, notice tabs.

use crate::server::ServerId;

/// Opaque handle to a session in the engine's registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// What a session displays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionKind {
    /// The server console tab.
    Server,
    /// A joined (or pending) channel.
    Channel,
    /// A private query with one nick.
    Dialog,
    /// Collected user notices (routing mode "extra").
    Notices,
    /// Collected server notices (routing mode "extra").
    SNotices,
}

/// One conversation context.
///
/// A channel session may exist before the JOIN is confirmed; until
/// then `waitchannel` holds the name the user asked for and
/// `channel` stays empty. Confirmation moves the name over.
#[derive(Clone, Debug)]
pub struct Session {
    /// Owning server.
    pub server: ServerId,
    /// Kind of tab.
    pub kind: SessionKind,
    /// Confirmed channel name, or the dialog peer's nick. Empty for
    /// an unused channel tab.
    pub channel: String,
    /// Channel name we sent JOIN for and are awaiting; cleared on
    /// confirmation.
    pub waitchannel: String,
    /// Key used on the last JOIN, kept for auto-rejoin after a kick.
    pub channelkey: String,

    /// Suppress the next solicited 333 topic-time reply.
    pub ignore_date: bool,
    /// Suppress the next solicited 324 mode reply.
    pub ignore_mode: bool,
    /// Suppress the next solicited NAMES reply.
    pub ignore_names: bool,
    /// A WHO for this channel is in flight (reply fills the user
    /// list silently).
    pub doing_who: bool,

    /// The client solicited the ban list (next 367 burst is a reply,
    /// not unsolicited).
    pub ban_list_solicited: bool,
    /// Same for the exemption list (348).
    pub exempt_list_solicited: bool,
    /// Same for invite exemptions (346).
    pub invite_list_solicited: bool,
    /// Same for the quiet list (728).
    pub quiet_list_solicited: bool,

    /// Something arrived since the session was last viewed.
    pub new_data: bool,
    /// A message arrived.
    pub msg_said: bool,
    /// Our nick was mentioned.
    pub nick_said: bool,
}

impl Session {
    /// Fresh session of the given kind.
    pub fn new(server: ServerId, kind: SessionKind) -> Self {
        Session {
            server,
            kind,
            channel: String::new(),
            waitchannel: String::new(),
            channelkey: String::new(),
            ignore_date: false,
            ignore_mode: false,
            ignore_names: false,
            doing_who: false,
            ban_list_solicited: false,
            exempt_list_solicited: false,
            invite_list_solicited: false,
            quiet_list_solicited: false,
            new_data: false,
            msg_said: false,
            nick_said: false,
        }
    }

    /// Whether this is a channel tab with no confirmed or pending
    /// channel, eligible for reuse on the next JOIN.
    pub fn is_blank_channel_tab(&self) -> bool {
        self.kind == SessionKind::Channel && self.channel.is_empty() && self.waitchannel.is_empty()
    }

    /// Reset join-scoped state before fresh NAMES/MODE replies
    /// repopulate the tab.
    pub fn reset_for_join(&mut self, channel: &str) {
        self.channel = channel.to_string();
        self.waitchannel.clear();
        self.ignore_date = false;
        self.ignore_mode = false;
        self.ignore_names = false;
        self.doing_who = false;
        self.ban_list_solicited = false;
        self.exempt_list_solicited = false;
        self.invite_list_solicited = false;
        self.quiet_list_solicited = false;
    }

    /// Mark activity for the "interesting session" ordering the
    /// front-end keeps.
    pub fn mark_said(&mut self, mentioned: bool) {
        self.new_data = true;
        self.msg_said = true;
        if mentioned {
            self.nick_said = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_tab() {
        let mut s = Session::new(ServerId(1), SessionKind::Channel);
        assert!(s.is_blank_channel_tab());
        s.waitchannel = "#x".into();
        assert!(!s.is_blank_channel_tab());
        s.waitchannel.clear();
        s.channel = "#x".into();
        assert!(!s.is_blank_channel_tab());
    }

    #[test]
    fn test_reset_clears_suppression() {
        let mut s = Session::new(ServerId(1), SessionKind::Channel);
        s.waitchannel = "#x".into();
        s.ignore_mode = true;
        s.doing_who = true;
        s.reset_for_join("#x");
        assert_eq!(s.channel, "#x");
        assert!(s.waitchannel.is_empty());
        assert!(!s.ignore_mode);
        assert!(!s.doing_who);
    }
}
