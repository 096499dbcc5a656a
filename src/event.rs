//! The text-event seam between the engine and a front-end.
//!
//! Every dispatcher branch that would display something emits a typed
//! event through [`EventSink`]; the core never renders. Args are
//! positional strings whose meaning is fixed per kind (nick, target,
//! text, ...), mirroring how front-ends format them into theme
//! strings.

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::session::SessionId;

/// Kinds of text events the engine can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    // Connection
    /// Logged in (001 received). args: [servername, nick]
    Connected,
    /// Connection ended. args: [reason]
    Disconnected,
    /// Generic server text. args: [text]
    ServerText,
    /// ERROR from the server. args: [text]
    ServerError,
    /// Unparseable inbound line. args: [raw]
    Garbage,
    /// MOTD line. args: [text]
    Motd,
    /// End of MOTD (or no MOTD). args: []
    EndOfMotd,
    /// Nick in use, retrying. args: [bad_nick, next_nick]
    NickClash,
    /// All nick candidates exhausted. args: [bad_nick]
    NickFail,
    /// Nick rejected after registration. args: [bad_nick, reason]
    NickError,

    // Channel membership
    /// We joined a channel. args: [channel]
    YouJoin,
    /// Someone joined. args: [nick, channel, host, account]
    Join,
    /// Someone parted. args: [nick, channel, host]
    Part,
    /// Someone parted with a reason. args: [nick, channel, host, reason]
    PartReason,
    /// We parted. args: [channel]
    YouPart,
    /// We parted with a reason. args: [channel, reason]
    YouPartReason,
    /// Someone was kicked. args: [kicker, victim, channel, reason]
    Kick,
    /// We were kicked. args: [kicker, channel, reason]
    YouKicked,
    /// Someone quit. args: [nick, reason, host]
    Quit,
    /// Someone changed nick. args: [old, new]
    ChangeNick,
    /// Our nick changed. args: [old, new]
    YourNick,
    /// A previously-used tab is being reused for a fresh join; the
    /// front-end reloads settings/scrollback. args: [channel]
    SessionReset,

    // Topic / modes
    /// Topic on join. args: [channel, topic]
    Topic,
    /// Topic changed. args: [nick, topic, channel]
    TopicChange,
    /// Topic set-by and time. args: [channel, nick, time]
    TopicDate,
    /// Channel modes (324). args: [channel, modes]
    ChannelModes,
    /// Channel creation time (329). args: [channel, time]
    ChannelCreated,
    /// Raw MODE line routed to the external mode parser.
    /// args: [source, target, modes]
    RawModes,
    /// NAMES reply for a channel with no session. args: [channel, names]
    NamesList,
    /// End of NAMES. args: [channel]
    EndOfNames,

    // Channel list-mode lists
    /// Ban list entry. args: [channel, mask, who, time]
    BanList,
    /// End of ban list. args: [channel]
    BanListEnd,
    /// Exemption list entry. args: [channel, mask, who, time]
    ExemptList,
    /// End of exemption list. args: [channel]
    ExemptListEnd,
    /// Invite-exemption entry. args: [channel, mask, who, time]
    InviteList,
    /// End of invite-exemption list. args: [channel]
    InviteListEnd,
    /// Quiet list entry. args: [channel, mask, who, time]
    QuietList,
    /// End of quiet list. args: [channel]
    QuietListEnd,

    // LIST
    /// LIST header. args: []
    ChannelListHead,
    /// LIST entry. args: [channel, users, topic]
    ChannelListEntry,
    /// End of LIST. args: []
    ChannelListEnd,

    // Join failures
    /// Channel is full. args: [channel]
    ChannelFull,
    /// Invite only. args: [channel]
    InviteOnlyChan,
    /// Banned. args: [channel]
    BannedFromChan,
    /// Wrong or missing key. args: [channel]
    BadChannelKey,

    // Messages
    /// Channel message. args: [nick, text]
    ChannelMessage,
    /// Channel message containing our nick. args: [nick, text]
    ChannelMsgHilight,
    /// Channel action. args: [nick, text]
    ChannelAction,
    /// Channel action containing our nick. args: [nick, text]
    ChannelActionHilight,
    /// Private message. args: [nick, text]
    PrivateMessage,
    /// Private action. args: [nick, text]
    PrivateAction,
    /// Notice. args: [nick, text]
    NoticeRecv,
    /// Server notice. args: [text, server]
    ServerNotice,
    /// WALLOPS. args: [nick, text]
    Wallops,
    /// We were invited. args: [channel, nick, server]
    Invited,
    /// Our invite was confirmed (341). args: [nick, channel]
    InviteConfirm,

    // WHOIS / WHOWAS
    /// args: [nick, user, host, realname]
    WhoisName,
    /// args: [nick, server, serverinfo]
    WhoisServer,
    /// args: [nick, text]
    WhoisOper,
    /// args: [nick, idle, signon]
    WhoisIdle,
    /// args: [nick, channels]
    WhoisChannels,
    /// args: [nick, account]
    WhoisAccount,
    /// args: [nick, text]
    WhoisSpecial,
    /// args: [nick, away_message]
    WhoisAway,
    /// args: [nick]
    WhoisEnd,
    /// args: [nick, user, host, realname]
    WhowasName,
    /// args: [nick]
    WhowasEnd,

    // Away
    /// We are now away. args: []
    SelfAway,
    /// We are back. args: []
    SelfBack,
    /// Away message for another user (301 outside WHOIS).
    /// args: [nick, message]
    AwayInfo,
    /// Watched user went away. args: [nick]
    NotifyAway,
    /// Watched user came back. args: [nick]
    NotifyBack,
    /// Watched user came online. args: [nick]
    NotifyOnline,
    /// Watched user went offline. args: [nick]
    NotifyOffline,

    // CTCP / DCC
    /// CTCP request received. args: [nick, ctcp, target]
    CtcpRequest,
    /// CTCP reply received. args: [nick, text]
    CtcpReply,
    /// CTCP SOUND accepted for playback. args: [sound, nick]
    SoundPlay,
    /// CTCP DCC hand-off; args carry the re-split sub-line tokens.
    DccRequest,
    /// CTCP flood action: offender auto-ignored. args: [mask]
    CtcpFloodIgnore,
    /// Our CTCP PING came back. args: [nick, seconds]
    PingReply,

    // CAP / SASL
    /// CAP protocol text for display. args: [server, text]
    CapText,
    /// SASL started. args: [mechanism, user]
    SaslAuthenticating,
    /// SASL succeeded (903). args: [text]
    SaslSuccess,
    /// SASL failed and will retry or give up. args: [text]
    SaslFail,
    /// Logged in as account (900). args: [account, text]
    SaslLoggedIn,
    /// Logged out (901). args: [text]
    SaslLoggedOut,
}

/// Receiver of engine text events; implemented by the front-end.
pub trait EventSink: Send + Sync {
    /// Deliver one event to the session's display.
    ///
    /// `timestamp` is seconds since the epoch, or 0 meaning "now"
    /// (a server-time tag was absent or unparseable).
    fn emit(&self, session: SessionId, kind: EventKind, args: &[&str], timestamp: i64);
}

/// One captured event.
#[derive(Clone, Debug)]
pub struct Emitted {
    /// Destination session.
    pub session: SessionId,
    /// Event kind.
    pub kind: EventKind,
    /// Positional args.
    pub args: SmallVec<[String; 4]>,
    /// Seconds since epoch, 0 = now.
    pub timestamp: i64,
}

/// An [`EventSink`] that records everything; the test harness and
/// headless embedders use this.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<Emitted>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot all captured events.
    pub fn events(&self) -> Vec<Emitted> {
        self.events.lock().clone()
    }

    /// Count events of one kind.
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// First event of one kind, if any.
    pub fn first(&self, kind: EventKind) -> Option<Emitted> {
        self.events.lock().iter().find(|e| e.kind == kind).cloned()
    }

    /// Drop captured events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, session: SessionId, kind: EventKind, args: &[&str], timestamp: i64) {
        self.events.lock().push(Emitted {
            session,
            kind,
            args: args.iter().map(|s| s.to_string()).collect(),
            timestamp,
        });
    }
}
