//! Registration, the nick-collision ladder, and post-MOTD actions.

mod common;

use common::Harness;
use slircc::{EventKind, FavChannel, LoginMethod, Prefs, ServerConfig};

#[test]
fn test_welcome_sets_identity() {
    let mut h = Harness::new();
    h.feed(&[":irc.test.net 001 slirc :Welcome to TestNet, slirc"]);
    let srv = h.engine.server(h.server).unwrap();
    assert!(srv.connected);
    assert_eq!(srv.servername, "irc.test.net");
    assert_eq!(srv.nick, "slirc");
    assert_eq!(h.sink.count(EventKind::Connected), 1);
}

#[test]
fn test_welcome_replay_fires_once() {
    // bouncers replay the registration burst on reattach
    let mut h = Harness::new();
    h.feed(&[
        ":irc.test.net 001 slirc :Welcome",
        ":irc.test.net 001 slirc :Welcome",
    ]);
    assert_eq!(h.sink.count(EventKind::Connected), 1);
}

#[test]
fn test_isupport_applies_tokens() {
    let mut h = Harness::new();
    h.register();
    h.feed(&[
        ":irc.test.net 005 slirc CASEMAPPING=ascii CHANTYPES=#&+ WHOX EXCEPTS INVEX :are supported by this server",
    ]);
    let srv = h.engine.server(h.server).unwrap();
    assert_eq!(srv.chantypes, "#&+");
    assert!(srv.caps.have_whox);
    assert!(srv.have_except);
    assert!(srv.have_invite);
    assert!(srv.is_channel("+ops"));
}

#[test]
fn test_ping_answered_with_pong() {
    let mut h = Harness::new();
    h.register();
    h.feed(&["PING :token-123"]);
    assert_eq!(h.out(), vec!["PONG :token-123"]);
}

#[test]
fn test_nick_clash_walks_the_ladder() {
    let mut h = Harness::new();
    h.engine.start_login(h.server);
    h.out();
    h.feed(&[":irc.test.net 433 * slirc :Nickname is already in use."]);
    assert_eq!(h.out(), vec!["NICK slirc_"]);
    h.feed(&[":irc.test.net 433 * slirc_ :Nickname is already in use."]);
    assert_eq!(h.out(), vec!["NICK slirc__"]);
    h.feed(&[":irc.test.net 433 * slirc__ :Nickname is already in use."]);
    assert!(h.out().is_empty());
    assert_eq!(h.sink.count(EventKind::NickClash), 2);
    assert_eq!(h.sink.count(EventKind::NickFail), 1);
}

#[test]
fn test_nick_clash_after_registration_is_an_error() {
    let mut h = Harness::new();
    h.register();
    h.feed(&[":irc.test.net 433 slirc wanted :Nickname is already in use."]);
    assert!(h.out().is_empty());
    assert_eq!(h.sink.count(EventKind::NickError), 1);
}

#[test]
fn test_end_of_motd_joins_favorites() {
    let mut cfg = ServerConfig::default();
    cfg.favorites = vec![
        FavChannel::new("#rust", None),
        FavChannel::new("#sekrit", Some("k3y")),
    ];
    let mut h = Harness::with(Prefs::default(), cfg);
    h.register();
    h.feed(&[":irc.test.net 376 slirc :End of /MOTD command."]);
    let out = h.out();
    assert_eq!(out, vec!["JOIN #sekrit,#rust k3y,x"]);
    assert_eq!(h.sink.count(EventKind::EndOfMotd), 1);
}

#[test]
fn test_no_motd_numeric_also_counts() {
    let mut h = Harness::new();
    h.register();
    h.feed(&[
        ":irc.test.net 422 slirc :MOTD File is missing",
        ":irc.test.net 376 slirc :End of /MOTD command.",
    ]);
    // whichever arrives first wins; the other is a duplicate
    assert_eq!(h.sink.count(EventKind::EndOfMotd), 1);
}

#[test]
fn test_nickserv_identify_after_motd() {
    let mut cfg = ServerConfig::default();
    cfg.login = LoginMethod::NickServ;
    cfg.password = Some("hunter2".into());
    let mut h = Harness::with(Prefs::default(), cfg);
    h.register();
    h.feed(&[":irc.test.net 376 slirc :End of /MOTD command."]);
    assert_eq!(h.out(), vec!["PRIVMSG NickServ :IDENTIFY hunter2"]);
}

#[test]
fn test_server_error_surfaces() {
    let mut h = Harness::new();
    h.register();
    h.feed(&["ERROR :Closing Link: flood"]);
    let ev = h.sink.first(EventKind::ServerError).unwrap();
    assert_eq!(ev.args[0], "Closing Link: flood");
}

#[test]
fn test_disconnect_queues_final_quit() {
    let mut h = Harness::new();
    h.register();
    h.engine.disconnect(h.server, "bye");
    assert_eq!(h.out(), vec!["QUIT :bye"]);
    assert!(!h.engine.server(h.server).unwrap().connected);
    assert_eq!(h.sink.count(EventKind::Disconnected), 1);
}

#[test]
fn test_garbage_degrades_not_panics() {
    let mut h = Harness::new();
    h.register();
    h.feed(&[":", ": ", "", ":prefix-only"]);
    // nothing sensible to dispatch; some of these surface as garbage
    assert!(h.out().is_empty());
}
