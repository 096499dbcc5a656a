//! CAP negotiation and the SASL mechanism ladder.

mod common;

use common::Harness;
use slirc_wire::sasl::{self, Mechanism};
use slircc::{EventKind, LoginMethod, Prefs, ServerConfig};

fn sasl_config() -> ServerConfig {
    let mut cfg = ServerConfig::default();
    cfg.login = LoginMethod::SaslPlain;
    cfg.password = Some("hunter2".into());
    cfg
}

fn cap_ends(lines: &[String]) -> usize {
    lines.iter().filter(|l| *l == "CAP END").count()
}

#[test]
fn test_cap_ls_requests_wanted_caps() {
    let mut h = Harness::new();
    h.feed(&[":irc.test.net CAP * LS :multi-prefix sasl unknown-cap server-time"]);
    let out = h.out();
    assert_eq!(out.len(), 1);
    let req = out[0].strip_prefix("CAP REQ :").unwrap();
    assert!(req.contains("multi-prefix"));
    assert!(req.contains("server-time"));
    assert!(!req.contains("unknown-cap"));
    // no password configured, so sasl is not worth requesting
    assert!(!req.contains("sasl"));
}

#[test]
fn test_cap_ls_multiline_accumulates() {
    let mut h = Harness::with(Prefs::default(), sasl_config());
    h.feed(&[":irc.test.net CAP * LS * :multi-prefix away-notify"]);
    assert!(h.out().is_empty());
    h.feed(&[":irc.test.net CAP * LS :sasl=PLAIN,EXTERNAL server-time"]);
    let out = h.out();
    let req = out[0].strip_prefix("CAP REQ :").unwrap();
    assert!(req.contains("multi-prefix"));
    assert!(req.contains("sasl"));
}

#[test]
fn test_nothing_wanted_ends_negotiation() {
    let mut h = Harness::new();
    h.feed(&[":irc.test.net CAP * LS :draft/languages"]);
    assert_eq!(h.out(), vec!["CAP END"]);
}

#[test]
fn test_nak_ends_negotiation_once() {
    let mut h = Harness::new();
    h.feed(&[
        ":irc.test.net CAP * LS :multi-prefix",
        ":irc.test.net CAP slirc NAK :multi-prefix",
        ":irc.test.net CAP slirc NAK :multi-prefix",
    ]);
    assert_eq!(cap_ends(&h.out()), 1);
}

#[test]
fn test_plain_flow_end_to_end() {
    let mut h = Harness::with(Prefs::default(), sasl_config());
    let mut wire = Vec::new();
    h.feed(&[":irc.test.net CAP * LS :sasl"]);
    wire.extend(h.out());
    h.feed(&[":irc.test.net CAP slirc ACK :sasl"]);
    let start = h.out();
    let strongest = Mechanism::strongest_password_mech();
    assert_eq!(start, vec![format!("AUTHENTICATE {}", strongest.as_str())]);
    wire.extend(start);

    // server only offers PLAIN; re-select below the current ceiling
    h.feed(&[":irc.test.net 908 slirc PLAIN :are available mechanisms"]);
    assert_eq!(h.out(), vec!["AUTHENTICATE PLAIN"]);

    h.feed(&["AUTHENTICATE +"]);
    let out = h.out();
    assert_eq!(out.len(), 1);
    let payload = out[0].strip_prefix("AUTHENTICATE ").unwrap();
    assert_eq!(
        sasl::decode_base64(payload).unwrap(),
        b"slirc\0slirc\0hunter2"
    );

    h.feed(&[":irc.test.net 903 slirc :SASL authentication successful"]);
    wire.extend(h.out());
    assert_eq!(h.sink.count(EventKind::SaslSuccess), 1);
    assert_eq!(cap_ends(&wire), 1);
}

#[cfg(feature = "legacy-dh")]
#[test]
fn test_failure_steps_down_the_ladder() {
    let mut h = Harness::with(Prefs::default(), sasl_config());
    h.feed(&[
        ":irc.test.net CAP * LS :sasl",
        ":irc.test.net CAP slirc ACK :sasl",
    ]);
    h.out();
    h.feed(&[":irc.test.net 904 slirc :SASL authentication failed"]);
    assert_eq!(h.out(), vec!["AUTHENTICATE DH-BLOWFISH"]);
    h.feed(&[":irc.test.net 904 slirc :SASL authentication failed"]);
    assert_eq!(h.out(), vec!["AUTHENTICATE PLAIN"]);
    // PLAIN has nothing below it; registration proceeds
    h.feed(&[":irc.test.net 904 slirc :SASL authentication failed"]);
    assert_eq!(h.out(), vec!["CAP END"]);
    assert_eq!(h.sink.count(EventKind::SaslFail), 3);
}

#[cfg(feature = "legacy-dh")]
#[test]
fn test_bare_plus_challenge_aborts_dh() {
    // a DH mechanism with no key material must fail closed
    let mut h = Harness::with(Prefs::default(), sasl_config());
    h.feed(&[
        ":irc.test.net CAP * LS :sasl",
        ":irc.test.net CAP slirc ACK :sasl",
    ]);
    h.out();
    h.feed(&["AUTHENTICATE +"]);
    assert_eq!(h.out(), vec!["AUTHENTICATE *"]);
    assert_eq!(h.sink.count(EventKind::SaslFail), 1);
}

#[test]
fn test_mechanism_list_challenge_reselects() {
    let mut h = Harness::with(Prefs::default(), sasl_config());
    h.feed(&[
        ":irc.test.net CAP * LS :sasl",
        ":irc.test.net CAP slirc ACK :sasl",
    ]);
    h.out();
    // some servers answer the mechanism name with their full list
    h.feed(&["AUTHENTICATE PLAIN,ECDSA-NIST256P-CHALLENGE"]);
    assert_eq!(h.out(), vec!["AUTHENTICATE PLAIN"]);
}

#[test]
fn test_stray_challenge_without_sasl_is_ignored() {
    let mut h = Harness::new();
    h.register();
    h.feed(&["AUTHENTICATE +"]);
    assert!(h.out().is_empty());
}

#[test]
fn test_ack_applies_capability_flags() {
    let mut h = Harness::new();
    h.feed(&[":irc.test.net CAP slirc ACK :server-time away-notify identify-msg"]);
    let srv = h.engine.server(h.server).unwrap();
    assert!(srv.caps.have_server_time);
    assert!(srv.caps.have_awaynotify);
    assert!(srv.caps.have_idmsg);
    assert!(!srv.caps.have_extjoin);
}

#[test]
fn test_logged_in_numeric_displays_account() {
    let mut h = Harness::with(Prefs::default(), sasl_config());
    h.feed(&[":irc.test.net 900 slirc slirc!u@h slirc :You are now logged in as slirc"]);
    let ev = h.sink.first(EventKind::SaslLoggedIn).unwrap();
    assert_eq!(ev.args[0], "slirc");
}
