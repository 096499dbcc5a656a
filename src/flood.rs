//! Per-server flood detection.
//!
//! Two independent sliding counters: CTCP requests and private
//! messages. Crossing the CTCP threshold auto-ignores the offender;
//! crossing the PRIVMSG threshold pauses dialog auto-open for 30
//! seconds. The pause is a one-shot deadline, not a recurring timer.

use std::time::{Duration, Instant};

/// How long dialog auto-open stays paused after a message flood.
pub const AUTOOPEN_PAUSE: Duration = Duration::from_secs(30);

/// One sliding window counter.
#[derive(Clone, Copy, Debug, Default)]
struct Counter {
    count: u32,
    window_start: Option<Instant>,
}

impl Counter {
    /// Register one event. Returns true when the threshold is reached
    /// (the counter resets so the next event starts a fresh window).
    fn hit(&mut self, now: Instant, window: Duration, threshold: u32) -> bool {
        match self.window_start {
            Some(start) if now.duration_since(start) <= window => {
                self.count += 1;
                if self.count >= threshold {
                    self.count = 0;
                    self.window_start = None;
                    return true;
                }
            }
            _ => {
                // First event in a fresh window
                self.window_start = Some(now);
                self.count = 1;
            }
        }
        false
    }
}

/// Flood state for one server.
#[derive(Clone, Debug, Default)]
pub struct FloodGuard {
    ctcp: Counter,
    privmsg: Counter,
    autoopen_paused_until: Option<Instant>,
}

impl FloodGuard {
    /// New guard with idle counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a CTCP request. Returns true when the flood action
    /// (auto-ignore) should fire.
    pub fn ctcp_hit(&mut self, now: Instant, window: Duration, threshold: u32) -> bool {
        threshold > 0 && self.ctcp.hit(now, window, threshold)
    }

    /// Register an inbound private message. Returns true when the
    /// flood action (pause dialog auto-open) fires; the pause itself
    /// is armed here.
    pub fn privmsg_hit(&mut self, now: Instant, window: Duration, threshold: u32) -> bool {
        if threshold > 0 && self.privmsg.hit(now, window, threshold) {
            self.autoopen_paused_until = Some(now + AUTOOPEN_PAUSE);
            true
        } else {
            false
        }
    }

    /// Whether a dialog may currently be auto-opened.
    pub fn can_autoopen(&self, now: Instant) -> bool {
        match self.autoopen_paused_until {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }
}
