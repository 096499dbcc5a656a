//! The outbound throttle queue.
//!
//! Servers kick clients that send too fast, so every outbound line
//! passes through a paced priority queue. Three urgency classes keep
//! the connection responsive: bulk queries (WHO, MODE lookups) yield
//! to chat text, and chat text yields to protocol-critical lines
//! (JOIN, PONG, CAP, ...). Within a class order is strictly FIFO.
//!
//! The historical code numbered classes by an inverted "priority"
//! where 2 meant most urgent; that naming is gone, only the behavior
//! remains.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// If the deadline is this far past "now" while the clock appears to
/// have gone backwards, assume clock skew and reset rather than stall.
const SKEW_LIMIT: Duration = Duration::from_secs(10);

/// Send urgency, higher pops first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    /// Bulk queries: WHO, and MODE used as a query (no +/- change).
    Low,
    /// Chat traffic: PRIVMSG and NOTICE.
    Medium,
    /// Everything else; protocol-critical.
    High,
}

/// Classify a raw line by its leading command word.
pub fn classify(line: &str) -> Urgency {
    let first = line.split(' ').next().unwrap_or("");
    if first.eq_ignore_ascii_case("PRIVMSG") || first.eq_ignore_ascii_case("NOTICE") {
        return Urgency::Medium;
    }
    if first.eq_ignore_ascii_case("WHO") {
        return Urgency::Low;
    }
    if first.eq_ignore_ascii_case("MODE") {
        let rest = &line[first.len()..];
        if !rest.contains('+') && !rest.contains('-') {
            return Urgency::Low;
        }
    }
    Urgency::High
}

#[derive(Debug)]
struct Entry {
    urgency: Urgency,
    seq: u64,
    line: String,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.urgency == other.urgency && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Urgency first; ties break FIFO (lower seq pops first, so it
        // must compare greater in the max-heap).
        self.urgency
            .cmp(&other.urgency)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Paced outbound queue for one server connection.
#[derive(Debug, Default)]
pub struct SendQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    next_send: Option<Instant>,
}

impl SendQueue {
    /// New empty queue with no pacing debt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line, classifying urgency from its command word.
    pub fn push(&mut self, line: String) {
        let urgency = classify(&line);
        self.push_with(line, urgency);
    }

    /// Queue a line with an explicit urgency.
    pub fn push_with(&mut self, line: String, urgency: Urgency) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { urgency, seq, line });
    }

    /// Pop the most urgent line if the pacing deadline has passed.
    ///
    /// After a pop the deadline advances by `2s + first_word_len/120 s`
    /// measured from `max(now, previous deadline)`, so a burst drains
    /// at roughly one line per two seconds.
    pub fn pop_ready(&mut self, now: Instant) -> Option<String> {
        if self.heap.is_empty() {
            return None;
        }
        if let Some(deadline) = self.next_send {
            // Clock skew guard: never stall forever on a deadline far
            // in the apparent future.
            if deadline > now && deadline.duration_since(now) > SKEW_LIMIT {
                self.next_send = Some(now);
            }
        }
        let deadline = self.next_send.unwrap_or(now);
        if now < deadline {
            return None;
        }
        let entry = self.heap.pop()?;
        let first_word_len = entry.line.split(' ').next().unwrap_or("").len();
        let base = if deadline > now { deadline } else { now };
        self.next_send = Some(base + Duration::from_secs(2 + (first_word_len / 120) as u64));
        Some(entry.line)
    }

    /// Pop ignoring the pacing deadline (used when flushing a final
    /// QUIT at disconnect, and by tests).
    pub fn pop_now(&mut self) -> Option<String> {
        self.heap.pop().map(|e| e.line)
    }

    /// Instant the next line may be sent, if pacing debt exists.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_send
    }

    /// Discard all queued lines, returning how many were dropped.
    /// Pacing state is cleared too.
    pub fn clear(&mut self) -> usize {
        let n = self.heap.len();
        self.heap.clear();
        self.next_send = None;
        n
    }

    /// Queued line count.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Iterate queued lines in no particular order (inspection only).
    pub fn iter_lines(&self) -> impl Iterator<Item = &str> {
        self.heap.iter().map(|e| e.line.as_str())
    }

    /// Whether any queued line satisfies a predicate.
    pub fn any_line(&self, pred: impl Fn(&str) -> bool) -> bool {
        self.iter_lines().any(pred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("PRIVMSG #c :hi"), Urgency::Medium);
        assert_eq!(classify("notice nick :hi"), Urgency::Medium);
        assert_eq!(classify("WHO #chan"), Urgency::Low);
        assert_eq!(classify("MODE #chan"), Urgency::Low);
        assert_eq!(classify("MODE #chan b"), Urgency::Low);
        assert_eq!(classify("MODE #chan +o nick"), Urgency::High);
        assert_eq!(classify("JOIN #chan"), Urgency::High);
        assert_eq!(classify("PONG :srv"), Urgency::High);
    }

    #[test]
    fn test_priority_then_fifo() {
        let mut q = SendQueue::new();
        q.push("PRIVMSG #a :one".into());
        q.push("WHO #a".into());
        q.push("JOIN #b".into());
        q.push("PRIVMSG #a :two".into());
        q.push("JOIN #c".into());

        let order: Vec<String> = std::iter::from_fn(|| q.pop_now()).collect();
        assert_eq!(
            order,
            vec![
                "JOIN #b",
                "JOIN #c",
                "PRIVMSG #a :one",
                "PRIVMSG #a :two",
                "WHO #a"
            ]
        );
    }

    #[test]
    fn test_pacing() {
        let mut q = SendQueue::new();
        let t0 = Instant::now();
        q.push("JOIN #a".into());
        q.push("JOIN #b".into());

        // First line goes immediately
        assert_eq!(q.pop_ready(t0).unwrap(), "JOIN #a");
        // Second must wait out the 2-second debt
        assert!(q.pop_ready(t0).is_none());
        assert!(q.pop_ready(t0 + Duration::from_secs(1)).is_none());
        assert_eq!(
            q.pop_ready(t0 + Duration::from_secs(2)).unwrap(),
            "JOIN #b"
        );
    }

    #[test]
    fn test_deadlines_monotonic() {
        let mut q = SendQueue::new();
        let t0 = Instant::now();
        for i in 0..5 {
            q.push(format!("JOIN #c{}", i));
        }
        let mut last = None;
        let mut now = t0;
        while q.pop_ready(now).is_some() {
            let d = q.next_deadline().unwrap();
            if let Some(prev) = last {
                assert!(d >= prev, "deadlines must be non-decreasing");
            }
            last = Some(d);
            now = d;
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_skew_guard() {
        let mut q = SendQueue::new();
        let t0 = Instant::now();
        q.push("JOIN #a".into());
        q.push("JOIN #b".into());
        assert!(q.pop_ready(t0).is_some());
        // Force a deadline far beyond "now": looks like the clock
        // jumped backwards. The guard must reset instead of stalling.
        let stale = t0 + Duration::from_secs(100);
        let mut q2 = SendQueue::new();
        q2.next_send = Some(stale);
        q2.push("JOIN #c".into());
        assert_eq!(q2.pop_ready(t0).unwrap(), "JOIN #c");
    }

    #[test]
    fn test_clear_discards() {
        let mut q = SendQueue::new();
        q.push("PRIVMSG #a :x".into());
        q.push("JOIN #a".into());
        assert_eq!(q.clear(), 2);
        assert!(q.is_empty());
        assert!(q.next_deadline().is_none());
    }
}
