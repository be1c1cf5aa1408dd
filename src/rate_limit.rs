//! In-memory, per-client throttles for the two public endpoints.
//!
//! Counters live only in this process. A restart forgets them, and several
//! replicas each keep their own.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Bad export tokens a client may send before it is locked out.
const MAX_TOKEN_FAILURES: u32 = 5;
const TOKEN_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Hits counted since `opened`. A window older than its length counts as empty.
#[derive(Clone, Copy)]
struct Window {
    hits: u32,
    opened: Instant,
}

impl Window {
    fn fresh(now: Instant) -> Self {
        Self { hits: 0, opened: now }
    }

    fn expired(&self, now: Instant, length: Duration) -> bool {
        now.duration_since(self.opened) > length
    }

    /// Seconds until the window closes, for `Retry-After`.
    fn remaining_secs(&self, now: Instant, length: Duration) -> u64 {
        length
            .as_secs()
            .saturating_sub(now.duration_since(self.opened).as_secs())
    }

    fn bump(&mut self, now: Instant, length: Duration) {
        if self.expired(now, length) {
            *self = Self::fresh(now);
        }
        self.hits += 1;
    }
}

fn forget_older_than(entries: &DashMap<IpAddr, Window>, max_age: Duration) {
    let now = Instant::now();
    entries.retain(|_, window| now.duration_since(window.opened) < max_age);
}

/// Caps survey submissions per client IP within a fixed window.
pub struct SubmissionRateLimiter {
    entries: DashMap<IpAddr, Window>,
}

impl SubmissionRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Count one submission from `ip`. Over the limit, nothing is counted and
    /// the error carries the seconds left in the current window.
    pub fn check(&self, ip: IpAddr, limit: u32, window_secs: u64) -> Result<(), u64> {
        let length = Duration::from_secs(window_secs);
        let now = Instant::now();

        let mut window = self.entries.entry(ip).or_insert(Window::fresh(now));

        if !window.expired(now, length) && window.hits >= limit {
            return Err(window.remaining_secs(now, length));
        }

        window.bump(now, length);
        Ok(())
    }

    pub fn cleanup(&self, max_age: Duration) {
        forget_older_than(&self.entries, max_age);
    }
}

/// Locks a client out of the export after repeated wrong tokens.
///
/// Only failures count: `check` is read-only, and the export route calls
/// `record_failure` once it has rejected a token.
pub struct TokenRateLimiter {
    entries: DashMap<IpAddr, Window>,
}

impl TokenRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let now = Instant::now();

        match self.entries.get(&ip) {
            Some(window)
                if !window.expired(now, TOKEN_WINDOW) && window.hits >= MAX_TOKEN_FAILURES =>
            {
                Err(window.remaining_secs(now, TOKEN_WINDOW))
            }
            _ => Ok(()),
        }
    }

    pub fn record_failure(&self, ip: IpAddr) {
        let now = Instant::now();
        self.entries
            .entry(ip)
            .or_insert(Window::fresh(now))
            .bump(now, TOKEN_WINDOW);
    }

    pub fn cleanup(&self, max_age: Duration) {
        forget_older_than(&self.entries, max_age);
    }
}
