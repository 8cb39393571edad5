//! Waiting for the shell to catch up
//!
//! The shell offers no completion event for "restarted" or "folder window
//! opened", so readiness is polled with a deadline. Plain fixed delays remain
//! only where nothing observable can be polled.

use std::thread;
use std::time::{Duration, Instant};

/// Blind wait
pub fn settle(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Call `check` until it yields a value or `timeout` elapses.
///
/// The check always runs at least once, so a zero timeout is a single check.
pub fn poll_until<T>(
    timeout: Duration,
    interval: Duration,
    mut check: impl FnMut() -> Option<T>,
) -> Option<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = check() {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        settle(interval.min(deadline - now));
    }
}
