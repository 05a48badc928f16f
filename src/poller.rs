//! Bounded condition polling.
//!
//! The simulation never signals completion, so assertions poll live state at
//! a fixed interval until a hard deadline. The interval is a plain sleep; the
//! harness cannot be woken early.

use bevy::log::debug;
use std::fmt::Display;
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};

/// Result of one polling run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollOutcome {
    pub satisfied: bool,
    pub polls: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct ConditionPoller {
    interval: Duration,
}

impl Default for ConditionPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ConditionPoller {
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `predicate` until it returns true or `timeout` elapses.
    ///
    /// The first true observation returns immediately. On timeout the last
    /// observed value (false) is returned. Never runs more than
    /// `timeout + interval` past the start.
    pub fn wait_for_condition<F>(&self, predicate: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        self.poll(predicate, timeout).satisfied
    }

    /// Like [`wait_for_condition`](Self::wait_for_condition), for predicates
    /// that can fail. An error counts as "not yet" and is never propagated.
    pub fn wait_for_condition_guarded<F, E>(&self, mut predicate: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Result<bool, E>,
        E: Display,
    {
        self.wait_for_condition(
            || match predicate() {
                Ok(value) => value,
                Err(e) => {
                    debug!("Condition could not be evaluated: {}", e);
                    false
                }
            },
            timeout,
        )
    }

    pub fn poll<F>(&self, mut predicate: F, timeout: Duration) -> PollOutcome
    where
        F: FnMut() -> bool,
    {
        let start = Instant::now();
        let mut polls = 0;

        loop {
            let value = predicate();
            polls += 1;
            let elapsed = start.elapsed();

            if value || elapsed >= timeout {
                return PollOutcome {
                    satisfied: value,
                    polls,
                    elapsed,
                };
            }

            // The last sleep lands on the deadline so the final poll happens there
            thread::sleep(self.interval.min(timeout - elapsed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_true_returns_on_first_poll() {
        let poller = ConditionPoller::new(Duration::from_millis(50));
        let outcome = poller.poll(|| true, Duration::from_secs(5));

        assert!(outcome.satisfied);
        assert_eq!(outcome.polls, 1);
        assert!(outcome.elapsed < Duration::from_millis(50));
    }

    #[test]
    fn test_returns_at_first_true_poll() {
        let poller = ConditionPoller::new(Duration::from_millis(5));
        let mut calls = 0;
        let outcome = poller.poll(
            || {
                calls += 1;
                calls == 4
            },
            Duration::from_secs(5),
        );

        assert!(outcome.satisfied);
        assert_eq!(outcome.polls, 4);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_timeout_bounded_by_deadline_plus_interval() {
        let interval = Duration::from_millis(20);
        let timeout = Duration::from_millis(100);
        let poller = ConditionPoller::new(interval);

        let start = Instant::now();
        let result = poller.wait_for_condition(|| false, timeout);
        let elapsed = start.elapsed();

        assert!(!result);
        assert!(elapsed >= timeout);
        // Scheduler slack on top of the contract bound
        assert!(elapsed <= timeout + interval + Duration::from_millis(100));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let poller = ConditionPoller::new(Duration::ZERO);
        assert_eq!(poller.interval(), MIN_POLL_INTERVAL);

        let mut calls = 0;
        let outcome = poller.poll(
            || {
                calls += 1;
                false
            },
            Duration::from_millis(20),
        );
        assert!(!outcome.satisfied);
        // 1 ms sleeps bound the count well below a busy spin
        assert!(outcome.polls <= 25, "{} polls", outcome.polls);
        assert_eq!(outcome.polls, calls);
    }

    #[test]
    fn test_zero_timeout_polls_once() {
        let poller = ConditionPoller::default();
        let mut calls = 0;
        let result = poller.wait_for_condition(
            || {
                calls += 1;
                false
            },
            Duration::ZERO,
        );

        assert!(!result);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_guarded_errors_count_as_false() {
        let poller = ConditionPoller::new(Duration::from_millis(1));
        let mut calls = 0;
        let result = poller.wait_for_condition_guarded(
            || {
                calls += 1;
                if calls < 3 {
                    Err("entity not ready")
                } else {
                    Ok(true)
                }
            },
            Duration::from_secs(1),
        );

        assert!(result);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_guarded_error_until_timeout() {
        let poller = ConditionPoller::new(Duration::from_millis(5));
        let result = poller.wait_for_condition_guarded(
            || Err::<bool, _>("invalid entity"),
            Duration::from_millis(30),
        );
        assert!(!result);
    }
}
