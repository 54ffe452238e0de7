// ABOUTME: Bounded retry policy shared by the address poll and SSH retry loops.
// ABOUTME: Limits by attempt count or wall-clock budget with a fixed inter-attempt delay.

use std::time::Duration;

/// What bounds a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// Stop after this many attempts.
    Attempts(u32),
    /// Stop once this much wall-clock time has elapsed.
    Deadline(Duration),
}

/// A bounded retry loop configuration.
///
/// Both polling loops (instance address wait, SSH connectivity) take a policy
/// instead of hard-coded sleeps, so tests can run them with zero delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub limit: RetryLimit,
    pub delay: Duration,
}

impl RetryPolicy {
    /// A policy bounded by a maximum attempt count.
    pub fn attempts(max_attempts: u32, delay: Duration) -> Self {
        Self {
            limit: RetryLimit::Attempts(max_attempts),
            delay,
        }
    }

    /// A policy bounded by a wall-clock budget.
    pub fn deadline(budget: Duration, delay: Duration) -> Self {
        Self {
            limit: RetryLimit::Deadline(budget),
            delay,
        }
    }

    /// Whether the loop must stop after `attempts_made` attempts and
    /// `elapsed` wall-clock time.
    pub fn exhausted(&self, attempts_made: u32, elapsed: Duration) -> bool {
        match self.limit {
            RetryLimit::Attempts(max) => attempts_made >= max,
            RetryLimit::Deadline(budget) => elapsed >= budget,
        }
    }

    /// Maximum attempt count, when the policy is attempt-bounded.
    /// Used for "attempt i/n" log lines.
    pub fn max_attempts(&self) -> Option<u32> {
        match self.limit {
            RetryLimit::Attempts(max) => Some(max),
            RetryLimit::Deadline(_) => None,
        }
    }
}
