//! Bounded retry for calls against the external directions provider.
//!
//! Every external call site goes through one [`RetryPolicy`] instead of
//! growing its own ad hoc loop. The policy retries immediately (the
//! provider client's own timeout is the pacing mechanism) and only for
//! errors the caller classifies as transient.

use tracing::warn;

/// Upper bound on attempts for one logical call, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry policy parameterized by attempt budget and an error classifier.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Run `op` until it succeeds, fails terminally, or the attempt
    /// budget is spent. Non-transient errors are returned after exactly
    /// one invocation; the last transient error is returned once the
    /// budget runs out.
    pub fn run<T, E, F, C>(&self, mut op: F, is_transient: C) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        C: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt < max_attempts => {
                    warn!(attempt, max_attempts, error = %err, "transient failure, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
