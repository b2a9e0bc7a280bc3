//! Attempt throttling: cooldown window and consecutive-attempt cap.

use std::time::{Duration, Instant};
use wasend_core::config::{Backoff, ConnectionConfig};

/// Why a connection attempt may not start yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    /// Too soon after the previous attempt.
    Cooldown(Duration),
    /// `max_attempts` consecutive attempts without a successful open.
    AttemptCap,
}

/// Counts consecutive connection attempts and enforces the cooldown.
///
/// Pure bookkeeping: callers pass the current instant, so tests can move
/// time freely.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    cooldown: Duration,
    max_cooldown: Duration,
    backoff: Backoff,
    max_attempts: u32,
    attempts: u32,
    last_attempt: Option<Instant>,
}

impl AttemptTracker {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            cooldown: Duration::from_secs(config.cooldown_secs),
            max_cooldown: Duration::from_secs(config.max_cooldown_secs),
            backoff: config.backoff,
            max_attempts: config.max_attempts,
            attempts: 0,
            last_attempt: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Length of the window that follows the latest attempt.
    pub fn window(&self) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.cooldown,
            Backoff::Exponential => {
                let exp = self.attempts.saturating_sub(1).min(31);
                self.cooldown
                    .saturating_mul(1u32 << exp)
                    .min(self.max_cooldown)
            }
        }
    }

    /// Time left before the next attempt is allowed; zero when allowed now.
    pub fn cooldown_remaining(&self, now: Instant) -> Duration {
        match self.last_attempt {
            Some(last) => self
                .window()
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn check(&self, now: Instant) -> Result<(), Denied> {
        if self.attempts >= self.max_attempts {
            return Err(Denied::AttemptCap);
        }
        let remaining = self.cooldown_remaining(now);
        if !remaining.is_zero() {
            return Err(Denied::Cooldown(remaining));
        }
        Ok(())
    }

    pub fn can_attempt(&self, now: Instant) -> bool {
        self.check(now).is_ok()
    }

    pub fn record(&mut self, now: Instant) {
        self.attempts += 1;
        self.last_attempt = Some(now);
    }

    /// Forget all attempts; the next one is allowed immediately.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.last_attempt = None;
    }
}
