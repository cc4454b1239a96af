//! Per-host rate limiting for outbound API calls
//!
//! Third-party APIs used by plugins publish call quotas; exceeding them gets
//! the bot's key throttled or banned, so calls are refused locally first.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::error::{Error, Result};

/// At most `calls` calls in any trailing `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub calls: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(calls: u32, window: Duration) -> Self {
        Self { calls, window }
    }
}

/// Sliding-window limiter keyed by host
pub struct RateLimiter {
    /// Host -> timestamps of permitted calls, oldest first
    history: Mutex<HashMap<String, VecDeque<Instant>>>,
    policies: HashMap<String, RateLimitPolicy>,
    default_policy: Option<RateLimitPolicy>,
}

impl RateLimiter {
    /// Create a limiter from a host -> policy table
    ///
    /// # Arguments
    /// * `policies` - Quotas for known hosts
    /// * `default_policy` - Quota for any other host, `None` for unlimited
    pub fn new(
        policies: HashMap<String, RateLimitPolicy>,
        default_policy: Option<RateLimitPolicy>,
    ) -> Self {
        Self {
            history: Mutex::new(HashMap::new()),
            policies,
            default_policy,
        }
    }

    pub fn policy(&self, host: &str) -> Option<RateLimitPolicy> {
        self.policies.get(host).copied().or(self.default_policy)
    }

    /// Check if a call to `host` is allowed right now, recording it if so
    ///
    /// # Returns
    /// * `Ok(())` - Call is allowed and counted
    /// * `Err(Error::RateLimited)` - Quota used up, carries the wait time
    pub fn check(&self, host: &str) -> Result<()> {
        self.check_at(host, Instant::now())
    }

    pub fn check_at(&self, host: &str, now: Instant) -> Result<()> {
        let Some(policy) = self.policy(host) else {
            return Ok(());
        };

        // Check and record under one lock so concurrent tasks cannot both
        // take the last slot.
        let mut history = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let calls = history
            .entry(host.to_string())
            .or_insert_with(|| VecDeque::with_capacity(policy.calls as usize));

        while let Some(oldest) = calls.front() {
            if now.saturating_duration_since(*oldest) >= policy.window {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() >= policy.calls as usize {
            let oldest = calls.front().copied().unwrap_or(now);
            let retry_after = policy
                .window
                .saturating_sub(now.saturating_duration_since(oldest));
            warn!(
                host,
                retry_after = retry_after.as_secs_f64(),
                "outbound call rate limited"
            );
            return Err(Error::RateLimited {
                host: host.to_string(),
                retry_after,
            });
        }

        calls.push_back(now);
        Ok(())
    }

    /// Number of calls currently counted against `host`
    pub fn recorded(&self, host: &str) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .map_or(0, VecDeque::len)
    }
}
