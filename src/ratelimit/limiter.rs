//! Fixed-window rate limiter.
//!
//! One entry per identifier, created lazily. A call either starts a fresh
//! window (no entry, or the stored window has passed) or increments the
//! current one. Denied calls still increment, so a caller that keeps
//! hammering stays denied until the window resets.
//!
//! Entries live in a `DashMap`; each decision runs under the identifier's
//! shard guard, so concurrent callers never lose increments and no global
//! lock is taken. Expired entries are only removed by `sweep`.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use super::roles::{LimitRule, RoleLimits};

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    fn fresh(now: DateTime<Utc>, window_secs: u64) -> Self {
        Self {
            count: 1,
            window_reset_at: now + window(window_secs),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_reset_at
    }
}

/// Read-only view of a caller's quota.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Allow/deny decision plus the quota after counting this call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub status: RateLimitStatus,
}

#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    limits: RoleLimits,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RoleLimits::default())
    }
}

impl RateLimiter {
    pub fn new(limits: RoleLimits) -> Self {
        Self {
            entries: DashMap::new(),
            limits,
        }
    }

    pub fn limits(&self) -> &RoleLimits {
        &self.limits
    }

    /// Count a call against an explicit limit and window.
    pub fn allow(&self, identifier: &str, limit: u32, window_secs: u64) -> bool {
        self.allow_at(identifier, limit, window_secs, Utc::now())
    }

    pub fn allow_at(
        &self,
        identifier: &str,
        limit: u32,
        window_secs: u64,
        now: DateTime<Utc>,
    ) -> bool {
        self.check_rule_at(
            identifier,
            LimitRule {
                limit,
                window_secs,
            },
            now,
        )
        .allowed
    }

    /// Count a call using the limit resolved for `role`.
    pub fn allow_role(&self, identifier: &str, role: Option<&str>) -> bool {
        self.check_role_at(identifier, role, Utc::now()).allowed
    }

    /// Count a call and return the decision with the updated quota.
    pub fn check_role_at(
        &self,
        identifier: &str,
        role: Option<&str>,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let rule = self.limits.resolve(identifier, role);
        self.check_rule_at(identifier, rule, now)
    }

    fn check_rule_at(&self, identifier: &str, rule: LimitRule, now: DateTime<Utc>) -> RateLimitDecision {
        let entry = match self.entries.entry(identifier.to_string()) {
            Entry::Vacant(slot) => slot
                .insert(RateLimitEntry::fresh(now, rule.window_secs))
                .clone(),
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                if current.is_expired(now) {
                    *current = RateLimitEntry::fresh(now, rule.window_secs);
                } else {
                    current.count = current.count.saturating_add(1);
                }
                current.clone()
            }
        };

        let allowed = entry.count <= rule.limit;
        if !allowed {
            log::warn!(
                "RATE_LIMIT_DENIED identifier={} count={} limit={} reset_at={}",
                identifier,
                entry.count,
                rule.limit,
                entry.window_reset_at.to_rfc3339()
            );
        }

        RateLimitDecision {
            allowed,
            status: RateLimitStatus {
                limit: rule.limit,
                remaining: rule.limit.saturating_sub(entry.count),
                reset_at: entry.window_reset_at,
            },
        }
    }

    /// Current quota for `identifier` under `role`. Does not count as a call.
    pub fn status(&self, identifier: &str, role: Option<&str>) -> RateLimitStatus {
        self.status_at(identifier, role, Utc::now())
    }

    pub fn status_at(
        &self,
        identifier: &str,
        role: Option<&str>,
        now: DateTime<Utc>,
    ) -> RateLimitStatus {
        let rule = self.limits.resolve(identifier, role);
        match self.entries.get(identifier) {
            Some(entry) if !entry.is_expired(now) => RateLimitStatus {
                limit: rule.limit,
                remaining: rule.limit.saturating_sub(entry.count),
                reset_at: entry.window_reset_at,
            },
            _ => RateLimitStatus {
                limit: rule.limit,
                remaining: rule.limit,
                reset_at: now + window(rule.window_secs),
            },
        }
    }

    /// Drop every entry whose window has passed. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        log::debug!(
            "RATE_LIMIT_SWEEP removed={} remaining={}",
            removed,
            self.entries.len()
        );
        removed
    }

    pub fn tracked_identifiers(&self) -> usize {
        self.entries.len()
    }
}

/// Upper bound on a window; keeps timestamp arithmetic in range.
const MAX_WINDOW_SECS: i64 = 366 * 24 * 3600;

fn window(window_secs: u64) -> Duration {
    Duration::seconds(i64::try_from(window_secs).map_or(MAX_WINDOW_SECS, |s| s.min(MAX_WINDOW_SECS)))
}
