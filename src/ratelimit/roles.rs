//! Role-based limit resolution.

use std::collections::{HashMap, HashSet};

use crate::config::RateLimitSettings;

/// Role used for identifiers on the trusted list.
pub const TRUSTED_ROLE: &str = "service";

/// Limit applied to one caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitRule {
    pub limit: u32,
    pub window_secs: u64,
}

/// Maps identifiers and roles to limits.
///
/// Resolution order: trusted identifier, then role, then the default.
/// Role names are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct RoleLimits {
    default_limit: u32,
    window_secs: u64,
    roles: HashMap<String, u32>,
    trusted: HashSet<String>,
}

impl RoleLimits {
    pub fn new(default_limit: u32, window_secs: u64) -> Self {
        Self {
            default_limit,
            window_secs: window_secs.max(1),
            roles: HashMap::new(),
            trusted: HashSet::new(),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        let mut limits = Self::new(settings.default_limit, settings.window_secs);
        for (role, limit) in &settings.role_limits {
            limits = limits.with_role(role, *limit);
        }
        for identifier in &settings.trusted_identifiers {
            limits = limits.with_trusted(identifier);
        }
        limits
    }

    pub fn with_role(mut self, role: &str, limit: u32) -> Self {
        self.roles.insert(role.to_lowercase(), limit);
        self
    }

    pub fn with_trusted(mut self, identifier: &str) -> Self {
        self.trusted.insert(identifier.to_string());
        self
    }

    pub fn resolve(&self, identifier: &str, role: Option<&str>) -> LimitRule {
        let role = if self.trusted.contains(identifier) {
            Some(TRUSTED_ROLE.to_string())
        } else {
            role.map(|r| r.to_lowercase())
        };

        let limit = role
            .and_then(|r| self.roles.get(&r).copied())
            .unwrap_or(self.default_limit);

        LimitRule {
            limit,
            window_secs: self.window_secs,
        }
    }
}

impl Default for RoleLimits {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}
