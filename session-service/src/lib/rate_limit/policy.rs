use std::time::Duration;

use auth::Role;

/// Request budget for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    /// Requests allowed per window.
    pub points: u32,
    pub window: Duration,
    /// How long an exhausted bucket rejects every request.
    pub block_duration: Duration,
}

impl RatePolicy {
    pub const fn per_minute(points: u32) -> Self {
        Self {
            points,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(5 * 60),
        }
    }
}

/// Budgets for every role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatePolicies {
    pub admin: RatePolicy,
    pub editor: RatePolicy,
    pub author: RatePolicy,
    pub user: RatePolicy,
}

impl RatePolicies {
    /// Same budget for every role. Mostly useful in tests.
    pub fn uniform(policy: RatePolicy) -> Self {
        Self {
            admin: policy,
            editor: policy,
            author: policy,
            user: policy,
        }
    }

    pub fn for_role(&self, role: Role) -> &RatePolicy {
        match role {
            Role::Admin => &self.admin,
            Role::Editor => &self.editor,
            Role::Author => &self.author,
            Role::User => &self.user,
        }
    }
}

impl Default for RatePolicies {
    fn default() -> Self {
        Self {
            admin: RatePolicy::per_minute(300),
            editor: RatePolicy::per_minute(150),
            author: RatePolicy::per_minute(100),
            user: RatePolicy::per_minute(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let policies = RatePolicies::default();

        assert_eq!(policies.for_role(Role::Admin).points, 300);
        assert_eq!(policies.for_role(Role::Editor).points, 150);
        assert_eq!(policies.for_role(Role::Author).points, 100);
        assert_eq!(policies.for_role(Role::User).points, 50);

        for role in Role::ALL {
            let policy = policies.for_role(role);
            assert_eq!(policy.window, Duration::from_secs(60));
            assert_eq!(policy.block_duration, Duration::from_secs(300));
        }
    }
}
