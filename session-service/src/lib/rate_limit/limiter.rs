use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::time::Duration;

use auth::Role;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::policy::RatePolicies;
use super::policy::RatePolicy;

const SHARD_COUNT: usize = 16;

/// Identity a bucket is charged against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// Authenticated caller, keyed by user id.
    User(String),
    /// Anonymous caller, keyed by remote address.
    Ip(String),
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitKey::User(id) => write!(f, "user-{}", id),
            RateLimitKey::Ip(addr) => write!(f, "ip-{}", addr),
        }
    }
}

/// Budget left after a successful consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitGrant {
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window refills.
    pub reset_after: Duration,
}

/// Consume refused because the bucket is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRejection {
    pub limit: u32,
    pub retry_after: Duration,
}

impl RateLimitRejection {
    /// Retry hint in whole seconds, rounded up and never below one.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        let secs = if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        secs.max(1)
    }
}

#[derive(Debug)]
struct Bucket {
    consumed: u32,
    window_ends: Instant,
    blocked_until: Option<Instant>,
}

impl Bucket {
    fn fresh(now: Instant, policy: &RatePolicy) -> Self {
        Self {
            consumed: 0,
            window_ends: now + policy.window,
            blocked_until: None,
        }
    }

    fn is_idle(&self, now: Instant) -> bool {
        match self.blocked_until {
            Some(until) => now >= until,
            None => now >= self.window_ends,
        }
    }
}

type Shard = Mutex<HashMap<(Role, String), Bucket>>;

/// Fixed-window request limiter with per-role budgets.
///
/// Buckets live in a sharded map. Consume-and-check for one key happens under
/// its shard lock, so two concurrent requests against an exhausted bucket can
/// never both pass. Keys on different shards never contend.
pub struct RateLimiter {
    policies: RatePolicies,
    shards: Box<[Shard]>,
}

impl RateLimiter {
    pub fn new(policies: RatePolicies) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| Mutex::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self { policies, shards }
    }

    pub fn policies(&self) -> &RatePolicies {
        &self.policies
    }

    /// Charge one point to the `(role, key)` bucket.
    ///
    /// # Errors
    /// Returns a rejection carrying the retry delay when the bucket is
    /// blocked, including the request that exhausts it.
    pub fn consume(
        &self,
        role: Role,
        key: &RateLimitKey,
    ) -> Result<RateLimitGrant, RateLimitRejection> {
        let policy = self.policies.for_role(role);
        let key = key.to_string();
        let now = Instant::now();

        let mut shard = self.shard_for(role, &key).lock();
        let bucket = shard
            .entry((role, key))
            .or_insert_with(|| Bucket::fresh(now, policy));

        if let Some(until) = bucket.blocked_until {
            if now < until {
                return Err(RateLimitRejection {
                    limit: policy.points,
                    retry_after: until - now,
                });
            }
            *bucket = Bucket::fresh(now, policy);
        }

        if now >= bucket.window_ends {
            *bucket = Bucket::fresh(now, policy);
        }

        bucket.consumed += 1;

        if bucket.consumed > policy.points {
            bucket.blocked_until = Some(now + policy.block_duration);
            return Err(RateLimitRejection {
                limit: policy.points,
                retry_after: policy.block_duration,
            });
        }

        Ok(RateLimitGrant {
            limit: policy.points,
            remaining: policy.points - bucket.consumed,
            reset_after: bucket.window_ends - now,
        })
    }

    /// Drop buckets whose window and block have both elapsed.
    ///
    /// # Returns
    /// Number of evicted buckets
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        self.shards
            .iter()
            .map(|shard| {
                let mut shard = shard.lock();
                let before = shard.len();
                shard.retain(|_, bucket| !bucket.is_idle(now));
                before - shard.len()
            })
            .sum()
    }

    /// Number of live buckets across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard_for(&self, role: Role, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        role.hash(&mut hasher);
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }
}
