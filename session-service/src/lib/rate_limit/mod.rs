pub mod limiter;
pub mod policy;

pub use limiter::RateLimitGrant;
pub use limiter::RateLimitKey;
pub use limiter::RateLimitRejection;
pub use limiter::RateLimiter;
pub use policy::RatePolicies;
pub use policy::RatePolicy;
