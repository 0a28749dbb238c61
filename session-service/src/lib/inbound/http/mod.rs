pub mod client;
pub mod cookies;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod router;
pub mod validation;
