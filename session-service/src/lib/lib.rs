pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod rate_limit;
pub mod validation;

pub use domain::session;
pub use outbound::repositories;
