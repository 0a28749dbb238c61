pub mod memory;
pub mod postgres;

pub use memory::InMemoryRefreshTokenRepository;
pub use memory::InMemoryUserRepository;
pub use postgres::PostgresRefreshTokenRepository;
pub use postgres::PostgresUserRepository;
