pub mod argon2;
pub mod errors;

pub use argon2::hash_password;
pub use argon2::verify_password;
pub use errors::PasswordError;
