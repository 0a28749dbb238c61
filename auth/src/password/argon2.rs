use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;

use super::errors::PasswordError;

/// Hash a plaintext password with Argon2id and a random salt.
///
/// # Returns
/// PHC string (algorithm, parameters, salt and digest)
///
/// # Errors
/// * `HashingFailed` - Argon2 rejected the input or parameters
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Compare a plaintext password against a stored PHC hash.
///
/// Pure function of its two inputs: it does not need a loaded user record,
/// only the hash string that the credential lookup returned.
///
/// # Returns
/// `true` when the password matches
///
/// # Errors
/// * `MalformedHash` - The stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
