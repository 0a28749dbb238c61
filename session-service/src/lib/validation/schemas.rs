//! Request schemas for the authentication routes.

use super::schema::FieldRule;
use super::schema::ObjectSchema;
use super::schema::RequestSchema;

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 64;
pub const PASSWORD_MIN_LENGTH: usize = 6;

fn email() -> FieldRule {
    FieldRule::string("email").email()
}

fn password() -> FieldRule {
    FieldRule::string("password").min_length(PASSWORD_MIN_LENGTH)
}

/// `POST /auth/sign-up` body: `{username, email, password}`, nothing else.
pub fn signup_schema() -> RequestSchema {
    RequestSchema::new().body(
        ObjectSchema::new()
            .field(
                FieldRule::string("username")
                    .min_length(USERNAME_MIN_LENGTH)
                    .max_length(USERNAME_MAX_LENGTH),
            )
            .field(email())
            .field(password())
            .strict(),
    )
}

/// `POST /auth/login` body: `{email, password}`, nothing else.
pub fn login_schema() -> RequestSchema {
    RequestSchema::new().body(ObjectSchema::new().field(email()).field(password()).strict())
}
