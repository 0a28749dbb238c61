use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::cookie::SameSite;

pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Attributes of the refresh-token cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieSettings {
    /// Set the `Secure` attribute. On in production.
    pub secure: bool,
    pub max_age: time::Duration,
}

impl CookieSettings {
    pub fn new(secure: bool, max_age_secs: i64) -> Self {
        Self {
            secure,
            max_age: time::Duration::seconds(max_age_secs),
        }
    }

    /// HttpOnly, SameSite=Lax cookie carrying `token`.
    pub fn refresh_token(&self, token: String) -> Cookie<'static> {
        Cookie::build((REFRESH_TOKEN_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure)
            .max_age(self.max_age)
            .build()
    }

    /// Cookie that clears the refresh token on the client.
    pub fn clear_refresh_token(&self, jar: CookieJar) -> CookieJar {
        jar.remove(
            Cookie::build(REFRESH_TOKEN_COOKIE)
                .http_only(true)
                .same_site(SameSite::Lax)
                .path("/")
                .secure(self.secure),
        )
    }
}

/// Refresh token sent by the client, if any.
pub fn refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}
