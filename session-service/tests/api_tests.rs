mod common;

use std::time::Duration;

use auth::Role;
use auth::TokenCodec;
use auth::TokenKind;
use auth::TokenSettings;
use common::refresh_cookie;
use common::refresh_cookie_header;
use common::TestApp;
use reqwest::StatusCode;
use serde_json::json;
use session_service::rate_limit::RatePolicies;
use session_service::rate_limit::RatePolicy;

async fn json_body(response: reqwest::Response) -> serde_json::Value {
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
async fn test_sign_up_success() {
    let app = TestApp::spawn().await;

    let response = app.sign_up("ana", "ana@x.com", "secret1").await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = refresh_cookie_header(&response).expect("Missing refresh cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));
    let refresh_token = refresh_cookie(&response).unwrap();

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["data"]["user"]["username"], "ana");
    assert_eq!(body["data"]["user"]["email"], "ana@x.com");
    assert_eq!(body["data"]["user"]["role"], "user");
    assert!(body["data"]["user"]["id"].is_string());
    assert!(body["data"]["user"].get("password").is_none());
    assert!(body["data"]["user"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshToken").is_none());

    let access = app
        .token_codec
        .verify_access(body["data"]["accessToken"].as_str().unwrap())
        .expect("Access token should verify");
    let refresh = app.token_codec.verify_refresh(&refresh_token).unwrap();
    assert_eq!(access.user_id, body["data"]["user"]["id"].as_str().unwrap());
    assert_eq!(refresh.user_id, access.user_id);
    assert_eq!(access.role, Role::User);
    assert_eq!(app.refresh_tokens.len().await, 1);
}

#[tokio::test]
async fn test_sign_up_admin_allow_list() {
    let app = TestApp::spawn().await;

    let response = app.sign_up("boss", "Boss@Example.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["data"]["user"]["role"], "admin");
    assert_eq!(body["data"]["user"]["email"], "boss@example.com");
}

#[tokio::test]
async fn test_sign_up_duplicate_email() {
    let app = TestApp::spawn().await;

    assert_eq!(
        app.sign_up("ana", "ana@x.com", "secret1").await.status(),
        StatusCode::CREATED
    );
    assert_eq!(
        app.sign_up("bob", "bob@x.com", "secret1").await.status(),
        StatusCode::CREATED
    );

    let response = app.sign_up("ana2", "ANA@x.com", "secret2").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["error"]["kind"], "Conflict");
    assert_eq!(body["error"]["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_concurrent_sign_ups_with_same_email() {
    let app = TestApp::spawn().await;

    let attempts = (0..5).map(|_| app.sign_up("ana", "ana@x.com", "secret1"));
    let statuses: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|response| response.status())
        .collect();

    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CREATED).count(),
        1
    );
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(),
        4
    );
}

#[tokio::test]
async fn test_sign_up_validation_errors() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/v1/auth/sign-up")
        .json(&json!({
            "username": "an",
            "email": "not-an-email",
            "password": "123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "ValidationError");
    assert_eq!(body["message"], "Validation Error");
    let fields: Vec<_> = body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["username", "email", "password"]);
}

#[tokio::test]
async fn test_sign_up_rejects_unknown_fields() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/v1/auth/sign-up")
        .json(&json!({
            "username": "ana",
            "email": "ana@x.com",
            "password": "secret1",
            "role": "admin"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["details"][0]["field"], "role");
    assert_eq!(body["error"]["details"][0]["message"], "Unrecognized key");
}

#[tokio::test]
async fn test_sign_up_malformed_json() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/v1/auth/sign-up")
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"username\":")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "ValidationError");
    assert_eq!(body["error"]["details"][0]["field"], "body");
}

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::spawn().await;
    app.sign_up("ana", "ana@x.com", "secret1").await;

    let response = app.login("Ana@X.com", "secret1").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(refresh_cookie(&response).is_some());

    let body = json_body(response).await;
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["data"]["user"]["email"], "ana@x.com");
    assert!(body["data"]["accessToken"].is_string());

    // Sessions are not capped: one record per signup or login.
    assert_eq!(app.refresh_tokens.len().await, 2);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::spawn().await;
    app.sign_up("ana", "ana@x.com", "secret1").await;

    let wrong_password = app.login("ana@x.com", "secret2").await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert!(refresh_cookie_header(&wrong_password).is_none());
    let wrong_password = json_body(wrong_password).await;

    let unknown_email = app.login("ghost@x.com", "secret1").await;
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    let unknown_email = json_body(unknown_email).await;

    assert_eq!(wrong_password["error"]["kind"], "AuthenticationError");
    assert_eq!(wrong_password, unknown_email);

    let details = wrong_password["error"]["details"].as_array().unwrap();
    assert!(details
        .iter()
        .all(|d| d["field"] != "password" && d["field"] != "email"));
    assert!(!wrong_password.to_string().contains("secret2"));
    assert!(!wrong_password["message"]
        .as_str()
        .unwrap()
        .to_lowercase()
        .contains("incorrect"));
}

#[tokio::test]
async fn test_logout_success_then_repeat() {
    let app = TestApp::spawn().await;
    let (access_token, refresh_token) = app.session("ana", "ana@x.com").await;

    let response = app
        .post_authenticated("/api/v1/auth/logout", &access_token)
        .header(reqwest::header::COOKIE, format!("refreshToken={}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let cleared = refresh_cookie_header(&response).expect("Cookie should be cleared");
    assert!(cleared.contains("Max-Age=0"));
    assert!(refresh_cookie(&response).is_none());

    let body = json_body(response).await;
    assert_eq!(body["data"], json!({}));
    assert_eq!(body["message"], "Logged out successfully");
    assert_eq!(app.refresh_tokens.len().await, 0);

    let response = app
        .post_authenticated("/api/v1/auth/logout", &access_token)
        .header(reqwest::header::COOKIE, format!("refreshToken={}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "LogoutError");
}

#[tokio::test]
async fn test_logout_without_cookie() {
    let app = TestApp::spawn().await;
    let (access_token, _) = app.session("ana", "ana@x.com").await;

    let response = app
        .post_authenticated("/api/v1/auth/logout", &access_token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "RefreshTokenMissing");
    assert_eq!(app.refresh_tokens.len().await, 1);
}

#[tokio::test]
async fn test_logout_requires_bearer_token() {
    let app = TestApp::spawn().await;
    let (access_token, refresh_token) = app.session("ana", "ana@x.com").await;

    let missing = app
        .post("/api/v1/auth/logout")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(missing).await["error"]["kind"],
        "AuthorizationHeaderMissing"
    );

    let malformed = app
        .post("/api/v1/auth/logout")
        .header(reqwest::header::AUTHORIZATION, format!("Token {}", access_token))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(malformed.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(malformed).await["error"]["kind"],
        "InvalidAuthorizationHeaderFormat"
    );

    // A refresh token is signed with the other key.
    let wrong_key = app
        .post_authenticated("/api/v1/auth/logout", &refresh_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(wrong_key.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(wrong_key).await["error"]["kind"], "TokenInvalid");
}

#[tokio::test]
async fn test_logout_with_expired_access_token() {
    let app = TestApp::spawn().await;
    let (_, refresh_token) = app.session("ana", "ana@x.com").await;
    let user_id = app.token_codec.verify_refresh(&refresh_token).unwrap().user_id;

    let expired_codec = TokenCodec::new(
        TokenSettings::new(common::ACCESS_SECRET, chrono::Duration::seconds(-10)),
        TokenSettings::new(common::REFRESH_SECRET, chrono::Duration::days(7)),
    );
    let (expired, _) = expired_codec
        .sign(TokenKind::Access, user_id, Role::User)
        .unwrap();

    let response = app
        .post_authenticated("/api/v1/auth/logout", &expired)
        .header(reqwest::header::COOKIE, format!("refreshToken={}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["kind"], "TokenExpired");
    assert_eq!(app.refresh_tokens.len().await, 1);
}

#[tokio::test]
async fn test_rate_limit_headers() {
    let app = TestApp::spawn().await;

    let response = app.sign_up("ana", "ana@x.com", "secret1").await;

    let headers = response.headers();
    assert_eq!(headers["x-ratelimit-limit"], "50");
    assert_eq!(headers["x-ratelimit-remaining"], "49");
    assert!(headers["x-ratelimit-reset"]
        .to_str()
        .unwrap()
        .ends_with("GMT"));
}

#[tokio::test]
async fn test_rate_limit_rejects_after_budget() {
    let app = TestApp::spawn_with(RatePolicies::uniform(RatePolicy {
        points: 3,
        window: Duration::from_secs(60),
        block_duration: Duration::from_secs(300),
    }))
    .await;

    for remaining in ["2", "1", "0"] {
        let response = app.login("ghost@x.com", "secret1").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
    }

    let response = app.login("ghost@x.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "TooManyRequests");
    assert_eq!(body["statusCode"], 429);

    // Blocked requests never reach the handler, even with valid credentials.
    let response = app.sign_up("ana", "ana@x.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_invalid_requests_do_not_consume_budget() {
    let app = TestApp::spawn_with(RatePolicies::uniform(RatePolicy {
        points: 1,
        window: Duration::from_secs(60),
        block_duration: Duration::from_secs(300),
    }))
    .await;

    for _ in 0..3 {
        let response = app.login("not-an-email", "x").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app.sign_up("ana", "ana@x.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_authenticated_budget_is_per_user() {
    let app = TestApp::spawn_with(RatePolicies::uniform(RatePolicy {
        points: 2,
        window: Duration::from_secs(60),
        block_duration: Duration::from_secs(300),
    }))
    .await;

    // Two signups exhaust the anonymous budget for this address.
    let (ana, _) = app.session("ana", "ana@x.com").await;
    let (bob, _) = app.session("bob", "bob@x.com").await;

    for token in [&ana, &bob] {
        let response = app
            .post_authenticated("/api/v1/auth/logout", token)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "1");
    }
}

#[tokio::test]
async fn test_service_routes() {
    let app = TestApp::spawn().await;

    let response = app.get("/").send().await.expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "Running");
    assert_eq!(body["data"]["environment"], "test");

    let response = app
        .get("/health")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["store"], "memory");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/api/v1/nope")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "NotFound");
    assert_eq!(body["error"]["details"][0]["field"], "route");
    assert!(body["error"]["details"][0]["message"]
        .as_str()
        .unwrap()
        .contains("/api/v1/nope"));
}

#[tokio::test]
async fn test_wrong_method_gets_error_envelope() {
    let app = TestApp::spawn().await;

    let without_body = app
        .get("/api/v1/auth/login")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(without_body.status(), StatusCode::NOT_FOUND);
    assert!(without_body.headers().get("x-ratelimit-remaining").is_none());
    let body = json_body(without_body).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "NotFound");

    let with_body = app
        .get("/api/v1/auth/login")
        .json(&json!({"email": "ana@x.com", "password": "secret1"}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(with_body.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(with_body).await["error"]["kind"], "NotFound");

    // Neither request spent budget.
    let response = app.sign_up("ana", "ana@x.com", "secret1").await;
    assert_eq!(response.headers()["x-ratelimit-remaining"], "49");
}
