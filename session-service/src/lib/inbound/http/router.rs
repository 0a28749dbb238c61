use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use auth::TokenCodec;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::compression::predicate::DefaultPredicate;
use tower_http::compression::predicate::Predicate;
use tower_http::compression::predicate::SizeAbove;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::cookies::CookieSettings;
use super::errors::expose_diagnostics;
use super::handlers::health::health;
use super::handlers::health::not_found;
use super::handlers::health::service_info;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::sign_up::sign_up;
use super::middleware::authenticate;
use super::middleware::AuthGuard;
use super::rate_limit::rate_limit;
use super::validation::validate_request;
use crate::config::Environment;
use crate::domain::session::ports::SessionServicePort;
use crate::rate_limit::RateLimiter;
use crate::validation::schemas::login_schema;
use crate::validation::schemas::signup_schema;

#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<dyn SessionServicePort>,
    pub token_codec: Arc<TokenCodec>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cookies: CookieSettings,
    pub environment: Environment,
    /// Kind of credential store behind the service, reported by `/health`.
    pub store: &'static str,
    /// Attach internal diagnostics to error envelopes. Never set in production.
    pub expose_internal_errors: bool,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        session_service: Arc<dyn SessionServicePort>,
        token_codec: Arc<TokenCodec>,
        rate_limiter: Arc<RateLimiter>,
        environment: Environment,
        store: &'static str,
    ) -> Self {
        let cookies = CookieSettings::new(
            environment.is_production(),
            token_codec.refresh_ttl().num_seconds(),
        );

        Self {
            session_service,
            token_codec,
            rate_limiter,
            cookies,
            environment,
            store,
            expose_internal_errors: !environment.is_production(),
            started_at: Instant::now(),
        }
    }
}

/// Responses smaller than this are sent uncompressed.
const COMPRESSION_MIN_BYTES: u16 = 1024;

pub fn create_router(state: AppState) -> Router {
    let limiter = state.rate_limiter.clone();
    let guard = AuthGuard::new(state.token_codec.clone());

    // The last layer added runs first. Route layers skip the method fallback,
    // so a wrong method is neither validated nor charged.
    let auth_routes = Router::new()
        .route(
            "/sign-up",
            post(sign_up)
                .route_layer(middleware::from_fn_with_state(limiter.clone(), rate_limit))
                .route_layer(middleware::from_fn_with_state(
                    Arc::new(signup_schema()),
                    validate_request,
                ))
                .fallback(not_found),
        )
        .route(
            "/login",
            post(login)
                .route_layer(middleware::from_fn_with_state(limiter.clone(), rate_limit))
                .route_layer(middleware::from_fn_with_state(
                    Arc::new(login_schema()),
                    validate_request,
                ))
                .fallback(not_found),
        )
        .route(
            "/logout",
            post(logout)
                .route_layer(middleware::from_fn_with_state(limiter, rate_limit))
                .route_layer(middleware::from_fn_with_state(guard, authenticate))
                .fallback(not_found),
        );

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    let expose = state.expose_internal_errors;

    Router::new()
        .route("/", get(service_info).fallback(not_found))
        .route("/health", get(health).fallback(not_found))
        .nest("/api/v1", Router::new().nest("/auth", auth_routes))
        .fallback(not_found)
        .layer(middleware::map_response_with_state(expose, expose_diagnostics))
        .layer(CompressionLayer::new().compress_when(
            DefaultPredicate::new().and(SizeAbove::new(COMPRESSION_MIN_BYTES)),
        ))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
