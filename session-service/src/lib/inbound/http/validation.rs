use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::FromRequestParts;
use axum::extract::Query;
use axum::extract::RawPathParams;
use axum::extract::Request;
use axum::extract::State;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum::RequestPartsExt;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

use super::errors::ApiError;
use crate::validation::RequestParts;
use crate::validation::RequestSchema;
use crate::validation::Segment;
use crate::validation::ValidationFailure;
use crate::validation::ValidationIssue;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Normalized request segments stored in extensions by [`validate_request`].
#[derive(Debug, Clone)]
pub struct ValidatedRequest(pub RequestParts);

/// Middleware that checks body, query and path params against `schema`.
///
/// Rejects with `ValidationError` before the handler runs. On success the
/// normalized body replaces the original one and the normalized segments are
/// available through [`ValidatedRequest`] or the [`Valid`] extractor.
pub async fn validate_request(
    State(schema): State<Arc<RequestSchema>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();

    let params = match parts.extract::<RawPathParams>().await {
        Ok(params) => params
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect::<Map<_, _>>(),
        // Routes without captures carry no params at all.
        Err(RawPathParamsRejection::MissingPathParams(_)) => Map::new(),
        Err(e) => return Err(unreadable(Segment::Params, e.body_text())),
    };

    let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(query)| {
            query
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect::<Map<_, _>>()
        })
        .map_err(|e| unreadable(Segment::Query, e.body_text()))?;

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| unreadable(Segment::Body, format!("Unreadable request body: {}", e)))?;

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).map_err(|_| unreadable(Segment::Body, "Malformed JSON"))?
    };

    let validated = schema
        .validate(RequestParts {
            body,
            query: Value::Object(query),
            params: Value::Object(params),
        })
        .map_err(|failure| {
            tracing::warn!(
                segment = %failure.segment,
                issues = ?failure.issues,
                "Request validation failed"
            );
            ApiError::from(failure)
        })?;

    let body = if validated.body.is_null() {
        Body::from(bytes)
    } else {
        Body::from(
            serde_json::to_vec(&validated.body)
                .map_err(|e| ApiError::internal(format!("Re-encoding body failed: {}", e)))?,
        )
    };

    parts.extensions.insert(ValidatedRequest(validated));

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// A segment that could not be parsed fails validation as a whole.
fn unreadable(segment: Segment, message: impl Into<String>) -> ApiError {
    tracing::warn!(segment = %segment, "Request segment could not be parsed");
    ApiError::from(ValidationFailure {
        segment,
        issues: vec![ValidationIssue::new(segment.as_str(), message)],
    })
}

/// Typed view of a body that already passed [`validate_request`].
#[derive(Debug, Clone)]
pub struct Valid<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Valid<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ValidatedRequest(validated) = parts
            .extensions
            .get::<ValidatedRequest>()
            .ok_or_else(|| ApiError::internal("Route has no request schema"))?;

        serde_json::from_value(validated.body.clone())
            .map(Valid)
            .map_err(|e| ApiError::internal(format!("Validated body does not fit handler: {}", e)))
    }
}
