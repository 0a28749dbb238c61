use std::convert::Infallible;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::Extensions;
use axum::RequestPartsExt;
use axum_extra::headers::UserAgent;
use axum_extra::TypedHeader;

use crate::domain::session::models::ClientMetadata;

const UNKNOWN: &str = "unknown";

/// Request origin, recorded on refresh-token records.
#[derive(Debug, Clone)]
pub struct Client(pub ClientMetadata);

#[async_trait]
impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .extract::<Option<TypedHeader<UserAgent>>>()
            .await?
            .map(|TypedHeader(agent)| agent.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Ok(Client(ClientMetadata {
            user_agent,
            ip: remote_ip(&parts.extensions),
        }))
    }
}

/// Peer address from the connection, when the server was started with connect info.
pub fn remote_ip(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
