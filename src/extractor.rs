use crate::auth::Claims;
use crate::config::ServerConfig;
use crate::cookie::COOKIE_NAME;
use crate::server::AuthRedirect;
use async_session::{MemoryStore, SessionStore};
use axum::{
    async_trait,
    extract::{rejection::TypedHeaderRejectionReason, FromRef, FromRequestParts, Host, TypedHeader},
    http::{header, request::Parts, HeaderMap, StatusCode, Uri},
    RequestPartsExt,
};
use std::sync::Arc;

pub(crate) const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Scheme the client used, honouring a TLS-terminating proxy in front of us.
pub(crate) fn request_scheme(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(X_FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .or_else(|| uri.scheme_str().map(str::to_owned))
        .unwrap_or_else(|| "http".to_string())
}

/// Where the current request came from: `scheme://host{path_base}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
    pub path_base: String,
}

impl RequestOrigin {
    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestOrigin
where
    Arc<ServerConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let settings = Arc::<ServerConfig>::from_ref(state);
        let Host(host) = Host::from_request_parts(parts, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "missing host"))?;

        Ok(RequestOrigin {
            scheme: request_scheme(&parts.headers, &parts.uri),
            host,
            path_base: settings.path_base.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Profile {
    inner: Claims,
}

impl Profile {
    pub fn profile(&self) -> &Claims {
        &self.inner
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Profile
where
    MemoryStore: FromRef<S>,
    Arc<ServerConfig>: FromRef<S>,
    S: Send + Sync,
{
    // If anything goes wrong or no session is found, challenge
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = MemoryStore::from_ref(state);
        let settings = Arc::<ServerConfig>::from_ref(state);
        let challenge = AuthRedirect::new(&settings.path_base, &parts.uri);

        let cookies = parts
            .extract::<TypedHeader<headers::Cookie>>()
            .await
            .map_err(|e| {
                if !matches!(e.reason(), TypedHeaderRejectionReason::Missing) {
                    tracing::warn!(header = %header::COOKIE, "malformed cookie header: {}", e);
                }
                challenge.clone()
            })?;
        let session_cookie = cookies.get(COOKIE_NAME).ok_or_else(|| challenge.clone())?;

        let session = store
            .load_session(session_cookie.to_string())
            .await
            .map_err(|e| {
                tracing::warn!("failed loading session: {}", e);
                challenge.clone()
            })?
            .ok_or_else(|| challenge.clone())?;

        let profile = session.get::<Claims>("profile").ok_or(challenge)?;

        Ok(Profile { inner: profile })
    }
}
