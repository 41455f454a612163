use crate::auth::{is_local_url, AccessToken, Claims, CLAIMS_ISSUER};
use crate::config::ServerConfig;
use crate::cookie::CookiePolicy;
use crate::extractor::RequestOrigin;
use crate::{auth::Authenticator, server::InternalError};
use anyhow::Context;
use async_session::{MemoryStore, Session, SessionStore};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tracing::instrument;

/// Sessions outlive the browser tab but not the working day.
pub const SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    code: String,
    state: String,
}

#[instrument(skip(query, jar, store, auth, policy, settings))]
pub async fn callback(
    Query(query): Query<AuthRequest>,
    origin: RequestOrigin,
    jar: CookieJar,
    State(store): State<MemoryStore>,
    State(auth): State<Authenticator>,
    State(policy): State<CookiePolicy>,
    State(settings): State<Arc<ServerConfig>>,
) -> Result<impl IntoResponse, InternalError> {
    let login = auth.verify_code(query.state, query.code).await?;

    if settings.show_pii {
        tracing::info!(
            issuer = CLAIMS_ISSUER,
            subject = login.claims.subject(),
            nickname = ?login.claims.nickname(),
            "signed in"
        );
    } else {
        tracing::info!(issuer = CLAIMS_ISSUER, "signed in");
    }

    let session_id = save_session(&store, login.access_token, login.claims).await?;
    let jar = jar.add(policy.session_cookie(session_id, &origin));

    let destination = login
        .return_url
        .filter(|url| is_local_url(url))
        .unwrap_or_else(|| format!("{}/", origin.path_base));

    Ok((jar, Redirect::to(&destination)))
}

async fn save_session(
    store: &MemoryStore,
    access_token: AccessToken,
    claims: Claims,
) -> anyhow::Result<String> {
    // Create a new session filled with user data
    let mut session = Session::new();
    session.expire_in(SESSION_TTL);
    session.insert("access_token", access_token)?;

    session.insert("profile", claims)?;

    // Store session and get corresponding cookie
    store
        .store_session(session)
        .await?
        .context("cookie string not found")
}
