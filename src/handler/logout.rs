use super::ReturnUrlQuery;
use crate::auth::Authenticator;
use crate::cookie::{CookiePolicy, COOKIE_NAME};
use crate::events::SignOutContext;
use crate::extractor::RequestOrigin;
use async_session::{MemoryStore, SessionStore};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

/// Ends the local session, then lets the sign-out hook pick the redirect.
///
/// Always clears the cookie and redirects, even when the session can't be loaded.
#[instrument(skip(auth, store, policy, jar))]
pub async fn logout(
    Query(query): Query<ReturnUrlQuery>,
    origin: RequestOrigin,
    jar: CookieJar,
    State(auth): State<Authenticator>,
    State(store): State<MemoryStore>,
    State(policy): State<CookiePolicy>,
) -> impl IntoResponse {
    if let Some(cookie) = jar.get(COOKIE_NAME).map(|c| c.value().to_owned()) {
        destroy_session(&store, cookie).await;
    }

    let ctx = SignOutContext {
        post_logout_target: query.return_url,
        origin,
    };
    let location = auth.sign_out(&ctx);
    let jar = jar.add(policy.removal_cookie(&ctx.origin));

    tracing::debug!(%location, "signing out");

    (jar, Redirect::to(&location))
}

async fn destroy_session(store: &MemoryStore, cookie: String) {
    match store.load_session(cookie).await {
        Ok(Some(session)) => match store.destroy_session(session).await {
            Ok(()) => tracing::debug!("local session destroyed"),
            Err(e) => tracing::warn!("failed destroying session: {}", e),
        },
        Ok(None) => {}
        Err(e) => tracing::warn!("failed loading session on sign-out: {}", e),
    }
}
