use super::ReturnUrlQuery;
use crate::auth::{is_local_url, Authenticator};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

#[instrument(skip(auth))]
pub async fn login(
    Query(query): Query<ReturnUrlQuery>,
    State(auth): State<Authenticator>,
) -> impl IntoResponse {
    let return_url = query.return_url.filter(|url| {
        let local = is_local_url(url);
        if !local {
            tracing::warn!(return_url = %url, "ignoring non-local return url");
        }
        local
    });

    let auth_url = auth.login_redirect_url(return_url).await;
    Redirect::to(auth_url.as_ref())
}
