use super::HtmlTemplate;
use crate::config::ServerConfig;
use askama::Template;
use axum::{extract::State, http::Uri, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

#[derive(Template)]
#[template(path = "host.html")]
struct HostTemplate {
    path_base: String,
    path: String,
}

/// Fallback page for every path without a route of its own.
#[instrument(skip(settings))]
pub async fn host(uri: Uri, State(settings): State<Arc<ServerConfig>>) -> impl IntoResponse {
    HtmlTemplate(HostTemplate {
        path_base: settings.path_base.clone(),
        path: uri.path().to_owned(),
    })
}
