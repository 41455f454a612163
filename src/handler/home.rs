use super::HtmlTemplate;
use crate::config::ServerConfig;
use askama::Template;
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    path_base: String,
}

#[instrument(skip(settings))]
pub async fn home(State(settings): State<Arc<ServerConfig>>) -> impl IntoResponse {
    HtmlTemplate(HomeTemplate {
        path_base: settings.path_base.clone(),
    })
}
