use super::HtmlTemplate;
use crate::config::ServerConfig;
use crate::extractor::Profile;
use askama::Template;
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

#[derive(Template)]
#[template(path = "user.html")]
struct UserTemplate {
    path_base: String,
    subject: String,
    picture: String,
    nickname: String,
}

#[instrument(skip(user, settings))]
pub async fn user(user: Profile, State(settings): State<Arc<ServerConfig>>) -> impl IntoResponse {
    let claims = user.profile();
    let template = UserTemplate {
        path_base: settings.path_base.clone(),
        subject: claims.subject().to_owned(),
        picture: claims.picture().unwrap_or_default(),
        nickname: claims.nickname().unwrap_or_default(),
    };

    HtmlTemplate(template)
}
