use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

pub mod callback;
pub mod home;
pub mod host;
pub mod login;
pub mod logout;
pub mod user;

pub use callback::callback;
pub use home::home;
pub use host::host;
pub use login::login;
pub use logout::logout;
pub use user::user;

pub(crate) struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template. Error: {}", err),
            )
                .into_response(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReturnUrlQuery {
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
}
