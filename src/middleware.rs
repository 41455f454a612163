use crate::extractor::request_scheme;
use askama::Template;
use axum::{
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};

/// Detail of a failed request, attached to the response by the failing handler.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Template)]
#[template(path = "error.html")]
struct DeveloperErrorTemplate<'a> {
    status: StatusCode,
    method: &'a str,
    path: &'a str,
    detail: &'a str,
}

/// Development only: renders the attached [`ErrorDetail`] instead of the generic body.
pub async fn developer_error_page<B>(req: Request<B>, next: Next<B>) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();

    let response = next.run(req).await;
    let detail = match response.extensions().get::<ErrorDetail>().cloned() {
        Some(ErrorDetail(detail)) => detail,
        None => return response,
    };

    let status = response.status();
    let template = DeveloperErrorTemplate {
        status,
        method: &method,
        path: &path,
        detail: &detail,
    };

    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            tracing::error!("failed rendering developer error page: {}", err);
            response
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HttpsRedirect {
    pub port: u16,
}

impl HttpsRedirect {
    fn location(&self, host: &str, path_and_query: &str) -> String {
        // Drop whatever port the plain-http request came in on.
        let host = match host.rsplit_once(':') {
            Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                name
            }
            _ => host,
        };

        if self.port == 443 {
            format!("https://{}{}", host, path_and_query)
        } else {
            format!("https://{}:{}{}", host, self.port, path_and_query)
        }
    }
}

/// `307` plain-http requests over to https.
pub async fn redirect_to_https<B>(
    State(redirect): State<HttpsRedirect>,
    req: Request<B>,
    next: Next<B>,
) -> Response {
    if request_scheme(req.headers(), req.uri()) == "https" {
        return next.run(req).await;
    }

    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    match host {
        Some(host) => {
            let path_and_query = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            let location = redirect.location(&host, path_and_query);
            tracing::debug!(%location, "redirecting to https");
            Redirect::temporary(&location).into_response()
        }
        None => next.run(req).await,
    }
}
