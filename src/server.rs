use crate::{
    auth::{AuthError, Authenticator},
    config::ServerConfig,
    cookie::CookiePolicy,
    events::Auth0Events,
    handler,
    logout::escape_data,
    middleware::{developer_error_page, redirect_to_https, ErrorDetail, HttpsRedirect},
    Auth0Config,
};
use async_session::MemoryStore;
use axum::{
    extract::FromRef,
    http::{Request, StatusCode, Uri},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Redirect, Response},
    routing::{get, get_service, MethodRouter},
    Router,
};
use std::{io, sync::Arc, time::Duration};
use tower_http::{classify::ServerErrorsFailureClass, services::ServeDir, trace::TraceLayer};
use tracing::Span;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub async fn start_server(auth0: Auth0Config, settings: ServerConfig) -> anyhow::Result<()> {
    // `MemoryStore` keeps sessions per process; every instance signs users in separately.
    let store = MemoryStore::new();
    tokio::spawn(cleanup_sessions(store.clone(), SESSION_CLEANUP_INTERVAL));
    let events = Arc::new(Auth0Events::new(&auth0));
    let authenticator = Authenticator::discover(&auth0, events).await?;
    let addr = settings.bind_addr;
    let app = app(AppState::new(authenticator, store, settings));

    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Drops expired sessions from `store` every `period`.
pub async fn cleanup_sessions(store: MemoryStore, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = store.cleanup().await {
            tracing::warn!("session cleanup failed: {}", e);
        }
        let sessions = store.count().await;
        tracing::debug!(sessions, "session cleanup");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed listening for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Full pipeline: tracing, https redirection, developer errors, static files, routes.
pub fn app(state: AppState) -> Router {
    let settings = state.settings.clone();

    let static_files: MethodRouter = get_service(ServeDir::new(&settings.static_dir)).handle_error(
        |err: io::Error| async move {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Unhandled internal error: {}", err),
            )
        },
    );

    let mut app = Router::new()
        .route("/", get(handler::home))
        .route("/login", get(handler::login))
        .route(crate::auth::CALLBACK_PATH, get(handler::callback))
        .route("/user", get(handler::user))
        .route("/logout", get(handler::logout))
        .nest_service("/public", static_files)
        .fallback(handler::host)
        .with_state(state);

    if settings.is_development() {
        app = app.layer(from_fn(developer_error_page));
    }

    if let Some(port) = settings.https_port {
        app = app.layer(from_fn_with_state(HttpsRedirect { port }, redirect_to_https));
    } else {
        tracing::warn!("APP_HTTPS_PORT not set; https redirection disabled");
    }

    app.layer(
        TraceLayer::new_for_http()
            .on_request(|request: &Request<_>, _span: &Span| {
                tracing::info!(method = %request.method(), uri = %request.uri(), "request");
            })
            .on_response(|response: &Response, latency: Duration, _span: &Span| {
                tracing::info!(status = %response.status(), ?latency, "response");
            })
            .on_failure(
                |error: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                    tracing::error!(?error, ?latency, "request failed");
                },
            ),
    )
}

#[derive(Clone)]
pub struct AppState {
    authenticator: Authenticator,
    store: MemoryStore,
    settings: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(authenticator: Authenticator, store: MemoryStore, settings: ServerConfig) -> Self {
        Self {
            authenticator,
            store,
            settings: Arc::new(settings),
        }
    }
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        state.authenticator.clone()
    }
}

impl FromRef<AppState> for MemoryStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}

impl FromRef<AppState> for CookiePolicy {
    fn from_ref(state: &AppState) -> Self {
        CookiePolicy::from(state.settings.as_ref())
    }
}

/// Cookie-scheme challenge: send the browser to `/login`, remembering where it was.
#[derive(Debug, Clone)]
pub struct AuthRedirect {
    path_base: String,
    return_url: String,
}

impl AuthRedirect {
    pub fn new(path_base: &str, uri: &Uri) -> Self {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        Self {
            path_base: path_base.to_owned(),
            return_url: format!("{}{}", path_base, path_and_query),
        }
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::temporary(&format!(
            "{}/login?returnUrl={}",
            self.path_base,
            escape_data(&self.return_url)
        ))
        .into_response()
    }
}

/// Handler failure. The detail only reaches the browser through the developer error page.
#[derive(Debug)]
pub struct InternalError(anyhow::Error);

impl<E> From<E> for InternalError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for InternalError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<AuthError>() {
            Some(AuthError::UnknownState) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(%status, "{:#}", self.0);

        let message = status.canonical_reason().unwrap_or("Error");
        let mut response = (status, message).into_response();
        response
            .extensions_mut()
            .insert(ErrorDetail(format!("{:?}", self.0)));
        response
    }
}
