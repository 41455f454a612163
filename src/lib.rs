pub mod auth;
pub mod config;
pub mod cookie;
pub mod events;
pub mod extractor;
pub mod handler;
pub mod logout;
pub mod middleware;
pub mod server;

pub use config::{Auth0Config, ServerConfig};
pub use logout::{build_logout_url, LogoutRedirectRequest};
