//! Hooks into the OpenID Connect sign-in/sign-out lifecycle.

use crate::config::Auth0Config;
use crate::extractor::RequestOrigin;
use crate::logout::{build_logout_url, LogoutRedirectRequest};
use std::fmt::Debug;

/// What the sign-out hook sees about the current request.
#[derive(Debug, Clone)]
pub struct SignOutContext {
    /// Where the caller wants the browser to end up. Absolute or root-relative.
    pub post_logout_target: Option<String>,
    pub origin: RequestOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutOutcome {
    /// The hook chose the redirect; default processing must stop.
    Handled { location: String },
    Continue,
}

pub trait OidcEvents: Debug + Send + Sync {
    /// Called before the browser is sent to the identity provider to sign out.
    fn redirect_to_identity_provider_for_sign_out(&self, _ctx: &SignOutContext) -> SignOutOutcome {
        SignOutOutcome::Continue
    }
}

#[derive(Debug, Default)]
pub struct DefaultEvents;

impl OidcEvents for DefaultEvents {}

/// Sends the browser through Auth0's `/v2/logout` endpoint.
#[derive(Debug, Clone)]
pub struct Auth0Events {
    domain: String,
    client_id: String,
}

impl Auth0Events {
    pub fn new(config: &Auth0Config) -> Self {
        Self {
            domain: config.instance.clone(),
            client_id: config.client_id.clone(),
        }
    }
}

impl OidcEvents for Auth0Events {
    fn redirect_to_identity_provider_for_sign_out(&self, ctx: &SignOutContext) -> SignOutOutcome {
        let request = LogoutRedirectRequest {
            identity_provider_domain: &self.domain,
            client_id: &self.client_id,
            post_logout_target: ctx.post_logout_target.as_deref(),
            request_scheme: &ctx.origin.scheme,
            request_host: &ctx.origin.host,
            request_path_base: &ctx.origin.path_base,
        };

        SignOutOutcome::Handled {
            location: build_logout_url(&request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(target: Option<&str>) -> SignOutContext {
        SignOutContext {
            post_logout_target: target.map(str::to_owned),
            origin: RequestOrigin {
                scheme: "https".to_string(),
                host: "myapp.com".to_string(),
                path_base: "/web1".to_string(),
            },
        }
    }

    fn events() -> Auth0Events {
        Auth0Events::new(&Auth0Config {
            instance: "https://example.auth0.com".to_string(),
            client_id: "abc123".to_string(),
            client_secret: "shh".to_string(),
            base_url: "https://myapp.com".to_string(),
        })
    }

    #[test]
    fn auth0_handles_sign_out() {
        assert_eq!(
            events().redirect_to_identity_provider_for_sign_out(&context(Some("/"))),
            SignOutOutcome::Handled {
                location: "https://example.auth0.com/v2/logout?client_id=abc123&returnTo=https%3A%2F%2Fmyapp.com%2Fweb1%2F".to_string()
            }
        );
    }

    #[test]
    fn auth0_handles_sign_out_without_target() {
        assert_eq!(
            events().redirect_to_identity_provider_for_sign_out(&context(None)),
            SignOutOutcome::Handled {
                location: "https://example.auth0.com/v2/logout?client_id=abc123".to_string()
            }
        );
    }

    #[test]
    fn default_events_continue() {
        assert_eq!(
            DefaultEvents.redirect_to_identity_provider_for_sign_out(&context(Some("/"))),
            SignOutOutcome::Continue
        );
    }
}
