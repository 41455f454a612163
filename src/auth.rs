use crate::config::Auth0Config;
use crate::events::{OidcEvents, SignOutContext, SignOutOutcome};
use async_lock::RwLock;
use openidconnect::{
    core::{CoreAuthenticationFlow, CoreClient, CoreIdTokenClaims, CoreProviderMetadata},
    reqwest::async_http_client,
    AccessTokenHash, AuthorizationCode, ClaimsVerificationError, ClientId, ClientSecret,
    CsrfToken, IssuerUrl, Nonce, OAuth2TokenResponse, RedirectUrl,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use url::Url;

/// Label attached to identities asserted by the identity provider.
pub const CLAIMS_ISSUER: &str = "Auth0";

pub const CALLBACK_PATH: &str = "/callback";

/// A login not completed within this window has to start over.
pub const PENDING_LOGIN_TTL: Duration = Duration::from_secs(10 * 60);

pub const MAX_PENDING_LOGINS: usize = 10_000;

/// Only paths on this host may be used as a redirect target.
pub fn is_local_url(url: &str) -> bool {
    match url.as_bytes() {
        [b'/'] => true,
        [b'/', b'/' | b'\\', ..] => false,
        [b'/', ..] => true,
        _ => false,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("provider discovery failed: {0}")]
    Discovery(String),
    #[error("unknown or already used login state")]
    UnknownState,
    #[error("code exchange failed: {0}")]
    TokenExchange(String),
    #[error("token response carried no id token")]
    MissingIdToken,
    #[error("id token rejected: {0}")]
    Claims(#[from] ClaimsVerificationError),
    #[error("id token signing algorithm unusable: {0}")]
    SigningAlgorithm(String),
    #[error("access token does not match the id token's at_hash")]
    AccessTokenHashMismatch,
}

#[derive(Clone, Debug)]
struct PendingLogin {
    nonce: Nonce,
    return_url: Option<String>,
    issued_at: Instant,
}

type OidcStore = Arc<RwLock<HashMap<String, PendingLogin>>>;

#[derive(Clone, Debug)]
pub struct Authenticator {
    client: CoreClient,
    store: OidcStore,
    events: Arc<dyn OidcEvents>,
    pending_ttl: Duration,
    max_pending: usize,
}

/// Result of a successful authorization-code round trip.
#[derive(Debug)]
pub struct VerifiedLogin {
    pub access_token: AccessToken,
    pub claims: Claims,
    pub return_url: Option<String>,
}

impl Authenticator {
    pub async fn discover(
        config: &Auth0Config,
        events: Arc<dyn OidcEvents>,
    ) -> Result<Self, AuthError> {
        // Auth0 issuers carry a trailing slash.
        let issuer = IssuerUrl::new(format!("{}/", config.instance))?;
        tracing::info!(issuer = %issuer.as_str(), "discovering provider metadata");

        let provider_metadata = CoreProviderMetadata::discover_async(issuer, async_http_client)
            .await
            .map_err(|e| AuthError::Discovery(e.to_string()))?;

        Self::from_provider_metadata(config, provider_metadata, events)
    }

    pub fn from_provider_metadata(
        config: &Auth0Config,
        provider_metadata: CoreProviderMetadata,
        events: Arc<dyn OidcEvents>,
    ) -> Result<Self, AuthError> {
        let client = CoreClient::from_provider_metadata(
            provider_metadata,
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
        )
        .set_redirect_uri(RedirectUrl::new(format!(
            "{}{}",
            config.base_url, CALLBACK_PATH
        ))?);

        Ok(Self {
            client,
            store: Arc::new(RwLock::new(HashMap::new())),
            events,
            pending_ttl: PENDING_LOGIN_TTL,
            max_pending: MAX_PENDING_LOGINS,
        })
    }

    pub fn with_pending_login_ttl(mut self, ttl: Duration) -> Self {
        self.pending_ttl = ttl;
        self
    }

    pub fn with_max_pending_logins(mut self, max: usize) -> Self {
        self.max_pending = max.max(1);
        self
    }

    /// Authorization-code challenge. Only the `openid` scope is requested.
    pub async fn login_redirect_url(&self, return_url: Option<String>) -> Url {
        let (auth_url, csrf_token, nonce) = self
            .client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .url();

        let now = Instant::now();
        let mut store = self.store.write().await;
        store.retain(|_, pending| now.duration_since(pending.issued_at) < self.pending_ttl);

        while store.len() >= self.max_pending {
            let oldest = store
                .iter()
                .min_by_key(|(_, pending)| pending.issued_at)
                .map(|(state, _)| state.clone());
            match oldest {
                Some(state) => store.remove(&state),
                None => break,
            };
        }

        store.insert(
            csrf_token.secret().to_owned(),
            PendingLogin {
                nonce,
                return_url,
                issued_at: now,
            },
        );

        tracing::debug!(pending = store.len(), "login challenge issued");

        auth_url
    }

    pub async fn verify_code(&self, state: String, code: String) -> Result<VerifiedLogin, AuthError> {
        let pending = self
            .store
            .write()
            .await
            .remove(&state)
            .filter(|pending| pending.issued_at.elapsed() < self.pending_ttl)
            .ok_or(AuthError::UnknownState)?;

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        let id_token_verifier = self.client.id_token_verifier();
        let id_token = token_response
            .extra_fields()
            .id_token()
            .ok_or(AuthError::MissingIdToken)?;
        let id_token_claims = id_token.claims(&id_token_verifier, &pending.nonce)?;

        if let Some(expected_access_token_hash) = id_token_claims.access_token_hash() {
            let alg = id_token
                .signing_alg()
                .map_err(|e| AuthError::SigningAlgorithm(e.to_string()))?;
            let actual = AccessTokenHash::from_token(token_response.access_token(), &alg)
                .map_err(|e| AuthError::SigningAlgorithm(e.to_string()))?;

            if actual != *expected_access_token_hash {
                return Err(AuthError::AccessTokenHashMismatch);
            }
        }

        Ok(VerifiedLogin {
            access_token: AccessToken(token_response.access_token().clone()),
            claims: Claims(id_token_claims.clone()),
            return_url: pending.return_url,
        })
    }

    /// Where to send the browser once the local session is gone.
    pub fn sign_out(&self, ctx: &SignOutContext) -> String {
        match self.events.redirect_to_identity_provider_for_sign_out(ctx) {
            SignOutOutcome::Handled { location } => location,
            SignOutOutcome::Continue => ctx
                .post_logout_target
                .clone()
                .filter(|target| is_local_url(target))
                .unwrap_or_else(|| format!("{}/", ctx.origin.path_base)),
        }
    }

    pub async fn pending_logins(&self) -> usize {
        self.store.read().await.len()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AccessToken(openidconnect::AccessToken);

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims(CoreIdTokenClaims);

impl Claims {
    pub fn subject(&self) -> &str {
        self.0.subject().as_str()
    }

    pub fn picture(&self) -> Option<String> {
        self.0
            .picture()
            .and_then(|p| p.get(None))
            .map(|url| url.to_string())
    }

    pub fn nickname(&self) -> Option<String> {
        self.0
            .nickname()
            .and_then(|n| n.get(None))
            .map(|n| n.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::is_local_url;

    #[test]
    fn local_urls() {
        assert!(is_local_url("/"));
        assert!(is_local_url("/user?tab=1"));
        assert!(!is_local_url("//evil.example"));
        assert!(!is_local_url("/\\evil.example"));
        assert!(!is_local_url("https://evil.example"));
        assert!(!is_local_url(""));
    }
}
