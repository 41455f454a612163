use serde::Deserialize;
use std::net::SocketAddr;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed reading {prefix}* environment: {source}")]
    Env {
        prefix: &'static str,
        #[source]
        source: envy::Error,
    },
    #[error("{0} must not be empty")]
    Missing(&'static str),
    #[error("{name} is not an absolute http(s) url: {value}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("APP_PATH_BASE must start with '/': {0}")]
    InvalidPathBase(String),
}

/// Identity-provider settings. Read once at startup, immutable afterwards.
#[derive(Deserialize, Clone)]
pub struct Auth0Config {
    /// Tenant URL, e.g. `https://example.auth0.com`.
    pub instance: String,
    pub client_id: String,
    pub client_secret: String,
    /// Public URL of this application; `/callback` is appended for the redirect URI.
    pub base_url: String,
}

impl std::fmt::Debug for Auth0Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth0Config")
            .field("instance", &self.instance)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Auth0Config {
    pub const PREFIX: &'static str = "AUTH0_";

    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(Self::PREFIX)
            .from_env::<Self>()
            .map_err(|source| ConfigError::Env {
                prefix: Self::PREFIX,
                source,
            })?
            .validate()
    }

    pub fn validate(mut self) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("AUTH0_INSTANCE", &self.instance),
            ("AUTH0_CLIENT_ID", &self.client_id),
            ("AUTH0_CLIENT_SECRET", &self.client_secret),
            ("AUTH0_BASE_URL", &self.base_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        self.instance = absolute_url("AUTH0_INSTANCE", &self.instance)?;
        self.base_url = absolute_url("AUTH0_BASE_URL", &self.base_url)?;

        Ok(self)
    }
}

fn absolute_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(trimmed.to_owned())
        }
        _ => Err(ConfigError::InvalidUrl {
            name,
            value: value.to_owned(),
        }),
    }
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

/// `None < Lax < Strict`.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    None,
    Lax,
    Strict,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CookieSecure {
    #[default]
    SameAsRequest,
    Always,
    Never,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub environment: Environment,
    pub https_port: Option<u16>,
    #[serde(default)]
    pub path_base: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default)]
    pub minimum_same_site: SameSite,
    #[serde(default)]
    pub cookie_secure: CookieSecure,
    #[serde(default)]
    pub show_pii: bool,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            environment: Environment::default(),
            https_port: None,
            path_base: String::new(),
            static_dir: default_static_dir(),
            minimum_same_site: SameSite::default(),
            cookie_secure: CookieSecure::default(),
            show_pii: false,
        }
    }
}

impl ServerConfig {
    pub const PREFIX: &'static str = "APP_";

    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(Self::PREFIX)
            .from_env::<Self>()
            .map_err(|source| ConfigError::Env {
                prefix: Self::PREFIX,
                source,
            })?
            .validate()
    }

    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let path_base = self.path_base.trim().trim_end_matches('/');
        if !path_base.is_empty() && !path_base.starts_with('/') {
            return Err(ConfigError::InvalidPathBase(self.path_base));
        }
        self.path_base = path_base.to_owned();
        Ok(self)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth0(instance: &str) -> Auth0Config {
        Auth0Config {
            instance: instance.to_string(),
            client_id: "abc123".to_string(),
            client_secret: "shh".to_string(),
            base_url: "http://localhost:3000/".to_string(),
        }
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let config = auth0("https://example.auth0.com/").validate().unwrap();
        assert_eq!(config.instance, "https://example.auth0.com");
        assert_eq!(config.base_url, "http://localhost:3000");
    }

    #[test]
    fn bare_domain_is_rejected() {
        let err = auth0("example.auth0.com").validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                name: "AUTH0_INSTANCE",
                ..
            }
        ));
    }

    #[test]
    fn empty_client_id_is_rejected() {
        let mut config = auth0("https://example.auth0.com");
        config.client_id = " ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("AUTH0_CLIENT_ID"))
        ));
    }

    #[test]
    fn path_base_must_be_rooted() {
        let config = ServerConfig {
            path_base: "web1".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPathBase(_))
        ));

        let config = ServerConfig {
            path_base: "/web1/".to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(config.path_base, "/web1");
    }

    #[test]
    fn same_site_orders_by_strictness() {
        assert!(SameSite::None < SameSite::Lax);
        assert!(SameSite::Lax < SameSite::Strict);
        assert_eq!(SameSite::Lax.max(SameSite::None), SameSite::Lax);
    }
}
