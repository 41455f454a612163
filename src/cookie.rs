//! Session cookie attributes under the configured cookie policy.

use crate::config::{CookieSecure, SameSite, ServerConfig};
use crate::extractor::RequestOrigin;
use axum_extra::extract::cookie::{Cookie, SameSite as CookieSameSite};

pub const COOKIE_NAME: &str = "auth-session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub minimum_same_site: SameSite,
    pub secure: CookieSecure,
}

impl From<&ServerConfig> for CookiePolicy {
    fn from(config: &ServerConfig) -> Self {
        Self {
            minimum_same_site: config.minimum_same_site,
            secure: config.cookie_secure,
        }
    }
}

impl CookiePolicy {
    /// Session cookies ask for `Lax`; the policy may only make that stricter.
    fn same_site(&self) -> CookieSameSite {
        match SameSite::Lax.max(self.minimum_same_site) {
            SameSite::None => CookieSameSite::None,
            SameSite::Lax => CookieSameSite::Lax,
            SameSite::Strict => CookieSameSite::Strict,
        }
    }

    fn secure(&self, origin: &RequestOrigin) -> bool {
        match self.secure {
            CookieSecure::Always => true,
            CookieSecure::Never => false,
            CookieSecure::SameAsRequest => origin.is_https(),
        }
    }

    pub fn session_cookie(&self, value: String, origin: &RequestOrigin) -> Cookie<'static> {
        let path = if origin.path_base.is_empty() {
            "/".to_string()
        } else {
            origin.path_base.clone()
        };

        let mut cookie = Cookie::new(COOKIE_NAME, value);
        cookie.set_http_only(true);
        cookie.set_secure(self.secure(origin));
        cookie.set_same_site(self.same_site());
        cookie.set_path(path);
        cookie
    }

    /// Same attributes as the session cookie, emptied and already expired.
    pub fn removal_cookie(&self, origin: &RequestOrigin) -> Cookie<'static> {
        let mut cookie = self.session_cookie(String::new(), origin);
        cookie.make_removal();
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(scheme: &str, path_base: &str) -> RequestOrigin {
        RequestOrigin {
            scheme: scheme.to_string(),
            host: "myapp.com".to_string(),
            path_base: path_base.to_string(),
        }
    }

    #[test]
    fn lax_by_default_and_secure_over_https() {
        let policy = CookiePolicy::from(&ServerConfig::default());

        let cookie = policy.session_cookie("abc".into(), &origin("https", ""));
        assert_eq!(cookie.name(), COOKIE_NAME);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.same_site(), Some(CookieSameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));

        let cookie = policy.session_cookie("abc".into(), &origin("http", ""));
        assert_eq!(cookie.secure(), Some(false));
    }

    #[test]
    fn minimum_policy_raises_same_site() {
        let policy = CookiePolicy {
            minimum_same_site: SameSite::Strict,
            secure: CookieSecure::Always,
        };
        let cookie = policy.session_cookie("abc".into(), &origin("http", "/web1"));
        assert_eq!(cookie.same_site(), Some(CookieSameSite::Strict));
        assert_eq!(cookie.path(), Some("/web1"));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn removal_cookie_keeps_attributes() {
        let policy = CookiePolicy {
            minimum_same_site: SameSite::None,
            secure: CookieSecure::Never,
        };
        let cookie = policy.removal_cookie(&origin("https", ""));
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age().map(|age| age.is_zero()), Some(true));
        assert_eq!(cookie.same_site(), Some(CookieSameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(false));
    }
}
