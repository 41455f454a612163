//! Identity-provider sign-out URL construction.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except the RFC 3986 unreserved characters.
const DATA: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Inputs for one sign-out redirect. Built per request and dropped after use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutRedirectRequest<'a> {
    pub identity_provider_domain: &'a str,
    pub client_id: &'a str,
    pub post_logout_target: Option<&'a str>,
    pub request_scheme: &'a str,
    pub request_host: &'a str,
    pub request_path_base: &'a str,
}

pub(crate) fn escape_data(value: &str) -> String {
    utf8_percent_encode(value, DATA).to_string()
}

/// Builds `{domain}/v2/logout?client_id=..[&returnTo=..]`.
///
/// A root-relative target is made absolute against the originating request.
/// Anything else is forwarded as given.
pub fn build_logout_url(request: &LogoutRedirectRequest<'_>) -> String {
    let mut logout_url = format!(
        "{}/v2/logout?client_id={}",
        request.identity_provider_domain,
        escape_data(request.client_id)
    );

    let target = match request.post_logout_target {
        Some(target) if !target.is_empty() => target,
        _ => return logout_url,
    };

    let return_to = if target.starts_with('/') {
        format!(
            "{}://{}{}{}",
            request.request_scheme, request.request_host, request.request_path_base, target
        )
    } else {
        if !is_absolute(target) {
            tracing::warn!(
                target,
                "post-logout target is neither root-relative nor absolute; forwarding unchanged"
            );
        }
        target.to_owned()
    };

    logout_url.push_str("&returnTo=");
    logout_url.push_str(&escape_data(&return_to));
    logout_url
}

fn is_absolute(target: &str) -> bool {
    url::Url::parse(target).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(target: Option<&'a str>) -> LogoutRedirectRequest<'a> {
        LogoutRedirectRequest {
            identity_provider_domain: "https://example.auth0.com",
            client_id: "abc123",
            post_logout_target: target,
            request_scheme: "https",
            request_host: "myapp.com",
            request_path_base: "",
        }
    }

    #[test]
    fn root_relative_target_is_made_absolute() {
        assert_eq!(
            build_logout_url(&request(Some("/goodbye"))),
            "https://example.auth0.com/v2/logout?client_id=abc123&returnTo=https%3A%2F%2Fmyapp.com%2Fgoodbye"
        );
    }

    #[test]
    fn empty_or_missing_target_returns_base() {
        let base = "https://example.auth0.com/v2/logout?client_id=abc123";
        assert_eq!(build_logout_url(&request(Some(""))), base);
        assert_eq!(build_logout_url(&request(None)), base);
    }

    #[test]
    fn path_base_sits_between_host_and_target() {
        let mut req = request(Some("/bye?x=1"));
        req.request_path_base = "/web1";
        req.request_host = "localhost:8443";
        assert_eq!(
            build_logout_url(&req),
            "https://example.auth0.com/v2/logout?client_id=abc123&returnTo=https%3A%2F%2Flocalhost%3A8443%2Fweb1%2Fbye%3Fx%3D1"
        );
    }

    #[test]
    fn absolute_target_is_not_rewritten() {
        assert_eq!(
            build_logout_url(&request(Some("https://other.example/signed-out"))),
            "https://example.auth0.com/v2/logout?client_id=abc123&returnTo=https%3A%2F%2Fother.example%2Fsigned-out"
        );
    }

    #[test]
    fn bare_relative_target_passes_through() {
        assert_eq!(
            build_logout_url(&request(Some("goodbye"))),
            "https://example.auth0.com/v2/logout?client_id=abc123&returnTo=goodbye"
        );
    }

    #[test]
    fn query_injection_is_escaped() {
        let url = build_logout_url(&request(Some("https://a.example/?x=1&client_id=evil")));
        assert_eq!(url.matches('&').count(), 1);
        assert!(url.ends_with("returnTo=https%3A%2F%2Fa.example%2F%3Fx%3D1%26client_id%3Devil"));
    }

    #[test]
    fn client_id_is_escaped() {
        let mut req = request(None);
        req.client_id = "a b&c";
        assert_eq!(
            build_logout_url(&req),
            "https://example.auth0.com/v2/logout?client_id=a%20b%26c"
        );
    }

    #[test]
    fn same_input_same_output() {
        let req = request(Some("/goodbye"));
        assert_eq!(build_logout_url(&req), build_logout_url(&req));
    }
}
