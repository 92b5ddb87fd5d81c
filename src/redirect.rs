//! Post-login redirect target validation.
//!
//! A sign-in link carries a `redirect` query parameter naming where to send
//! the user afterwards. That parameter is attacker-reachable, so before it is
//! ever navigated to or embedded in a link it must point at an allow-listed
//! origin. Anything else degrades to a fixed fallback.

use url::Url;

/// Whether `uri` is acceptable as a redirect target.
///
/// Absent or empty input is fine — it means "no redirect requested" and the
/// caller falls back to its default. Non-empty input must parse as an
/// absolute URL whose origin (scheme + host + port) exactly matches one of
/// `allowed_origins`; path, query and fragment are unconstrained.
pub fn validate_redirect_uri(uri: Option<&str>, allowed_origins: &[String]) -> bool {
    let Some(uri) = uri.filter(|u| !u.is_empty()) else {
        return true;
    };

    let Ok(url) = Url::parse(uri) else {
        tracing::warn!(uri, "rejected unparseable redirect target");
        return false;
    };

    let allowed = allowed_origins
        .iter()
        .any(|origin| Url::parse(origin).is_ok_and(|o| o.origin() == url.origin()));

    if !allowed {
        tracing::warn!(uri, "blocked redirect target outside origin allow-list");
    }

    allowed
}

/// `uri` if it passes validation, otherwise `fallback`.
pub fn safe_redirect_uri<'a>(
    uri: Option<&'a str>,
    fallback: &'a str,
    allowed_origins: &[String],
) -> &'a str {
    match uri.filter(|u| !u.is_empty()) {
        Some(candidate) if validate_redirect_uri(Some(candidate), allowed_origins) => candidate,
        Some(_) => fallback,
        None => fallback,
    }
}

/// Build the identity provider's sign-in link with `current` as the return
/// target, degrading to the root path when `current` is not allow-listed.
pub fn sign_in_redirect_url(
    sign_in_url: &str,
    current: Option<&str>,
    allowed_origins: &[String],
) -> String {
    let target = safe_redirect_uri(current, "/", allowed_origins);
    format!("{}?redirect={}", sign_in_url, urlencoding::encode(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec![
            "https://volvix.com.br".into(),
            "https://syncro.volvix.com.br".into(),
            "http://localhost:3000".into(),
            "http://localhost:3001".into(),
        ]
    }

    #[test]
    fn test_absent_and_empty_are_valid() {
        assert!(validate_redirect_uri(None, &allowed()));
        assert!(validate_redirect_uri(Some(""), &allowed()));
    }

    #[test]
    fn test_allow_listed_origins_pass_regardless_of_path() {
        for uri in [
            "https://volvix.com.br",
            "https://volvix.com.br/app/users?page=2#row-9",
            "https://syncro.volvix.com.br/app/companies",
            "http://localhost:3000/app",
            "http://localhost:3001/",
        ] {
            assert!(validate_redirect_uri(Some(uri), &allowed()), "{uri}");
        }
    }

    #[test]
    fn test_foreign_origins_fail() {
        for uri in [
            "https://evil.example/x",
            "https://volvix.com.br.evil.example/app",
            "https://sub.volvix.com.br/app",
            "http://volvix.com.br/",
            "https://volvix.com.br:8443/",
            "http://localhost:9999/",
        ] {
            assert!(!validate_redirect_uri(Some(uri), &allowed()), "{uri}");
        }
    }

    #[test]
    fn test_unparseable_and_relative_fail() {
        for uri in ["not a url", "/app/users", "//evil.example/x", "javascript:alert(1)"] {
            assert!(!validate_redirect_uri(Some(uri), &allowed()), "{uri}");
        }
    }

    #[test]
    fn test_default_port_normalization() {
        // An explicit default port is the same origin as the bare form.
        assert!(validate_redirect_uri(
            Some("https://volvix.com.br:443/app"),
            &allowed()
        ));
    }

    #[test]
    fn test_safe_redirect_uri_passthrough_and_fallback() {
        let allowed = allowed();
        assert_eq!(safe_redirect_uri(None, "/", &allowed), "/");
        assert_eq!(safe_redirect_uri(Some(""), "/", &allowed), "/");
        assert_eq!(safe_redirect_uri(Some("not a url"), "/", &allowed), "/");
        assert_eq!(
            safe_redirect_uri(Some("https://evil.example/x"), "/", &allowed),
            "/"
        );
        assert_eq!(
            safe_redirect_uri(Some("https://volvix.com.br/x"), "/", &allowed),
            "https://volvix.com.br/x"
        );
    }

    #[test]
    fn test_sign_in_redirect_url() {
        let allowed = allowed();
        assert_eq!(
            sign_in_redirect_url(
                "https://volvix.com.br/auth/sign-in",
                Some("https://syncro.volvix.com.br/app/users?page=2"),
                &allowed
            ),
            "https://volvix.com.br/auth/sign-in?redirect=https%3A%2F%2Fsyncro.volvix.com.br%2Fapp%2Fusers%3Fpage%3D2"
        );
        assert_eq!(
            sign_in_redirect_url(
                "https://volvix.com.br/auth/sign-in",
                Some("https://evil.example/x"),
                &allowed
            ),
            "https://volvix.com.br/auth/sign-in?redirect=%2F"
        );
    }
}
