//! Identity backend HTTP client: cookie validation.
//!
//! The gateway never inspects session cookies itself — it forwards the raw
//! `Cookie` header to the backend's user endpoint and lets the identity
//! provider decide. The backend may rotate cookies while answering; those
//! `set-cookie` values are surfaced so the gatekeeper can re-issue them.

use reqwest::StatusCode;
use reqwest::header;

use crate::config::Config;
use crate::types::{Envelope, UserIdentity};

/// Result of asking the backend "who is this?".
#[derive(Debug)]
pub struct ResolvedIdentity {
    /// `None` when the cookies resolve to no valid session.
    pub user: Option<UserIdentity>,
    /// Raw `set-cookie` values the backend attached (cookie rotation).
    pub rotated_cookies: Vec<String>,
}

impl ResolvedIdentity {
    pub fn anonymous() -> Self {
        Self {
            user: None,
            rotated_cookies: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("identity backend answered {0}")]
    Backend(StatusCode),

    #[error("identity response malformed: {0}")]
    Decode(String),
}

/// Validate `cookie_header` against the identity backend.
///
/// No cookies means no session — the backend is not called.
pub async fn resolve_user(
    http: &reqwest::Client,
    config: &Config,
    cookie_header: Option<&str>,
) -> Result<ResolvedIdentity, IdentityError> {
    let Some(cookies) = cookie_header.filter(|c| !c.is_empty()) else {
        return Ok(ResolvedIdentity::anonymous());
    };

    let response = http
        .get(config.identity_user_url())
        .header(header::COOKIE, cookies)
        .send()
        .await?;

    let rotated_cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(String::from))
        .collect();

    let status = response.status();
    if status.is_success() {
        let envelope: Envelope<UserIdentity> = response
            .json()
            .await
            .map_err(|err| IdentityError::Decode(err.to_string()))?;
        let user = envelope
            .into_result()
            .map_err(|err| IdentityError::Decode(err.to_string()))?;
        Ok(ResolvedIdentity {
            user: Some(user),
            rotated_cookies,
        })
    } else if status == StatusCode::UNAUTHORIZED {
        Ok(ResolvedIdentity {
            user: None,
            rotated_cookies,
        })
    } else {
        Err(IdentityError::Backend(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        let mut config = Config::test_default();
        config.backend_origin = server.uri();
        config
    }

    #[tokio::test]
    async fn test_resolves_user_from_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/access/auth/user"))
            .and(header("cookie", "sb-access-token=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"id": "u-1", "email": "admin@volvix.com.br"}
            })))
            .mount(&server)
            .await;

        let resolved = resolve_user(
            &reqwest::Client::new(),
            &config_for(&server),
            Some("sb-access-token=abc"),
        )
        .await
        .unwrap();

        let user = resolved.user.unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.email.as_deref(), Some("admin@volvix.com.br"));
    }

    #[tokio::test]
    async fn test_unauthorized_resolves_to_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "error": "Não autorizado"
            })))
            .mount(&server)
            .await;

        let resolved = resolve_user(
            &reqwest::Client::new(),
            &config_for(&server),
            Some("sb-access-token=stale"),
        )
        .await
        .unwrap();
        assert!(resolved.user.is_none());
    }

    #[tokio::test]
    async fn test_no_cookies_skips_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let resolved = resolve_user(&reqwest::Client::new(), &config_for(&server), None)
            .await
            .unwrap();
        assert!(resolved.user.is_none());

        let resolved = resolve_user(&reqwest::Client::new(), &config_for(&server), Some(""))
            .await
            .unwrap();
        assert!(resolved.user.is_none());
    }

    #[tokio::test]
    async fn test_rotated_cookies_surface() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "success": true,
                        "data": {"id": "u-1"}
                    }))
                    .append_header("set-cookie", "sb-access-token=rotated; Path=/")
                    .append_header("set-cookie", "sb-refresh-token=rotated2; Path=/"),
            )
            .mount(&server)
            .await;

        let resolved = resolve_user(
            &reqwest::Client::new(),
            &config_for(&server),
            Some("sb-access-token=old"),
        )
        .await
        .unwrap();
        assert_eq!(
            resolved.rotated_cookies,
            vec![
                "sb-access-token=rotated; Path=/",
                "sb-refresh-token=rotated2; Path=/"
            ]
        );
    }

    #[tokio::test]
    async fn test_backend_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = resolve_user(
            &reqwest::Client::new(),
            &config_for(&server),
            Some("sb-access-token=abc"),
        )
        .await;
        assert!(matches!(result, Err(IdentityError::Backend(_))));
    }
}
