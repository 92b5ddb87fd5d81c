//! Edge authentication middleware for page routes.
//!
//! Runs before every page request (never on `/api/*` or `/health` — those
//! live on sibling routers, so the proxy stays reachable for unauthenticated
//! callers). Resolves the caller's identity by forwarding their cookies to
//! the identity backend, re-issues any rotated cookies with this app's
//! attributes, and bounces unauthenticated callers off protected paths to
//! the identity provider's sign-in page with a validated return URL.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::AppState;
use crate::config::Config;
use crate::identity::client::{ResolvedIdentity, resolve_user};
use crate::redirect::validate_redirect_uri;

/// Page prefix that requires an authenticated session.
const PROTECTED_PREFIX: &str = "/app";

pub async fn gatekeeper(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if is_static_asset(&path) {
        return next.run(req).await;
    }

    let current_url = absolute_request_url(&state.config, &req);
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let resolved = resolve_user(
        &state.http_client,
        &state.config,
        cookie_header.as_deref(),
    )
    .await
    .unwrap_or_else(|err| {
        // An unreachable identity backend reads as "not signed in": the
        // caller lands on sign-in rather than an error page.
        tracing::warn!(error = %err, "identity resolution failed");
        ResolvedIdentity::anonymous()
    });

    if resolved.user.is_none() && is_protected(&path) {
        if state.config.environment.is_development() {
            tracing::debug!(path, "development mode: allowing unauthenticated access");
            return next.run(req).await;
        }
        return sign_in_redirect(&state.config, &path, current_url);
    }

    let mut response = next.run(req).await;
    append_rotated_cookies(&mut response, &resolved.rotated_cookies, &state.config);
    response
}

fn sign_in_redirect(config: &Config, path: &str, current_url: String) -> Response {
    let redirect_target = if validate_redirect_uri(
        Some(&current_url),
        &config.allowed_redirect_origins,
    ) {
        current_url
    } else {
        // Never forward an unvalidated absolute URL; rebuild from the path.
        format!("{}{}", config.app_origin, path)
    };

    let sign_in = format!(
        "{}?redirect={}",
        config.sign_in_url(),
        urlencoding::encode(&redirect_target)
    );
    tracing::info!(path, "unauthenticated request, redirecting to sign-in");
    Redirect::temporary(&sign_in).into_response()
}

/// The absolute URL the caller requested, reconstructed from the `Host`
/// header and the proxy-aware scheme.
fn absolute_request_url(config: &Config, req: &Request) -> String {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let scheme = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(if config.environment.is_production() {
            "https"
        } else {
            "http"
        });

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("{scheme}://{host}{path_and_query}")
}

fn append_rotated_cookies(response: &mut Response, rotated: &[String], config: &Config) {
    for raw in rotated {
        let Some(rewritten) = rewrite_cookie(raw, config) else {
            tracing::warn!("dropping malformed rotated cookie");
            continue;
        };
        match HeaderValue::from_str(&rewritten) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!("dropping unencodable rotated cookie"),
        }
    }
}

/// Re-issue a backend `Set-Cookie` with this application's attributes:
/// host-wide path, `HttpOnly`, `SameSite=Lax`, plus `Secure` and the parent
/// `Domain` in production. `Max-Age`/`Expires` are preserved from the
/// backend's value.
fn rewrite_cookie(raw: &str, config: &Config) -> Option<String> {
    let mut segments = raw.split(';').map(str::trim);
    let pair = segments.next()?;
    if !pair.contains('=') || pair.starts_with('=') {
        return None;
    }

    let mut parts = vec![pair.to_string()];
    for segment in segments {
        let attribute = segment.split('=').next().unwrap_or("");
        if attribute.eq_ignore_ascii_case("max-age") || attribute.eq_ignore_ascii_case("expires") {
            parts.push(segment.to_string());
        }
    }

    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Lax".into());
    if config.environment.is_production() {
        parts.push("Secure".into());
        if let Some(domain) = &config.cookie_domain {
            parts.push(format!("Domain={domain}"));
        }
    }

    Some(parts.join("; "))
}

/// Paths served without any identity handling: the favicon, the asset
/// bundle, and raw image files.
fn is_static_asset(path: &str) -> bool {
    if path == "/favicon.ico" || path.starts_with("/assets/") {
        return true;
    }
    [".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

fn is_protected(path: &str) -> bool {
    path == PROTECTED_PREFIX || path.starts_with("/app/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_static_asset_matcher() {
        assert!(is_static_asset("/favicon.ico"));
        assert!(is_static_asset("/assets/index-BdAs91.js"));
        assert!(is_static_asset("/logo.svg"));
        assert!(is_static_asset("/images/avatar.webp"));
        assert!(!is_static_asset("/app/users"));
        assert!(!is_static_asset("/"));
    }

    #[test]
    fn test_protected_prefix() {
        assert!(is_protected("/app"));
        assert!(is_protected("/app/users-management"));
        assert!(!is_protected("/apples"));
        assert!(!is_protected("/"));
        assert!(!is_protected("/about"));
    }

    #[test]
    fn test_rewrite_cookie_development() {
        let mut config = Config::test_default();
        config.environment = Environment::Development;

        let rewritten = rewrite_cookie(
            "sb-access-token=abc; Domain=volvix.com.br; Max-Age=3600; Secure",
            &config,
        )
        .unwrap();
        assert!(rewritten.starts_with("sb-access-token=abc"));
        assert!(rewritten.contains("Max-Age=3600"));
        assert!(rewritten.contains("HttpOnly"));
        assert!(rewritten.contains("SameSite=Lax"));
        assert!(rewritten.contains("Path=/"));
        // Development: no Secure, no Domain override
        assert!(!rewritten.contains("Secure"));
        assert!(!rewritten.contains("Domain="));
    }

    #[test]
    fn test_rewrite_cookie_production() {
        let mut config = Config::test_default();
        config.cookie_domain = Some(".volvix.com.br".into());

        let rewritten = rewrite_cookie("sb-access-token=abc; Path=/auth", &config).unwrap();
        assert!(rewritten.contains("Secure"));
        assert!(rewritten.contains("Domain=.volvix.com.br"));
        // Backend's narrower path is replaced with the host-wide one
        assert!(rewritten.contains("Path=/"));
        assert!(!rewritten.contains("Path=/auth"));
    }

    #[test]
    fn test_rewrite_cookie_rejects_malformed() {
        let config = Config::test_default();
        assert!(rewrite_cookie("no-equals-sign", &config).is_none());
        assert!(rewrite_cookie("=value-without-name", &config).is_none());
    }

    #[test]
    fn test_absolute_request_url() {
        let config = Config::test_default();
        let req = Request::builder()
            .uri("/app/users?page=2")
            .header("host", "syncro.volvix.com.br")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(
            absolute_request_url(&config, &req),
            "https://syncro.volvix.com.br/app/users?page=2"
        );
    }

    #[test]
    fn test_absolute_request_url_forwarded_proto() {
        let mut config = Config::test_default();
        config.environment = Environment::Development;
        let req = Request::builder()
            .uri("/app")
            .header("host", "syncro.volvix.com.br")
            .header("x-forwarded-proto", "https")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(
            absolute_request_url(&config, &req),
            "https://syncro.volvix.com.br/app"
        );
    }
}
