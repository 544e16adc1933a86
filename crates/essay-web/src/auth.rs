//! Session token extraction and cookie headers.
//!
//! A request carries its token either as `Authorization: Bearer <token>` or
//! in the session cookie; the header wins when both are present.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use essay_core::routes::Route;

use crate::state::AppState;

/// Resolves the request's [`SessionContext`](essay_core::session::SessionContext)
/// once and hands it to handlers as an extension.
///
/// Anonymous requests for routes that need an identity are sent to the login
/// page before any handler runs.
pub async fn session_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request_token(request.headers(), &state.cookie_name);
    let session = state.session_for(token.as_deref());

    let protected = Route::parse(request.uri().path())
        .is_some_and(|route| route.requires_identity());
    if protected && !session.is_signed_in() {
        return Redirect::to(&Route::Login.path()).into_response();
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Token presented by the request, if any.
#[must_use]
pub fn request_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = header_str(headers, AUTHORIZATION.as_str()).and_then(parse_bearer_token) {
        return Some(token.to_string());
    }
    cookie_token(headers, cookie_name)
}

#[must_use]
pub fn cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// `Set-Cookie` value that stores `token` for `ttl`.
#[must_use]
pub fn session_cookie(cookie_name: &str, token: &str, ttl: Duration) -> String {
    format!(
        "{cookie_name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    )
}

/// `Set-Cookie` value that removes the session cookie.
#[must_use]
pub fn clear_session_cookie(cookie_name: &str) -> String {
    format!("{cookie_name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn header_str<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    headers
        .get(key)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

fn parse_bearer_token(header_value: &str) -> Option<&str> {
    let trimmed = header_value.trim();
    let remainder = if let Some(value) = trimmed.strip_prefix("Bearer ") {
        value
    } else if let Some(value) = trimmed.strip_prefix("bearer ") {
        value
    } else {
        return None;
    };

    let token = remainder.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
