//! HTTP Basic auth gate, applied to every route when credentials are
//! configured. Absent configuration, every request passes through.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::state::AppState;

pub async fn require_basic_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some((user, password)) = state.basic_auth.as_ref() else {
        return Ok(next.run(request).await);
    };

    let Some(header) = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Ok(decoded) = STANDARD.decode(encoded) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Some((given_user, given_password)) = decoded.split_once(':') else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    if constant_time_eq(given_user, user) && constant_time_eq(given_password, password) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_strings() {
        assert!(constant_time_eq("hunter2", "hunter2"));
        assert!(!constant_time_eq("hunter2", "hunter3"));
        assert!(!constant_time_eq("short", "longer"));
    }
}
