use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{SessionClaims, AUTH_COOKIE};
use crate::error::ApiError;
use crate::state::AppState;

/// JWT authentication middleware: accepts a Bearer header or the `auth-token`
/// cookie and injects the verified `SessionClaims` into the request
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).map_err(|msg| {
        tracing::debug!("Unauthenticated request to {}: {}", request.uri().path(), msg);
        ApiError::unauthorized(msg)
    })?;

    let claims: SessionClaims = state.tokens.verify(&token).map_err(|e| {
        tracing::warn!("Rejected session token on {}: {}", request.uri().path(), e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Bearer header wins over the cookie when both are present
pub fn extract_token(headers: &HeaderMap) -> Result<String, &'static str> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| "Invalid Authorization header format")?;
        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or("Authorization header must use Bearer token format")?
            .trim();
        if token.is_empty() {
            return Err("Empty bearer token");
        }
        return Ok(token.to_string());
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookies) = cookie_header.to_str() else {
            continue;
        };
        for pair in cookies.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if name == AUTH_COOKIE && !value.is_empty() {
                    return Ok(value.to_string());
                }
            }
        }
    }

    Err("Authentication required")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_is_read() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn cookie_is_read_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth-token=abc.def.ghi; lang=en"));
        assert_eq!(extract_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn malformed_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(extract_token(&headers).is_err());
        assert!(extract_token(&HeaderMap::new()).is_err());
    }
}
