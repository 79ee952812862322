pub mod code;
pub mod password;
pub mod token;

use axum::http::HeaderValue;

pub use code::{CodeError, CodeStatus, OneTimeCode};
pub use token::{MagicLinkClaims, SessionClaims, TokenError, TokenSigner};

/// Name of the session cookie
pub const AUTH_COOKIE: &str = "auth-token";

/// Session cookie lifetime (7 days)
pub const AUTH_COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Build the `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, secure: bool) -> HeaderValue {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        AUTH_COOKIE, token, AUTH_COOKIE_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    // JWTs are base64url with dots, always a valid header value
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Build the `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("auth-token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Secure")
    } else {
        HeaderValue::from_static("auth-token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let value = session_cookie("abc.def.ghi", true);
        let s = value.to_str().unwrap();
        assert!(s.starts_with("auth-token=abc.def.ghi;"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("Max-Age=604800"));
        assert!(s.ends_with("; Secure"));
    }

    #[test]
    fn clearing_cookie_expires_it() {
        let value = clear_session_cookie(false);
        assert!(value.to_str().unwrap().contains("Max-Age=0"));
    }
}
