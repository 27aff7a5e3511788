// Session cookie carrier
//
// The cookie value is `<token>.<hex hmac-sha256(token)>` keyed with a secret
// independent of the token signing secret. A forged cookie is caught here and
// a forged token inside a correctly signed cookie is caught by the token service.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::Duration;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::auth::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Cookie name carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}

/// Writes, reads and clears the signed session cookie.
#[derive(Clone)]
pub struct SessionCookies {
    mac: HmacSha256,
    max_age: Duration,
    secure: bool,
}

impl SessionCookies {
    pub fn new(cookie_secret: &[u8], max_age: Duration, secure: bool) -> Result<Self, AuthError> {
        if cookie_secret.is_empty() {
            return Err(AuthError::ConfigError(
                "cookie signing secret must not be empty".to_string(),
            ));
        }
        let mac = HmacSha256::new_from_slice(cookie_secret)
            .map_err(|e| AuthError::ConfigError(e.to_string()))?;

        Ok(Self {
            mac,
            max_age,
            secure,
        })
    }

    fn sign(&self, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn attributes(&self, max_age_secs: i64) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!("HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}", max_age_secs, secure)
    }

    /// `Set-Cookie` value binding `token` to the client, expiring with the token.
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}.{}; {}",
            SESSION_COOKIE_NAME,
            token,
            self.sign(token),
            self.attributes(self.max_age.num_seconds())
        )
    }

    /// `Set-Cookie` value overwriting the session with an empty, already-expired one.
    pub fn cleared_cookie(&self) -> String {
        format!(
            "{}=; {}; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            SESSION_COOKIE_NAME,
            self.attributes(0)
        )
    }

    /// Append the session cookie for `token` to the response headers.
    pub fn attach(&self, headers: &mut HeaderMap, token: &str) -> Result<(), AuthError> {
        let value = HeaderValue::from_str(&self.session_cookie(token))
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))?;
        headers.append(header::SET_COOKIE, value);
        Ok(())
    }

    /// Append a cookie that removes the session on the client.
    pub fn clear(&self, headers: &mut HeaderMap) {
        // The cleared cookie is plain ASCII
        if let Ok(value) = HeaderValue::from_str(&self.cleared_cookie()) {
            headers.append(header::SET_COOKIE, value);
        }
    }

    /// Read the session token from the request.
    ///
    /// `Ok(None)` when there is no session (absent or cleared cookie).
    /// `Err(TamperedCookie)` when the cookie's own signature does not verify.
    pub fn extract(&self, headers: &HeaderMap) -> Result<Option<String>, AuthError> {
        let raw = match get_cookie(headers, SESSION_COOKIE_NAME) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(None),
        };

        let (token, signature) = raw.rsplit_once('.').ok_or(AuthError::TamperedCookie)?;
        let signature = hex::decode(signature).map_err(|_| AuthError::TamperedCookie)?;

        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::TamperedCookie)?;

        Ok(Some(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOKIE_SECRET: &[u8] = b"cookie_secret_for_tests_only_32_bytes!";
    const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOjF9.c2lnbmF0dXJl";

    fn cookies(secure: bool) -> SessionCookies {
        SessionCookies::new(COOKIE_SECRET, Duration::days(7), secure).unwrap()
    }

    /// Turn a Set-Cookie value into the Cookie header a browser would send back
    fn request_headers(set_cookie: &str) -> HeaderMap {
        let pair = set_cookie.split(';').next().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        headers
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; session=abc123; theme=dark"),
        );

        assert_eq!(get_cookie(&headers, "session"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_get_cookie_no_header() {
        let headers = HeaderMap::new();
        assert_eq!(get_cookie(&headers, "session"), None);
    }

    #[test]
    fn test_attach_sets_cookie_attributes() {
        let mut headers = HeaderMap::new();
        cookies(false).attach(&mut headers, TOKEN).unwrap();

        let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with(&format!("session={}.", TOKEN)));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Max-Age=604800"));
        assert!(!set_cookie.contains("Secure"));
    }

    #[test]
    fn test_secure_flag_in_production() {
        let set_cookie = cookies(true).session_cookie(TOKEN);
        assert!(set_cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_extract_returns_attached_token() {
        let carrier = cookies(false);
        let headers = request_headers(&carrier.session_cookie(TOKEN));

        assert_eq!(carrier.extract(&headers).unwrap(), Some(TOKEN.to_string()));
    }

    #[test]
    fn test_absent_cookie_is_not_an_error() {
        let carrier = cookies(false);
        let mut headers = HeaderMap::new();
        assert_eq!(carrier.extract(&headers).unwrap(), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("other=value"));
        assert_eq!(carrier.extract(&headers).unwrap(), None);
    }

    #[test]
    fn test_cleared_cookie_reads_as_no_session() {
        let carrier = cookies(false);
        let cleared = carrier.cleared_cookie();

        assert!(cleared.starts_with("session=;"));
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert_eq!(carrier.extract(&request_headers(&cleared)).unwrap(), None);
    }

    #[test]
    fn test_clear_appends_set_cookie() {
        let mut headers = HeaderMap::new();
        cookies(true).clear(&mut headers);

        let value = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(value.contains("Max-Age=0"));
        assert!(value.contains("Secure"));
    }

    #[test]
    fn test_modified_token_in_cookie_is_tampered() {
        let carrier = cookies(false);
        let signed = carrier.session_cookie(TOKEN);
        let forged = signed.replacen("eyJzdWIiOjF9", "eyJzdWIiOjJ9", 1);

        let result = carrier.extract(&request_headers(&forged));
        assert!(matches!(result, Err(AuthError::TamperedCookie)));
    }

    #[test]
    fn test_unsigned_cookie_is_tampered() {
        let carrier = cookies(false);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("session=not-a-signed-value"),
        );
        assert!(matches!(carrier.extract(&headers), Err(AuthError::TamperedCookie)));

        // A bare JWT has dots, but its last segment is not a hex MAC
        let headers = request_headers(&format!("session={}", TOKEN));
        assert!(matches!(carrier.extract(&headers), Err(AuthError::TamperedCookie)));
    }

    #[test]
    fn test_cookie_signed_with_other_secret_is_tampered() {
        let other = SessionCookies::new(b"a_completely_different_cookie_key", Duration::days(7), false)
            .unwrap();
        let headers = request_headers(&other.session_cookie(TOKEN));

        assert!(matches!(cookies(false).extract(&headers), Err(AuthError::TamperedCookie)));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(matches!(
            SessionCookies::new(b"", Duration::days(7), false),
            Err(AuthError::ConfigError(_))
        ));
    }
}
