// JWT token generation and validation service

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    crypto, decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{error::AuthError, models::Role};

/// Default token lifetime: 7 days
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 604_800;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // user_id
    pub role: Role,
    pub iat: i64, // issued at timestamp
    pub exp: i64, // expiration timestamp
}

impl Claims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Why a token was rejected. Callers treat every kind as "unauthenticated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("signature does not match")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token cannot be decoded")]
    Malformed,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::Expired => AuthError::Expired,
            TokenError::Malformed => AuthError::Malformed,
        }
    }
}

/// Token service for JWT operations
///
/// Tokens are HS256-signed and self-contained: any process holding the same
/// secret can verify them without a session lookup.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// Create a new TokenService with secret key and token lifetime
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for the configured lifetime
    pub fn issue(&self, user_id: i32, role: Role) -> Result<IssuedToken, AuthError> {
        self.issue_with_ttl(user_id, role, self.ttl)
    }

    /// Issue a token that expires `ttl` after now
    pub fn issue_with_ttl(
        &self,
        user_id: i32,
        role: Role,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::TokenGenerationError("token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a token's signature and expiry and return its claims
    ///
    /// The signature is checked over the raw `header.payload` bytes before
    /// either segment is decoded, so a changed byte anywhere in the token and
    /// a forged expired token both report `InvalidSignature`. A token is
    /// expired once `now >= exp`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed);
        }
        let (message, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;

        // A signature that is not valid base64 is still a signature mismatch
        match crypto::verify(signature, message.as_bytes(), &self.decoding_key, Algorithm::HS256) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Err(TokenError::InvalidSignature),
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if Utc::now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &[u8] = b"test_secret_key_for_testing_purposes";

    // Helper to create a test token service
    fn test_token_service() -> TokenService {
        TokenService::new(SECRET, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    fn encode_raw(claims: &Claims, alg: Algorithm, secret: &[u8]) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    /// Swap the base64url character at `index` for a different one
    fn tamper_at(token: &str, index: usize) -> String {
        let mut bytes = token.as_bytes().to_vec();
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    /// Swap one base64url character inside the payload segment
    fn tamper_payload(token: &str, offset: usize) -> String {
        let header_len = token.find('.').unwrap() + 1;
        let payload_len = token[header_len..].find('.').unwrap();
        tamper_at(token, header_len + offset % payload_len)
    }

    /// Byte positions of a token that are not segment separators
    fn non_dot_positions(token: &str) -> Vec<usize> {
        token
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b != b'.')
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_default_ttl_is_seven_days() {
        let service = test_token_service();
        let issued = service.issue(1, Role::User).unwrap();

        assert_eq!(issued.claims.exp - issued.claims.iat, 604_800);
        assert_eq!(service.ttl(), Duration::days(7));
    }

    #[test]
    fn test_out_of_range_ttl_is_a_generation_error() {
        let service = TokenService::new(SECRET, Duration::seconds(1_000_000_000_000_000));

        assert!(matches!(
            service.issue(1, Role::User),
            Err(AuthError::TokenGenerationError(_))
        ));
        assert!(matches!(
            test_token_service().issue_with_ttl(1, Role::User, Duration::milliseconds(i64::MAX)),
            Err(AuthError::TokenGenerationError(_))
        ));
    }

    #[test]
    fn test_issued_token_verifies_immediately() {
        let service = test_token_service();
        let issued = service.issue(42, Role::Admin).unwrap();
        let claims = service.verify(&issued.token).unwrap();

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.expires_at() > claims.issued_at());
    }

    #[test]
    fn test_custom_ttl() {
        let service = test_token_service();
        let issued = service.issue_with_ttl(3, Role::User, Duration::minutes(15)).unwrap();

        assert_eq!(issued.claims.exp - issued.claims.iat, 900);
        assert!(service.verify(&issued.token).is_ok());
    }

    #[test]
    fn test_token_is_expired_once_now_reaches_exp() {
        let service = test_token_service();
        let issued = service.issue_with_ttl(1, Role::User, Duration::zero()).unwrap();

        assert_eq!(service.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            role: Role::User,
            iat: now - 1000,
            exp: now - 500,
        };
        let token = encode_raw(&claims, Algorithm::HS256, SECRET);

        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            role: Role::User,
            iat: now - 1000,
            exp: now - 500,
        };
        let token = encode_raw(&claims, Algorithm::HS256, b"some_other_secret_entirely_here!");

        assert_eq!(service.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_token_signature_verification() {
        let service1 = TokenService::new(b"secret1", Duration::hours(1));
        let service2 = TokenService::new(b"secret2", Duration::hours(1));

        let token = service1.issue(1, Role::User).unwrap().token;

        assert!(service1.verify(&token).is_ok());
        assert_eq!(service2.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload_is_invalid_signature() {
        let service = test_token_service();
        let token = service.issue(7, Role::User).unwrap().token;

        let tampered = tamper_payload(&token, 5);
        assert_ne!(tampered, token);
        assert_eq!(service.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_every_tampered_byte_is_invalid_signature() {
        let service = test_token_service();
        let token = service.issue(7, Role::Admin).unwrap().token;

        for index in non_dot_positions(&token) {
            let tampered = tamper_at(&token, index);
            assert_eq!(
                service.verify(&tampered),
                Err(TokenError::InvalidSignature),
                "byte {index} of {token}"
            );
        }
    }

    #[test]
    fn test_tampered_header_is_invalid_signature() {
        let service = test_token_service();
        let token = service.issue(7, Role::User).unwrap().token;

        let tampered = tamper_at(&token, 3);
        assert_eq!(service.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_role_escalation_by_reencoding_payload_fails() {
        let service = test_token_service();
        let token = service.issue(7, Role::User).unwrap().token;
        let forged_payload = encode_raw(
            &Claims {
                sub: 7,
                role: Role::Admin,
                iat: Utc::now().timestamp(),
                exp: Utc::now().timestamp() + 3600,
            },
            Algorithm::HS256,
            b"attacker",
        );

        // Original header and signature around a forged admin payload
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged_payload.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(service.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let service = test_token_service();

        assert_eq!(service.verify(""), Err(TokenError::Malformed));
        assert_eq!(service.verify("invalid_token_format"), Err(TokenError::Malformed));
        assert_eq!(service.verify("one.two"), Err(TokenError::Malformed));
        assert_eq!(service.verify("a.b.c.d"), Err(TokenError::Malformed));
        // Three segments but no valid signature
        assert_eq!(service.verify("not.a.token"), Err(TokenError::InvalidSignature));
        // Well-formed HS256 header, garbage payload and signature
        assert!(service
            .verify("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.invalid.signature")
            .is_err());
    }

    #[test]
    fn test_other_algorithms_are_rejected() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            role: Role::Admin,
            iat: now,
            exp: now + 3600,
        };
        let token = encode_raw(&claims, Algorithm::HS512, SECRET);

        assert_eq!(service.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_unknown_role_claim_is_malformed() {
        #[derive(Serialize)]
        struct LooseClaims<'a> {
            sub: i32,
            role: &'a str,
            iat: i64,
            exp: i64,
        }

        let service = test_token_service();
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &LooseClaims {
                sub: 1,
                role: "superuser",
                iat: now,
                exp: now + 3600,
            },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(service.verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_token_errors_map_to_auth_errors() {
        assert!(matches!(AuthError::from(TokenError::Expired), AuthError::Expired));
        assert!(matches!(
            AuthError::from(TokenError::InvalidSignature),
            AuthError::InvalidSignature
        ));
        assert!(matches!(AuthError::from(TokenError::Malformed), AuthError::Malformed));
    }

    proptest! {
        #[test]
        fn prop_claims_survive_issue_and_verify(
            user_id in 1i32..1_000_000,
            admin in any::<bool>(),
            ttl_secs in 60i64..2_592_000,
        ) {
            let service = test_token_service();
            let role = if admin { Role::Admin } else { Role::User };
            let issued = service.issue_with_ttl(user_id, role, Duration::seconds(ttl_secs))?;
            let claims = service.verify(&issued.token)?;

            prop_assert_eq!(claims.sub, user_id);
            prop_assert_eq!(claims.role, role);
            prop_assert_eq!(claims.exp - claims.iat, ttl_secs);
        }

        #[test]
        fn prop_tampered_payload_never_verifies(offset in 0usize..512) {
            let service = test_token_service();
            let token = service.issue(99, Role::User)?.token;
            let tampered = tamper_payload(&token, offset);

            prop_assert_eq!(service.verify(&tampered), Err(TokenError::InvalidSignature));
        }

        #[test]
        fn prop_tampered_byte_anywhere_never_verifies(pick in any::<prop::sample::Index>()) {
            let service = test_token_service();
            let token = service.issue(99, Role::Admin)?.token;
            let positions = non_dot_positions(&token);
            let tampered = tamper_at(&token, positions[pick.index(positions.len())]);

            prop_assert_eq!(service.verify(&tampered), Err(TokenError::InvalidSignature));
        }

        #[test]
        fn prop_random_strings_are_rejected(garbage in "[a-zA-Z0-9._-]{0,80}") {
            let service = test_token_service();
            prop_assert!(service.verify(&garbage).is_err());
        }
    }
}
