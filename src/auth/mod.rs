use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::types::MerchantId;

pub mod guard;
pub mod password;

pub use guard::{authorize, AdminContext, RouteAccess};

const BEARER_PREFIX: &str = "Bearer ";

/// Administrator roles. Adding a role is a compile-time change at every match site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            _ => Err(AuthError::InsufficientRole),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication and authorization failures detected before a handler runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingCredential,

    #[error("Invalid token")]
    InvalidCredential,

    #[error("Token expired")]
    ExpiredCredential,

    #[error("Admin access required")]
    InsufficientRole,

    #[error("Super admin access required")]
    SuperAdminRequired,

    #[error("Admin account is not assigned to a merchant")]
    MerchantBindingMissing,

    #[error("Admin account does not belong to this merchant")]
    TenantMismatch,

    #[error("Authentication error: {0}")]
    Internal(String),
}

/// JWT payload. Field names match the tokens issued by `/admin/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "merchantId", default)]
    pub merchant_id: Option<MerchantId>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        id: i32,
        email: impl Into<String>,
        role: Role,
        merchant_id: Option<MerchantId>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: email.into(),
            role: Some(role.as_str().to_string()),
            merchant_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Identity decoded from a verified token. `role` is `None` when the token
/// carries no role or one outside the known set; the guard rejects those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i32,
    pub email: String,
    pub role: Option<Role>,
    pub merchant_id: Option<MerchantId>,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            role: claims.role.as_deref().and_then(|r| r.parse().ok()),
            merchant_id: claims.merchant_id,
        }
    }
}

/// Signs and verifies HS256 bearer tokens with a key fixed at construction.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenVerifier {
    pub fn new(config: &SecurityConfig) -> Self {
        Self::from_secret(config.jwt_secret.as_bytes(), config.jwt_expiry_hours)
    }

    pub fn from_secret(secret: &[u8], expiry_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::hours(expiry_hours as i64),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verify the raw `Authorization` header value and return the caller's identity.
    pub fn verify(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let token = extract_bearer(header)?;
        let claims = self.decode(token)?;
        Ok(Principal::from(claims))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        match decode::<Claims>(token, &self.decoding_key, &validation(true)) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::ExpiredCredential),
                // An expired token is reported as expired whoever signed it, and with
                // whichever HMAC variant.
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    if self.is_expired_unverified(token) {
                        Err(AuthError::ExpiredCredential)
                    } else {
                        Err(AuthError::InvalidCredential)
                    }
                }
                ErrorKind::InvalidToken
                | ErrorKind::ImmatureSignature
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::InvalidSubject
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => Err(AuthError::InvalidCredential),
                _ => Err(AuthError::Internal(err.to_string())),
            },
        }
    }

    fn is_expired_unverified(&self, token: &str) -> bool {
        let mut unverified = validation(false);
        unverified.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        matches!(
            decode::<Claims>(token, &self.decoding_key, &unverified),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature)
        )
    }

    /// Issue a token for a freshly authenticated administrator.
    pub fn issue(
        &self,
        id: i32,
        email: &str,
        role: Role,
        merchant_id: Option<MerchantId>,
    ) -> Result<String, AuthError> {
        self.sign(&Claims::new(id, email, role, merchant_id, self.ttl))
    }

    /// Sign arbitrary claims. Used by `issue` and by tests that need odd payloads.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("JWT generation error: {}", e)))
    }
}

fn validation(verify_signature: bool) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    if !verify_signature {
        validation.insecure_disable_signature_validation();
    }
    validation
}

fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let token = header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::MissingCredential)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> TokenVerifier {
        TokenVerifier::from_secret(b"test-secret", 24)
    }

    fn claims(role: Option<&str>, exp_offset: Duration) -> Claims {
        let now = Utc::now();
        Claims {
            id: 1,
            email: "owner@shop.test".to_string(),
            role: role.map(str::to_string),
            merchant_id: Some(7),
            exp: (now + exp_offset).timestamp(),
            iat: now.timestamp(),
        }
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[test]
    fn missing_or_malformed_header_is_missing_credential() {
        let v = verifier();
        assert_eq!(v.verify(None), Err(AuthError::MissingCredential));
        assert_eq!(v.verify(Some("")), Err(AuthError::MissingCredential));
        assert_eq!(v.verify(Some("Basic abc")), Err(AuthError::MissingCredential));
        assert_eq!(v.verify(Some("bearer abc")), Err(AuthError::MissingCredential));
        assert_eq!(v.verify(Some("Bearer   ")), Err(AuthError::MissingCredential));
    }

    #[test]
    fn valid_token_round_trips_principal() {
        let v = verifier();
        let token = v.issue(3, "a@shop.test", Role::Admin, Some(7)).unwrap();
        let principal = v.verify(Some(&bearer(&token))).unwrap();
        assert_eq!(principal.id, 3);
        assert_eq!(principal.email, "a@shop.test");
        assert_eq!(principal.role, Some(Role::Admin));
        assert_eq!(principal.merchant_id, Some(7));
    }

    #[test]
    fn wrong_key_is_invalid_credential() {
        let other = TokenVerifier::from_secret(b"someone-else", 24);
        let token = other.sign(&claims(Some("admin"), Duration::hours(1))).unwrap();
        assert_eq!(
            verifier().verify(Some(&bearer(&token))),
            Err(AuthError::InvalidCredential)
        );
    }

    #[test]
    fn garbage_token_is_invalid_credential() {
        assert_eq!(
            verifier().verify(Some("Bearer not.a.jwt")),
            Err(AuthError::InvalidCredential)
        );
        assert_eq!(
            verifier().verify(Some("Bearer abc")),
            Err(AuthError::InvalidCredential)
        );
    }

    #[test]
    fn expired_token_is_expired_regardless_of_signature() {
        let v = verifier();
        let expired = claims(Some("admin"), Duration::seconds(-10));

        let own = v.sign(&expired).unwrap();
        assert_eq!(v.verify(Some(&bearer(&own))), Err(AuthError::ExpiredCredential));

        let foreign = TokenVerifier::from_secret(b"someone-else", 24).sign(&expired).unwrap();
        assert_eq!(v.verify(Some(&bearer(&foreign))), Err(AuthError::ExpiredCredential));
    }

    #[test]
    fn other_hmac_variant_is_expired_when_stale_and_invalid_otherwise() {
        let v = verifier();
        let key = EncodingKey::from_secret(b"test-secret");
        let hs384 = |c: &Claims| encode(&Header::new(Algorithm::HS384), c, &key).unwrap();

        let stale = hs384(&claims(Some("admin"), Duration::seconds(-10)));
        assert_eq!(v.verify(Some(&bearer(&stale))), Err(AuthError::ExpiredCredential));

        let fresh = hs384(&claims(Some("admin"), Duration::hours(1)));
        assert_eq!(v.verify(Some(&bearer(&fresh))), Err(AuthError::InvalidCredential));
    }

    #[test]
    fn unknown_or_absent_role_decodes_to_none() {
        let v = verifier();
        for role in [None, Some("customer"), Some("ADMIN"), Some("")] {
            let token = v.sign(&claims(role, Duration::hours(1))).unwrap();
            let principal = v.verify(Some(&bearer(&token))).unwrap();
            assert_eq!(principal.role, None, "role {:?}", role);
        }
    }

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("super_admin".parse::<Role>(), Ok(Role::SuperAdmin));
        assert_eq!("root".parse::<Role>(), Err(AuthError::InsufficientRole));
    }
}
