//! Bearer-token authentication.
//!
//! Tokens are `base64url(userId:expiresAt).base64url(hmac)` signed with the
//! configured secret. Passwords are stored as Argon2id PHC strings.

use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::errors::{codes, AppError, AppErrorWithRevision, ErrorDetails, ErrorResponse};
use crate::models::User;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Issues and verifies signed bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    fn sign(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(payload);
        Some(mac.finalize().into_bytes().to_vec())
    }

    /// Token for `user_id`, valid for the configured lifetime from `now`.
    pub fn issue(&self, user_id: &str, now: i64) -> Result<String, AppError> {
        let expires_at = now + self.ttl.as_secs() as i64;
        let payload = format!("{}:{}", user_id, expires_at);
        let signature = self
            .sign(payload.as_bytes())
            .ok_or_else(|| AppError::Internal("Failed to sign token".to_string()))?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// The user id of a valid, unexpired token.
    pub fn verify(&self, token: &str, now: i64) -> Option<String> {
        let (payload_b64, signature_b64) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;

        let expected = self.sign(&payload)?;
        if !constant_time_compare(&expected, &signature) {
            return None;
        }

        let payload = String::from_utf8(payload).ok()?;
        let (user_id, expires_at) = payload.rsplit_once(':')?;
        let expires_at: i64 = expires_at.parse().ok()?;
        if expires_at <= now || user_id.is_empty() {
            return None;
        }
        Some(user_id.to_string())
    }
}

/// Hash a password into an Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Perform constant-time byte comparison.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Authentication middleware: resolves the bearer token to a [`CurrentUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return unauthorized_response("Missing bearer token");
    };

    let Some(user_id) = state.tokens.verify(token, Utc::now().timestamp()) else {
        return unauthorized_response("Invalid or expired token");
    };

    match state.repo.get_user(&user_id).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Ok(None) => unauthorized_response("User no longer exists"),
        Err(e) => AppErrorWithRevision {
            error: e,
            revision_id: 0,
        }
        .into_response(),
    }
}

/// Only administrators may continue.
pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Administrator role required".to_string()))
    }
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
            details: None,
        },
        revision_id: 0,
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn test_token_round_trip() {
        let token = signer().issue("user-1", 1_000).unwrap();
        assert_eq!(signer().verify(&token, 1_001), Some("user-1".to_string()));
    }

    #[test]
    fn test_token_expires() {
        let token = signer().issue("user-1", 1_000).unwrap();
        assert_eq!(signer().verify(&token, 1_000 + 3600), None);
    }

    #[test]
    fn test_token_rejects_tampering() {
        let token = signer().issue("user-1", 1_000).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(b"admin-id:99999999999");
        let forged = format!("{}.{}", forged_payload, signature);
        assert_eq!(signer().verify(&forged, 1_001), None);

        let other = TokenSigner::new("other-secret", Duration::from_secs(3600));
        assert_eq!(other.verify(&token, 1_001), None);
        assert_eq!(signer().verify("garbage", 1_001), None);
    }

    #[test]
    fn test_password_hash_verifies() {
        let stored = hash_password("s3cret!").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("s3cret!", &stored));
        assert!(!verify_password("s3cret", &stored));
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plain-text"));
        assert!(!verify_password("x", "pbkdf2-sha256$0$00$00"));
        assert!(!verify_password("x", "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$bm90YWhhc2g"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"test-key-123", b"test-key-123"));
        assert!(!constant_time_compare(b"test-key-123", b"test-key-124"));
        assert!(!constant_time_compare(b"short", b"much-longer-key"));
    }

    #[test]
    fn test_require_admin() {
        let mut user = User {
            id: "u1".into(),
            job_number: "1001".into(),
            name: "Alice".into(),
            username: "Alice(1001)".into(),
            role: Role::Employee,
            avatar: None,
            skills: vec![],
        };
        assert!(matches!(require_admin(&user), Err(AppError::Forbidden(_))));
        user.role = Role::Admin;
        assert!(require_admin(&user).is_ok());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
