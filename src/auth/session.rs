//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies or sent as Bearer tokens.
//! The token is verified statelessly; the sessions table row it names
//! is the revocation anchor for logout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User session data
///
/// Encoded into the signed token. Contains just enough identity for
/// handlers to pass into core operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// ID of the sessions table row backing this token
    pub session_id: String,
    /// Authenticated user ID
    pub user_id: String,
    /// Authenticated username
    pub username: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(
    session: &Session,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload =
        serde_json::to_string(session).map_err(|e| crate::error::AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(&signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
///
/// # Returns
/// Decoded session if valid
///
/// # Errors
/// Returns error if signature is invalid or token is malformed
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Split token into payload and signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(crate::error::AppError::Unauthorized);
    }

    let payload_b64 = parts[0];
    let signature_b64 = parts[1];

    // 2. Verify HMAC signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| crate::error::AppError::InvalidSignature)?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    let payload_str =
        String::from_utf8(payload_bytes).map_err(|_| crate::error::AppError::Unauthorized)?;

    let session: Session =
        serde_json::from_str(&payload_str).map_err(|_| crate::error::AppError::Unauthorized)?;

    // 4. Check if session is expired
    if session.is_expired() {
        return Err(crate::error::AppError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const SECRET: &str = "test-secret-key-0123456789abcdef";

    fn make_session() -> Session {
        Session {
            session_id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            user_id: "01ARZ3NDEKTSV4RRFFQ69G5FB0".to_string(),
            username: "alice".to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::days(7),
        }
    }

    #[test]
    fn token_round_trips() {
        let session = make_session();
        let token = create_session_token(&session, SECRET).unwrap();
        let verified = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(verified.session_id, session.session_id);
        assert_eq!(verified.user_id, session.user_id);
        assert_eq!(verified.username, "alice");
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let token = create_session_token(&make_session(), SECRET).unwrap();
        let error = verify_session_token(&token, "another-secret-key-9876543210zyxw").unwrap_err();
        assert!(matches!(error, AppError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let token = create_session_token(&make_session(), SECRET).unwrap();
        let (payload, signature) = token.split_once('.').unwrap();
        let mut tampered_payload = payload.to_string();
        tampered_payload.push('x');
        let tampered = format!("{}.{}", tampered_payload, signature);
        let error = verify_session_token(&tampered, SECRET).unwrap_err();
        assert!(matches!(error, AppError::InvalidSignature));
    }

    #[test]
    fn malformed_token_is_unauthorized() {
        let error = verify_session_token("not-a-token", SECRET).unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[test]
    fn expired_session_is_unauthorized() {
        let mut session = make_session();
        session.expires_at = Utc::now() - chrono::Duration::hours(1);
        let token = create_session_token(&session, SECRET).unwrap();
        let error = verify_session_token(&token, SECRET).unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }
}
