//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies or bearer headers.
//! No server-side session storage needed. Password hashing uses a
//! salted, iterated SHA-256 digest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const PASSWORD_HASH_VERSION: &str = "v1";
const PASSWORD_HASH_ITERATIONS: u32 = 100_000;

/// User session data
///
/// Stored in a signed token. Contains minimal user info; anything
/// revocable (admin flag) is re-checked against the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// User ID
    pub user_id: String,
    /// Username at login time
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
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

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
        .map_err(|_| crate::error::AppError::Unauthorized)?;

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

fn digest_password(salt: &[u8], password: &str) -> Vec<u8> {
    use sha2::{Digest, Sha256};

    let mut digest = {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize()
    };
    for _ in 1..PASSWORD_HASH_ITERATIONS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        digest = hasher.finalize();
    }
    digest.to_vec()
}

/// Hash a password with a fresh random salt
///
/// Format: `v1$<salt_b64>$<digest_b64>`
pub fn hash_password(password: &str) -> String {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use rand::RngCore;

    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = digest_password(&salt, password);

    format!(
        "{}${}${}",
        PASSWORD_HASH_VERSION,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest)
    )
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, stored: &str) -> bool {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    let mut parts = stored.split('$');
    let (Some(version), Some(salt_b64), Some(digest_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if version != PASSWORD_HASH_VERSION {
        return false;
    }

    let Ok(salt) = URL_SAFE_NO_PAD.decode(salt_b64) else {
        return false;
    };
    let Ok(expected) = URL_SAFE_NO_PAD.decode(digest_b64) else {
        return false;
    };

    let actual = digest_password(&salt, password);

    // Constant-time comparison
    use hmac::Mac;
    use sha2::Sha256;
    type HmacSha256 = hmac::Hmac<Sha256>;
    let Ok(mut mac) = HmacSha256::new_from_slice(&salt) else {
        return false;
    };
    mac.update(&actual);
    let actual_mac = mac.finalize().into_bytes();
    let Ok(mut mac) = HmacSha256::new_from_slice(&salt) else {
        return false;
    };
    mac.update(&expected);
    let expected_mac = mac.finalize().into_bytes();

    actual_mac == expected_mac
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session() -> Session {
        Session {
            user_id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            username: "alice".to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[test]
    fn token_round_trips() {
        let secret = "x".repeat(32);
        let token = create_session_token(&session(), &secret).unwrap();
        let decoded = verify_session_token(&token, &secret).unwrap();
        assert_eq!(decoded.username, "alice");
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = create_session_token(&session(), &"x".repeat(32)).unwrap();
        assert!(verify_session_token(&token, &"y".repeat(32)).is_err());
    }

    #[test]
    fn token_rejects_expired_session() {
        let secret = "x".repeat(32);
        let mut expired = session();
        expired.expires_at = Utc::now() - Duration::hours(1);
        let token = create_session_token(&expired, &secret).unwrap();
        assert!(verify_session_token(&token, &secret).is_err());
    }

    #[test]
    fn password_hash_round_trips() {
        let stored = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &stored));
        assert!(!verify_password("wrong password", &stored));
    }

    #[test]
    fn password_hashes_are_salted() {
        let first = hash_password("same password");
        let second = hash_password("same password");
        assert_ne!(first, second);
    }

    #[test]
    fn verify_password_rejects_malformed_hashes() {
        assert!(!verify_password("password", "not-a-hash"));
        assert!(!verify_password("password", "v2$abc$def"));
    }
}
