use bcrypt::{hash, verify, DEFAULT_COST};

use super::AuthError;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash(password, DEFAULT_COST).map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
}

/// Compare a plaintext password with a stored bcrypt hash. A malformed hash never matches.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match verify(password, password_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Stored password hash could not be parsed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password("correct horse").unwrap();
        assert!(hashed.starts_with("$2"));
        assert!(verify_password("correct horse", &hashed));
        assert!(!verify_password("battery staple", &hashed));
    }

    #[test]
    fn malformed_hash_does_not_match() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }
}
