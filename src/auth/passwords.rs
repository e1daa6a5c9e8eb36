use crate::auth::{AuthError, AuthResult};

/// bcrypt work factor; each increment doubles the hashing cost.
const BCRYPT_COST: u32 = 12;

#[derive(Clone)]
pub struct PasswordService {
    cost: u32,
}

impl PasswordService {
    pub fn new() -> Self {
        Self { cost: BCRYPT_COST }
    }

    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        bcrypt::hash(password, self.cost).map_err(AuthError::from)
    }

    pub fn verify_password(&self, password: &str, encoded: &str) -> AuthResult<bool> {
        bcrypt::verify(password, encoded).map_err(AuthError::from)
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies_passwords() {
        let service = PasswordService::new();
        let hash = service
            .hash_password("super-secret")
            .expect("hash generation");
        assert_ne!(hash, "super-secret");
        assert!(
            service
                .verify_password("super-secret", &hash)
                .expect("verify succeeds")
        );
        assert!(
            !service
                .verify_password("wrong-password", &hash)
                .expect("verify runs")
        );
    }

    #[test]
    fn rejects_malformed_hashes() {
        let service = PasswordService::new();
        assert!(service.verify_password("anything", "not-a-hash").is_err());
    }
}
