use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::auth::{AuthConfig, AuthResult};
use crate::models::StaffRole;

/// Claim set embedded in every access token: subject staff id, email, role.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub email: String,
    pub role: String,
}

impl AccessTokenClaims {
    pub fn role(&self) -> StaffRole {
        StaffRole::from_str(&self.role)
    }
}

#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    token_ttl: Duration,
}

impl JwtService {
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret_bytes = config.jwt_secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret_bytes);
        let decoding_key = DecodingKey::from_secret(secret_bytes);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.clone()]);
        validation.leeway = 30;

        Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.issuer.clone(),
            token_ttl: Duration::seconds(config.token_ttl_secs),
        }
    }

    pub fn issue(
        &self,
        staff_id: i32,
        email: &str,
        role: StaffRole,
    ) -> AuthResult<SignedAccessToken> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let claims = AccessTokenClaims {
            sub: staff_id.to_string(),
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            email: email.to_string(),
            role: role.as_str().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(SignedAccessToken { token, expires_at })
    }

    pub fn decode(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data =
            decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_config(ttl_secs: i64) -> AuthConfig {
        AuthConfig {
            issuer: "clinic-api-test".into(),
            token_ttl_secs: ttl_secs,
            jwt_secret: "super-secret-test-key".into(),
            default_doctor_password: "changeme-clinic".into(),
        }
    }

    #[test]
    fn issues_and_decodes_access_tokens() {
        let service = JwtService::from_config(&make_test_config(900));

        let token = service
            .issue(42, "user@clinic.test", StaffRole::Admin)
            .expect("issue token");

        let claims = service.decode(&token.token).expect("decode token");

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "user@clinic.test");
        assert_eq!(claims.role(), StaffRole::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_expired_tokens() {
        // TTL far enough in the past to clear the 30s decode leeway.
        let service = JwtService::from_config(&make_test_config(-120));

        let token = service
            .issue(7, "user@clinic.test", StaffRole::Staff)
            .expect("issue token");

        assert!(service.decode(&token.token).is_err());
    }

    #[test]
    fn rejects_tokens_signed_with_a_different_key() {
        let service = JwtService::from_config(&make_test_config(900));
        let mut other_config = make_test_config(900);
        other_config.jwt_secret = "a-rotated-signing-key".into();
        let other = JwtService::from_config(&other_config);

        let token = service
            .issue(7, "user@clinic.test", StaffRole::Owner)
            .expect("issue token");

        assert!(other.decode(&token.token).is_err());
    }
}
