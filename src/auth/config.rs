/// Authentication configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub issuer: String,
    pub token_ttl_secs: i64,
    pub jwt_secret: String,
    pub default_doctor_password: String,
}

const FALLBACK_JWT_SECRET: &str = "your-super-secretkey";

impl AuthConfig {
    pub fn from_env() -> Self {
        let issuer =
            std::env::var("CLINIC_JWT_ISSUER").unwrap_or_else(|_| "clinic-api".into());
        let token_ttl_secs = std::env::var("CLINIC_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(24 * 60 * 60);
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!(
                "JWT_SECRET not set, falling back to the built-in signing key; \
                 tokens minted with it are forgeable"
            );
            FALLBACK_JWT_SECRET.into()
        });
        let default_doctor_password = std::env::var("CLINIC_DEFAULT_DOCTOR_PASSWORD")
            .unwrap_or_else(|_| "changeme-clinic".into());

        Self {
            issuer,
            token_ttl_secs,
            jwt_secret,
            default_doctor_password,
        }
    }
}
