//! Authentication module: configuration, credential storage, password
//! hashing, token minting, Rocket request guards, and HTTP route handlers.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod passwords;
pub mod responses;
pub mod routes;
pub mod store;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::{
    AuthUser, RequireAdmin, RequireAnyStaff, RequireClinician, RequireFrontDesk, RequireOwner,
};
pub use jwt::JwtService;
pub use passwords::PasswordService;
pub use store::CredentialStore;

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub password_service: Arc<PasswordService>,
    pub jwt_service: Arc<JwtService>,
    pub credential_store: CredentialStore,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        password_service: PasswordService,
        jwt_service: JwtService,
        credential_store: CredentialStore,
    ) -> Self {
        Self {
            config,
            password_service: Arc::new(password_service),
            jwt_service: Arc::new(jwt_service),
            credential_store,
        }
    }
}
