use rocket::http::Status;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Current password is incorrect")]
    WrongCurrentPassword,
    #[error("User with this email already exists")]
    EmailExists,
    #[error("User not found")]
    UserNotFound,
    #[error("token expired")]
    TokenExpired,
    #[error("token invalid")]
    TokenInvalid,
    #[error("unauthorized")]
    Unauthorized,
    #[error("You do not have permission")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] rocket_db_pools::sqlx::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::InvalidCredentials => Status::Unauthorized,
            AuthError::WrongCurrentPassword => Status::BadRequest,
            AuthError::EmailExists => Status::Conflict,
            AuthError::UserNotFound => Status::NotFound,
            AuthError::TokenExpired | AuthError::TokenInvalid => Status::Unauthorized,
            AuthError::Unauthorized => Status::Unauthorized,
            AuthError::Forbidden => Status::Forbidden,
            AuthError::Validation(_) => Status::BadRequest,
            AuthError::Config(_) => Status::InternalServerError,
            AuthError::Sqlx(_) | AuthError::PasswordHash(_) => Status::InternalServerError,
            AuthError::Jwt(_) => Status::Unauthorized,
        }
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}
