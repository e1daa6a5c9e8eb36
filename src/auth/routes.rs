use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, patch, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;

use crate::auth::guards::{AuthUser, RequireOwner};
use crate::auth::responses::{
    AdminResetPasswordRequest, AuthTokenResponse, ChangePasswordRequest, LoginRequest,
    RegisterRequest,
};
use crate::auth::store::{NewStaffAccount, normalize_email};
use crate::auth::{AuthError, AuthState};
use crate::models::{MessageResponse, StaffProfile};

type AuthRouteResult<T> = Result<Json<T>, status::Custom<Json<AuthErrorResponse>>>;

#[derive(Debug, serde::Serialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub status: u16,
    pub message: String,
}

/// Register a staff account and return the identity plus a bearer token.
#[openapi(tag = "Auth")]
#[post("/auth/register", data = "<payload>")]
pub async fn register(
    state: &State<AuthState>,
    payload: Json<RegisterRequest>,
) -> Result<status::Created<Json<AuthTokenResponse>>, status::Custom<Json<AuthErrorResponse>>> {
    let payload = payload.into_inner();
    validate_registration(&payload).map_err(respond_error)?;

    let account = state
        .credential_store
        .create(
            &state.password_service,
            NewStaffAccount {
                full_name: payload.full_name,
                phone: payload.phone,
                email: payload.email,
                password: payload.password,
                role: payload.role,
                hire_date: payload.hire_date,
            },
        )
        .await
        .map_err(respond_error)?;

    let token = state
        .jwt_service
        .issue(account.staff_id, &account.email, account.role())
        .map_err(respond_error)?;

    let profile = StaffProfile::from(account);
    let location = format!("/api/v1/staff/{}", profile.staff_id);

    Ok(status::Created::new(location).body(Json(AuthTokenResponse {
        user: profile,
        access_token: token.token,
        access_token_expires_at: token.expires_at,
    })))
}

/// Verify credentials and mint a bearer token.
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<AuthTokenResponse> {
    let email = normalize_email(&payload.email);
    let password = payload.password.trim();

    if email.is_empty() || password.is_empty() {
        return Err(respond_message(
            Status::BadRequest,
            "Email and password are required",
        ));
    }

    // One message for both unknown email and bad password; nothing to
    // enumerate accounts with.
    let account = state
        .credential_store
        .find_by_email(&email)
        .await
        .map_err(respond_error)?
        .ok_or_else(|| respond_error(AuthError::InvalidCredentials))?;

    let verified = state
        .password_service
        .verify_password(password, &account.password_hash)
        .map_err(respond_error)?;

    if !verified {
        return Err(respond_error(AuthError::InvalidCredentials));
    }

    let token = state
        .jwt_service
        .issue(account.staff_id, &account.email, account.role())
        .map_err(respond_error)?;

    Ok(Json(AuthTokenResponse {
        user: StaffProfile::from(account),
        access_token: token.token,
        access_token_expires_at: token.expires_at,
    }))
}

/// Change the caller's own password after verifying the current one.
#[openapi(tag = "Auth")]
#[patch("/auth/change-password", data = "<payload>")]
pub async fn change_password(
    state: &State<AuthState>,
    user: AuthUser,
    payload: Json<ChangePasswordRequest>,
) -> AuthRouteResult<MessageResponse> {
    if payload.new_password.len() < 6 {
        return Err(respond_error(AuthError::Validation(
            "New password must be at least 6 characters".into(),
        )));
    }

    let account = state
        .credential_store
        .find_by_id(user.id)
        .await
        .map_err(respond_error)?
        .ok_or_else(|| respond_error(AuthError::Unauthorized))?;

    let current_ok = state
        .password_service
        .verify_password(&payload.current_password, &account.password_hash)
        .map_err(respond_error)?;

    if !current_ok {
        return Err(respond_error(AuthError::WrongCurrentPassword));
    }

    let new_hash = state
        .password_service
        .hash_password(&payload.new_password)
        .map_err(respond_error)?;

    state
        .credential_store
        .update_password(account.staff_id, &new_hash)
        .await
        .map_err(respond_error)?;

    Ok(Json(MessageResponse {
        message: "Password changed successfully".into(),
    }))
}

/// Overwrite an account's password without the current one. Owner-gated
/// recovery path for lost passwords.
#[openapi(tag = "Auth")]
#[post("/auth/admin/reset-password", data = "<payload>")]
pub async fn admin_reset_password(
    state: &State<AuthState>,
    _owner: RequireOwner,
    payload: Json<AdminResetPasswordRequest>,
) -> AuthRouteResult<MessageResponse> {
    if payload.new_password.len() < 6 {
        return Err(respond_error(AuthError::Validation(
            "New password must be at least 6 characters".into(),
        )));
    }

    let account = state
        .credential_store
        .find_by_email(&payload.email)
        .await
        .map_err(respond_error)?
        .ok_or_else(|| respond_error(AuthError::UserNotFound))?;

    let new_hash = state
        .password_service
        .hash_password(&payload.new_password)
        .map_err(respond_error)?;

    state
        .credential_store
        .update_password(account.staff_id, &new_hash)
        .await
        .map_err(respond_error)?;

    Ok(Json(MessageResponse {
        message: "Password reset successfully".into(),
    }))
}

fn validate_registration(payload: &RegisterRequest) -> Result<(), AuthError> {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation("A valid email is required".into()));
    }
    if payload.password.len() < 6 {
        return Err(AuthError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }
    if payload.full_name.trim().len() < 2 {
        return Err(AuthError::Validation(
            "Full name must be at least 2 characters".into(),
        ));
    }
    Ok(())
}

fn respond_error(err: AuthError) -> status::Custom<Json<AuthErrorResponse>> {
    let status = err.status();
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: err.to_string(),
        }),
    )
}

fn respond_message(
    status: Status,
    message: impl Into<String>,
) -> status::Custom<Json<AuthErrorResponse>> {
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: message.into(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_payload() -> RegisterRequest {
        RegisterRequest {
            email: "nurse@clinic.test".into(),
            password: "secret1".into(),
            full_name: "Nadia Osman".into(),
            phone: None,
            hire_date: None,
            role: None,
        }
    }

    #[test]
    fn registration_validation_covers_each_field() {
        assert!(validate_registration(&base_payload()).is_ok());

        let mut bad_email = base_payload();
        bad_email.email = "not-an-email".into();
        assert!(validate_registration(&bad_email).is_err());

        let mut short_password = base_payload();
        short_password.password = "abc".into();
        assert!(validate_registration(&short_password).is_err());

        let mut short_name = base_payload();
        short_name.full_name = "x".into();
        assert!(validate_registration(&short_name).is_err());
    }
}
