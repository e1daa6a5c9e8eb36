use std::marker::PhantomData;

use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{
    Object, SecurityRequirement, SecurityScheme, SecuritySchemeData,
};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};

use crate::auth::{AuthError, AuthResult, AuthState};
use crate::models::StaffRole;

/// Caller identity attached to a request after bearer-token validation.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub role: StaffRole,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_user(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

/// Declarative role allowlist attached to an endpoint through its guard type.
pub trait RolePolicy: Send + Sync {
    const ALLOWED: &'static [StaffRole];
}

pub struct OwnerOnly;
impl RolePolicy for OwnerOnly {
    const ALLOWED: &'static [StaffRole] = &[StaffRole::Owner];
}

pub struct AdminAccess;
impl RolePolicy for AdminAccess {
    const ALLOWED: &'static [StaffRole] = &[StaffRole::Admin, StaffRole::Owner];
}

pub struct ClinicianAccess;
impl RolePolicy for ClinicianAccess {
    const ALLOWED: &'static [StaffRole] = &[StaffRole::Doctor, StaffRole::Owner];
}

pub struct FrontDeskAccess;
impl RolePolicy for FrontDeskAccess {
    const ALLOWED: &'static [StaffRole] =
        &[StaffRole::Staff, StaffRole::Admin, StaffRole::Owner];
}

pub struct AnyStaffAccess;
impl RolePolicy for AnyStaffAccess {
    const ALLOWED: &'static [StaffRole] = &[
        StaffRole::Staff,
        StaffRole::Doctor,
        StaffRole::Admin,
        StaffRole::Owner,
    ];
}

/// Request guard enforcing a [`RolePolicy`]: 401 without a valid identity,
/// 403 when the identity's role is outside the allowlist.
pub struct RoleGuard<P: RolePolicy>(pub AuthUser, PhantomData<P>);

pub type RequireOwner = RoleGuard<OwnerOnly>;
pub type RequireAdmin = RoleGuard<AdminAccess>;
pub type RequireClinician = RoleGuard<ClinicianAccess>;
pub type RequireFrontDesk = RoleGuard<FrontDeskAccess>;
pub type RequireAnyStaff = RoleGuard<AnyStaffAccess>;

impl<P: RolePolicy> RoleGuard<P> {
    pub fn user(&self) -> &AuthUser {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, P: RolePolicy> FromRequest<'r> for RoleGuard<P> {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => {
                if P::ALLOWED.contains(&user.role) {
                    Outcome::Success(RoleGuard(user, PhantomData))
                } else {
                    Outcome::Error((Status::Forbidden, AuthError::Forbidden))
                }
            }
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => {
                Outcome::Error((Status::Unauthorized, AuthError::Unauthorized))
            }
        }
    }
}

async fn extract_user(request: &Request<'_>) -> AuthResult<AuthUser> {
    let token = bearer_token_from_request(request)?;

    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let claims = auth_state.jwt_service.decode(token)?;
    let staff_id: i32 = claims.sub.parse().map_err(|_| AuthError::Unauthorized)?;

    // The account row is authoritative for the role; a stale token cannot
    // outlive account deletion or a role change.
    let account = auth_state
        .credential_store
        .find_by_id(staff_id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    let role = account.role();

    Ok(AuthUser {
        id: account.staff_id,
        full_name: account.full_name,
        email: account.email,
        role,
    })
}

fn bearer_token_from_request<'r>(request: &'r Request<'_>) -> AuthResult<&'r str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::Unauthorized)?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token)
    } else {
        Err(AuthError::Unauthorized)
    }
}

fn bearer_security() -> rocket_okapi::Result<RequestHeaderInput> {
    let scheme = SecurityScheme {
        description: Some(
            "JWT bearer token issued by /auth/register or /auth/login.".to_owned(),
        ),
        data: SecuritySchemeData::Http {
            scheme: "bearer".to_owned(),
            bearer_format: Some("JWT".to_owned()),
        },
        extensions: Object::default(),
    };
    let mut requirement = SecurityRequirement::new();
    requirement.insert("BearerAuth".to_owned(), Vec::new());
    Ok(RequestHeaderInput::Security(
        "BearerAuth".to_owned(),
        scheme,
        requirement,
    ))
}

impl<'a> OpenApiFromRequest<'a> for AuthUser {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        bearer_security()
    }
}

impl<'a, P: RolePolicy> OpenApiFromRequest<'a> for RoleGuard<P> {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        bearer_security()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_gate_by_role() {
        assert!(OwnerOnly::ALLOWED.contains(&StaffRole::Owner));
        assert!(!OwnerOnly::ALLOWED.contains(&StaffRole::Admin));

        assert!(AdminAccess::ALLOWED.contains(&StaffRole::Owner));
        assert!(!AdminAccess::ALLOWED.contains(&StaffRole::Doctor));

        assert!(ClinicianAccess::ALLOWED.contains(&StaffRole::Doctor));
        assert!(!ClinicianAccess::ALLOWED.contains(&StaffRole::Staff));

        assert!(FrontDeskAccess::ALLOWED.contains(&StaffRole::Staff));
        assert!(!FrontDeskAccess::ALLOWED.contains(&StaffRole::Doctor));

        for role in [
            StaffRole::Staff,
            StaffRole::Doctor,
            StaffRole::Admin,
            StaffRole::Owner,
        ] {
            assert!(AnyStaffAccess::ALLOWED.contains(&role));
        }
    }
}
