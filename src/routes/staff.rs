use chrono::NaiveDate;
use rocket::State;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::RequireOwner;
use crate::auth::store::{NewStaffAccount, StaffUpdate};
use crate::auth::AuthState;
use crate::error::ApiError;
use crate::models::{MessageResponse, Paginated, StaffProfile, StaffRole};
use crate::routes::params::PageParams;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateStaffRequest {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<StaffRole>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateStaffRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<StaffRole>,
    pub hire_date: Option<NaiveDate>,
}

/// Get all staff accounts.
#[openapi(tag = "Staff")]
#[get("/staff?<page..>")]
pub async fn list_staff(
    _guard: RequireOwner,
    page: PageParams,
    auth: &State<AuthState>,
) -> Result<Json<Paginated<StaffProfile>>, ApiError> {
    let (accounts, count) = auth
        .credential_store
        .list(page.offset(), page.limit())
        .await?;

    let data = accounts.into_iter().map(StaffProfile::from).collect();

    Ok(Json(Paginated { data, count }))
}

/// Get a single staff account by ID.
#[openapi(tag = "Staff")]
#[get("/staff/<id>")]
pub async fn get_staff(
    _guard: RequireOwner,
    id: i32,
    auth: &State<AuthState>,
) -> Result<Json<StaffProfile>, ApiError> {
    let account = auth
        .credential_store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Staff #{id} not found")))?;

    Ok(Json(StaffProfile::from(account)))
}

/// Create a staff account. The password is hashed before it is stored.
#[openapi(tag = "Staff")]
#[post("/staff", data = "<payload>")]
pub async fn create_staff(
    _guard: RequireOwner,
    payload: Json<CreateStaffRequest>,
    auth: &State<AuthState>,
) -> Result<Json<StaffProfile>, ApiError> {
    let payload = payload.into_inner();

    if payload.password.len() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let account = auth
        .credential_store
        .create(
            &auth.password_service,
            NewStaffAccount {
                full_name: payload.full_name,
                phone: payload.phone,
                email: payload.email,
                password: payload.password,
                role: payload.role,
                hire_date: payload.hire_date,
            },
        )
        .await?;

    Ok(Json(StaffProfile::from(account)))
}

/// Update a staff account. Identity changes propagate to a linked doctor
/// profile; a supplied password is re-hashed.
#[openapi(tag = "Staff")]
#[put("/staff/<id>", data = "<payload>")]
pub async fn update_staff(
    _guard: RequireOwner,
    id: i32,
    payload: Json<UpdateStaffRequest>,
    auth: &State<AuthState>,
) -> Result<Json<StaffProfile>, ApiError> {
    let payload = payload.into_inner();

    let account = auth
        .credential_store
        .update(
            &auth.password_service,
            id,
            StaffUpdate {
                full_name: payload.full_name,
                phone: payload.phone,
                email: payload.email,
                password: payload.password,
                role: payload.role,
                hire_date: payload.hire_date,
            },
        )
        .await?;

    Ok(Json(StaffProfile::from(account)))
}

/// Permanently delete a staff account.
#[openapi(tag = "Staff")]
#[delete("/staff/<id>")]
pub async fn delete_staff(
    _guard: RequireOwner,
    id: i32,
    auth: &State<AuthState>,
) -> Result<Json<MessageResponse>, ApiError> {
    auth.credential_store.remove(id).await?;

    Ok(Json(MessageResponse {
        message: "Staff deleted successfully".into(),
    }))
}
