use std::ops::DerefMut;

use chrono::NaiveDate;
use rocket::State;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::sqlx::{self, Postgres, Transaction};
use rocket_db_pools::Connection;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::RequireOwner;
use crate::auth::store::CredentialStore;
use crate::auth::{AuthResult, AuthState};
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{Doctor, MessageResponse, Paginated, StaffRole};
use crate::routes::params::PageParams;

const DOCTOR_COLUMNS: &str = "doctor_id, full_name, gender, phone, email, hire_date, \
                              staff_id, created_at, updated_at";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateDoctorRequest {
    pub full_name: String,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub hire_date: NaiveDate,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateDoctorRequest {
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
}

/// Create a doctor profile together with its login-capable staff account.
///
/// Both rows are written inside one transaction and reference each other;
/// a failure at any step leaves neither behind.
#[openapi(tag = "Doctors")]
#[post("/doctors", data = "<payload>")]
pub async fn create_doctor(
    _guard: RequireOwner,
    auth: &State<AuthState>,
    pool: &State<sqlx::PgPool>,
    payload: Json<CreateDoctorRequest>,
) -> Result<Json<Doctor>, ApiError> {
    let payload = payload.into_inner();

    if payload.gender.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.phone.trim().is_empty()
    {
        return Err(ApiError::BadRequest(
            "gender, email and phone are required".into(),
        ));
    }

    let default_hash = auth
        .password_service
        .hash_password(&auth.config.default_doctor_password)?;

    let mut tx = pool.begin().await?;

    let doctor = match create_linked_records(&mut tx, &payload, &default_hash).await {
        Ok(doctor) => doctor,
        Err(err) => {
            log::error!(
                "doctor creation for '{}' failed, rolling back: {}",
                payload.email,
                err
            );
            // Dropping the transaction rolls it back; surface the cause.
            return Err(err.into());
        }
    };

    tx.commit().await?;

    Ok(Json(doctor))
}

async fn create_linked_records(
    tx: &mut Transaction<'_, Postgres>,
    payload: &CreateDoctorRequest,
    default_password_hash: &str,
) -> AuthResult<Doctor> {
    let account = CredentialStore::insert_tx(
        tx,
        &payload.full_name,
        Some(&payload.phone),
        &payload.email,
        default_password_hash,
        StaffRole::Doctor,
        Some(payload.hire_date),
    )
    .await?;

    let doctor: Doctor = sqlx::query_as(&format!(
        "INSERT INTO doctors (full_name, gender, phone, email, hire_date, staff_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {DOCTOR_COLUMNS}"
    ))
    .bind(&payload.full_name)
    .bind(&payload.gender)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(payload.hire_date)
    .bind(account.staff_id)
    .fetch_one(tx.deref_mut())
    .await?;

    CredentialStore::set_doctor_link_tx(tx, account.staff_id, doctor.doctor_id).await?;

    Ok(doctor)
}

/// Get all doctors, most recently hired first.
#[openapi(tag = "Doctors")]
#[get("/doctors?<page..>")]
pub async fn list_doctors(
    _guard: RequireOwner,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<Doctor>>, ApiError> {
    let data: Vec<Doctor> = sqlx::query_as(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY hire_date DESC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doctors")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single doctor by ID.
#[openapi(tag = "Doctors")]
#[get("/doctors/<id>")]
pub async fn get_doctor(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Doctor>, ApiError> {
    let doctor: Doctor = sqlx::query_as(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors WHERE doctor_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Doctor #{id} not found")))?;

    Ok(Json(doctor))
}

/// Update a doctor profile; absent fields are left untouched.
#[openapi(tag = "Doctors")]
#[put("/doctors/<id>", data = "<payload>")]
pub async fn update_doctor(
    _guard: RequireOwner,
    id: i32,
    payload: Json<UpdateDoctorRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Doctor>, ApiError> {
    let doctor: Doctor = sqlx::query_as(&format!(
        "UPDATE doctors SET \
            full_name = COALESCE($1, full_name), \
            gender = COALESCE($2, gender), \
            phone = COALESCE($3, phone), \
            email = COALESCE($4, email), \
            hire_date = COALESCE($5, hire_date), \
            updated_at = now() \
         WHERE doctor_id = $6 RETURNING {DOCTOR_COLUMNS}"
    ))
    .bind(&payload.full_name)
    .bind(&payload.gender)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(payload.hire_date)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Doctor #{id} not found")))?;

    Ok(Json(doctor))
}

/// Permanently delete a doctor profile. The linked staff account survives
/// with its doctor reference cleared.
#[openapi(tag = "Doctors")]
#[delete("/doctors/<id>")]
pub async fn delete_doctor(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM doctors WHERE doctor_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Doctor #{id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Doctor deleted successfully".into(),
    }))
}
