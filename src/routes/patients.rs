use chrono::NaiveDate;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::{RequireAdmin, RequireFrontDesk, RequireOwner};
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{MessageResponse, Paginated, Patient};
use crate::routes::params::PageParams;

const PATIENT_COLUMNS: &str = "patient_id, full_name, gender, date_of_birth, phone, email, \
                               address, allergies_text, medical_conditions_text, \
                               created_at, updated_at";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreatePatientRequest {
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub allergies_text: Option<String>,
    #[serde(default)]
    pub medical_conditions_text: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub allergies_text: Option<String>,
    pub medical_conditions_text: Option<String>,
}

/// Get all patients, newest first.
#[openapi(tag = "Patients")]
#[get("/patients?<page..>")]
pub async fn list_patients(
    _guard: RequireAdmin,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<Patient>>, ApiError> {
    let data: Vec<Patient> = sqlx::query_as(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single patient by ID.
#[openapi(tag = "Patients")]
#[get("/patients/<id>")]
pub async fn get_patient(
    _guard: RequireFrontDesk,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Patient>, ApiError> {
    let patient: Patient = sqlx::query_as(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE patient_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Patient #{id} not found")))?;

    Ok(Json(patient))
}

/// Register a new patient.
#[openapi(tag = "Patients")]
#[post("/patients", data = "<payload>")]
pub async fn create_patient(
    _guard: RequireOwner,
    payload: Json<CreatePatientRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Patient>, ApiError> {
    let patient: Patient = sqlx::query_as(&format!(
        "INSERT INTO patients \
            (full_name, gender, date_of_birth, phone, email, address, allergies_text, \
             medical_conditions_text) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PATIENT_COLUMNS}"
    ))
    .bind(&payload.full_name)
    .bind(&payload.gender)
    .bind(payload.date_of_birth)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(&payload.address)
    .bind(&payload.allergies_text)
    .bind(&payload.medical_conditions_text)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(patient))
}

/// Update an existing patient; absent fields are left untouched.
#[openapi(tag = "Patients")]
#[put("/patients/<id>", data = "<payload>")]
pub async fn update_patient(
    _guard: RequireFrontDesk,
    id: i32,
    payload: Json<UpdatePatientRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Patient>, ApiError> {
    let patient: Patient = sqlx::query_as(&format!(
        "UPDATE patients SET \
            full_name = COALESCE($1, full_name), \
            gender = COALESCE($2, gender), \
            date_of_birth = COALESCE($3, date_of_birth), \
            phone = COALESCE($4, phone), \
            email = COALESCE($5, email), \
            address = COALESCE($6, address), \
            allergies_text = COALESCE($7, allergies_text), \
            medical_conditions_text = COALESCE($8, medical_conditions_text), \
            updated_at = now() \
         WHERE patient_id = $9 RETURNING {PATIENT_COLUMNS}"
    ))
    .bind(&payload.full_name)
    .bind(&payload.gender)
    .bind(payload.date_of_birth)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(&payload.address)
    .bind(&payload.allergies_text)
    .bind(&payload.medical_conditions_text)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Patient #{id} not found")))?;

    Ok(Json(patient))
}

/// Permanently delete a patient record.
#[openapi(tag = "Patients")]
#[delete("/patients/<id>")]
pub async fn delete_patient(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM patients WHERE patient_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Patient #{id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Patient deleted successfully".into(),
    }))
}
