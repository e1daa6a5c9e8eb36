use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::{RequireAdmin, RequireOwner};
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{MedicalRecord, MessageResponse, Paginated};
use crate::routes::params::PageParams;

const RECORD_COLUMNS: &str = "record_id, patient_id, doctor_id, diagnosis, clinical_findings, \
                              treatment, allergies, medical_conditions, current_meds, \
                              created_at, updated_at";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateMedicalRecordRequest {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub diagnosis: String,
    pub clinical_findings: String,
    pub treatment: String,
    pub allergies: String,
    pub medical_conditions: String,
    #[serde(default)]
    pub current_meds: Option<serde_json::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateMedicalRecordRequest {
    pub patient_id: Option<i32>,
    pub doctor_id: Option<i32>,
    pub diagnosis: Option<String>,
    pub clinical_findings: Option<String>,
    pub treatment: Option<String>,
    pub allergies: Option<String>,
    pub medical_conditions: Option<String>,
    pub current_meds: Option<serde_json::Value>,
}

/// Get all medical records, newest first.
#[openapi(tag = "Medical Records")]
#[get("/medical-records?<page..>")]
pub async fn list_medical_records(
    _guard: RequireAdmin,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<MedicalRecord>>, ApiError> {
    let data: Vec<MedicalRecord> = sqlx::query_as(&format!(
        "SELECT {RECORD_COLUMNS} FROM medical_records \
         ORDER BY created_at DESC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medical_records")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single medical record by ID.
#[openapi(tag = "Medical Records")]
#[get("/medical-records/<id>")]
pub async fn get_medical_record(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let record: MedicalRecord = sqlx::query_as(&format!(
        "SELECT {RECORD_COLUMNS} FROM medical_records WHERE record_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Medical record #{id} not found")))?;

    Ok(Json(record))
}

/// File a new medical record for a patient visit.
#[openapi(tag = "Medical Records")]
#[post("/medical-records", data = "<payload>")]
pub async fn create_medical_record(
    _guard: RequireAdmin,
    payload: Json<CreateMedicalRecordRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let record: MedicalRecord = sqlx::query_as(&format!(
        "INSERT INTO medical_records \
            (patient_id, doctor_id, diagnosis, clinical_findings, treatment, allergies, \
             medical_conditions, current_meds) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {RECORD_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(payload.doctor_id)
    .bind(&payload.diagnosis)
    .bind(&payload.clinical_findings)
    .bind(&payload.treatment)
    .bind(&payload.allergies)
    .bind(&payload.medical_conditions)
    .bind(&payload.current_meds)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(record))
}

/// Update a medical record; absent fields are left untouched.
#[openapi(tag = "Medical Records")]
#[put("/medical-records/<id>", data = "<payload>")]
pub async fn update_medical_record(
    _guard: RequireAdmin,
    id: i32,
    payload: Json<UpdateMedicalRecordRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let record: MedicalRecord = sqlx::query_as(&format!(
        "UPDATE medical_records SET \
            patient_id = COALESCE($1, patient_id), \
            doctor_id = COALESCE($2, doctor_id), \
            diagnosis = COALESCE($3, diagnosis), \
            clinical_findings = COALESCE($4, clinical_findings), \
            treatment = COALESCE($5, treatment), \
            allergies = COALESCE($6, allergies), \
            medical_conditions = COALESCE($7, medical_conditions), \
            current_meds = COALESCE($8, current_meds), \
            updated_at = now() \
         WHERE record_id = $9 RETURNING {RECORD_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(payload.doctor_id)
    .bind(&payload.diagnosis)
    .bind(&payload.clinical_findings)
    .bind(&payload.treatment)
    .bind(&payload.allergies)
    .bind(&payload.medical_conditions)
    .bind(&payload.current_meds)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Medical record #{id} not found")))?;

    Ok(Json(record))
}

/// Permanently delete a medical record.
#[openapi(tag = "Medical Records")]
#[delete("/medical-records/<id>")]
pub async fn delete_medical_record(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM medical_records WHERE record_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Medical record #{id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Medical record deleted successfully".into(),
    }))
}
