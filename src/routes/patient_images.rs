use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::{RequireAdmin, RequireOwner};
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{MessageResponse, Paginated, PatientImage};
use crate::routes::params::PageParams;

const IMAGE_COLUMNS: &str = "image_id, patient_id, image_type, file_path, \
                             uploaded_by_staff_id, notes, uploaded_at";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreatePatientImageRequest {
    pub patient_id: i32,
    pub image_type: String,
    pub file_path: String,
    #[serde(default)]
    pub uploaded_by_staff_id: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdatePatientImageRequest {
    pub patient_id: Option<i32>,
    pub image_type: Option<String>,
    pub file_path: Option<String>,
    pub uploaded_by_staff_id: Option<i32>,
    pub notes: Option<String>,
}

/// Get all patient image records, newest first.
#[openapi(tag = "Patient Images")]
#[get("/patient-images?<page..>")]
pub async fn list_patient_images(
    _guard: RequireOwner,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<PatientImage>>, ApiError> {
    let data: Vec<PatientImage> = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM patient_images ORDER BY uploaded_at DESC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patient_images")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single patient image record by ID.
#[openapi(tag = "Patient Images")]
#[get("/patient-images/<id>")]
pub async fn get_patient_image(
    _guard: RequireAdmin,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<PatientImage>, ApiError> {
    let image: PatientImage = sqlx::query_as(&format!(
        "SELECT {IMAGE_COLUMNS} FROM patient_images WHERE image_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Patient image #{id} not found")))?;

    Ok(Json(image))
}

/// Create a patient image record pointing at an already-stored file.
/// New content goes through `/patient-images/upload` instead.
#[openapi(tag = "Patient Images")]
#[post("/patient-images", data = "<payload>")]
pub async fn create_patient_image(
    guard: RequireAdmin,
    payload: Json<CreatePatientImageRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<PatientImage>, ApiError> {
    let uploaded_by = payload.uploaded_by_staff_id.unwrap_or(guard.user().id);

    let image: PatientImage = sqlx::query_as(&format!(
        "INSERT INTO patient_images \
            (patient_id, image_type, file_path, uploaded_by_staff_id, notes) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {IMAGE_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(&payload.image_type)
    .bind(&payload.file_path)
    .bind(uploaded_by)
    .bind(&payload.notes)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(image))
}

/// Update a patient image record; absent fields are left untouched.
#[openapi(tag = "Patient Images")]
#[put("/patient-images/<id>", data = "<payload>")]
pub async fn update_patient_image(
    _guard: RequireAdmin,
    id: i32,
    payload: Json<UpdatePatientImageRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<PatientImage>, ApiError> {
    let image: PatientImage = sqlx::query_as(&format!(
        "UPDATE patient_images SET \
            patient_id = COALESCE($1, patient_id), \
            image_type = COALESCE($2, image_type), \
            file_path = COALESCE($3, file_path), \
            uploaded_by_staff_id = COALESCE($4, uploaded_by_staff_id), \
            notes = COALESCE($5, notes) \
         WHERE image_id = $6 RETURNING {IMAGE_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(&payload.image_type)
    .bind(&payload.file_path)
    .bind(payload.uploaded_by_staff_id)
    .bind(&payload.notes)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Patient image #{id} not found")))?;

    Ok(Json(image))
}

/// Delete a patient image record. The stored file is left in place.
#[openapi(tag = "Patient Images")]
#[delete("/patient-images/<id>")]
pub async fn delete_patient_image(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM patient_images WHERE image_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Patient image #{id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Patient image deleted successfully".into(),
    }))
}
