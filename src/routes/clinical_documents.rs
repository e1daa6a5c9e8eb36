use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::{RequireAdmin, RequireOwner};
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{ClinicalDocument, MessageResponse, Paginated};
use crate::routes::params::PageParams;

const DOCUMENT_COLUMNS: &str =
    "document_id, patient_id, appointment_id, document_type, consent_version, file_path";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateClinicalDocumentRequest {
    pub patient_id: i32,
    pub appointment_id: i32,
    pub document_type: String,
    pub consent_version: String,
    pub file_path: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateClinicalDocumentRequest {
    pub patient_id: Option<i32>,
    pub appointment_id: Option<i32>,
    pub document_type: Option<String>,
    pub consent_version: Option<String>,
    pub file_path: Option<String>,
}

/// Get all clinical document records.
#[openapi(tag = "Clinical Documents")]
#[get("/clinical-documents?<page..>")]
pub async fn list_clinical_documents(
    _guard: RequireOwner,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<ClinicalDocument>>, ApiError> {
    let data: Vec<ClinicalDocument> = sqlx::query_as(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM clinical_documents \
         ORDER BY document_id DESC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clinical_documents")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single clinical document record by ID.
#[openapi(tag = "Clinical Documents")]
#[get("/clinical-documents/<id>")]
pub async fn get_clinical_document(
    _guard: RequireAdmin,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<ClinicalDocument>, ApiError> {
    let document: ClinicalDocument = sqlx::query_as(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM clinical_documents WHERE document_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Clinical document #{id} not found")))?;

    Ok(Json(document))
}

/// Create a clinical document record pointing at an already-stored file.
/// New content goes through `/clinical-documents/upload` instead.
#[openapi(tag = "Clinical Documents")]
#[post("/clinical-documents", data = "<payload>")]
pub async fn create_clinical_document(
    _guard: RequireOwner,
    payload: Json<CreateClinicalDocumentRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<ClinicalDocument>, ApiError> {
    let document: ClinicalDocument = sqlx::query_as(&format!(
        "INSERT INTO clinical_documents \
            (patient_id, appointment_id, document_type, consent_version, file_path) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(payload.appointment_id)
    .bind(&payload.document_type)
    .bind(&payload.consent_version)
    .bind(&payload.file_path)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(document))
}

/// Update a clinical document record; absent fields are left untouched.
#[openapi(tag = "Clinical Documents")]
#[put("/clinical-documents/<id>", data = "<payload>")]
pub async fn update_clinical_document(
    _guard: RequireOwner,
    id: i32,
    payload: Json<UpdateClinicalDocumentRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<ClinicalDocument>, ApiError> {
    let document: ClinicalDocument = sqlx::query_as(&format!(
        "UPDATE clinical_documents SET \
            patient_id = COALESCE($1, patient_id), \
            appointment_id = COALESCE($2, appointment_id), \
            document_type = COALESCE($3, document_type), \
            consent_version = COALESCE($4, consent_version), \
            file_path = COALESCE($5, file_path) \
         WHERE document_id = $6 RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(payload.appointment_id)
    .bind(&payload.document_type)
    .bind(&payload.consent_version)
    .bind(&payload.file_path)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Clinical document #{id} not found")))?;

    Ok(Json(document))
}

/// Delete a clinical document record. The stored file is left in place.
#[openapi(tag = "Clinical Documents")]
#[delete("/clinical-documents/<id>")]
pub async fn delete_clinical_document(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM clinical_documents WHERE document_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!(
            "Clinical document #{id} not found"
        )));
    }

    Ok(Json(MessageResponse {
        message: "Clinical document deleted successfully".into(),
    }))
}
