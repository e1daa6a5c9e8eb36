use chrono::{DateTime, Utc};
use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::{RequireClinician, RequireOwner};
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{MessageResponse, Paginated, ProcedureRecord};
use crate::routes::params::PageParams;

const PROCEDURE_COLUMNS: &str = "procedure_id, patient_id, doctor_id, appointment_id, plan_id, \
                                 procedure_name, procedure_notes, performed_at, \
                                 created_at, updated_at";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateProcedureRequest {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub appointment_id: i32,
    pub plan_id: i32,
    pub procedure_name: String,
    pub procedure_notes: String,
    pub performed_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateProcedureRequest {
    pub patient_id: Option<i32>,
    pub doctor_id: Option<i32>,
    pub appointment_id: Option<i32>,
    pub plan_id: Option<i32>,
    pub procedure_name: Option<String>,
    pub procedure_notes: Option<String>,
    pub performed_at: Option<DateTime<Utc>>,
}

/// Get all performed procedures, most recent first.
#[openapi(tag = "Procedures")]
#[get("/procedures?<page..>")]
pub async fn list_procedures(
    _guard: RequireClinician,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<ProcedureRecord>>, ApiError> {
    let data: Vec<ProcedureRecord> = sqlx::query_as(&format!(
        "SELECT {PROCEDURE_COLUMNS} FROM procedures ORDER BY performed_at DESC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM procedures")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single procedure by ID.
#[openapi(tag = "Procedures")]
#[get("/procedures/<id>")]
pub async fn get_procedure(
    _guard: RequireClinician,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<ProcedureRecord>, ApiError> {
    let procedure: ProcedureRecord = sqlx::query_as(&format!(
        "SELECT {PROCEDURE_COLUMNS} FROM procedures WHERE procedure_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Procedure #{id} not found")))?;

    Ok(Json(procedure))
}

/// Record a performed procedure against a treatment plan.
#[openapi(tag = "Procedures")]
#[post("/procedures", data = "<payload>")]
pub async fn create_procedure(
    _guard: RequireClinician,
    payload: Json<CreateProcedureRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<ProcedureRecord>, ApiError> {
    let procedure: ProcedureRecord = sqlx::query_as(&format!(
        "INSERT INTO procedures \
            (patient_id, doctor_id, appointment_id, plan_id, procedure_name, procedure_notes, \
             performed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PROCEDURE_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(payload.doctor_id)
    .bind(payload.appointment_id)
    .bind(payload.plan_id)
    .bind(&payload.procedure_name)
    .bind(&payload.procedure_notes)
    .bind(payload.performed_at)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(procedure))
}

/// Update a procedure record; absent fields are left untouched.
#[openapi(tag = "Procedures")]
#[put("/procedures/<id>", data = "<payload>")]
pub async fn update_procedure(
    _guard: RequireClinician,
    id: i32,
    payload: Json<UpdateProcedureRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<ProcedureRecord>, ApiError> {
    let procedure: ProcedureRecord = sqlx::query_as(&format!(
        "UPDATE procedures SET \
            patient_id = COALESCE($1, patient_id), \
            doctor_id = COALESCE($2, doctor_id), \
            appointment_id = COALESCE($3, appointment_id), \
            plan_id = COALESCE($4, plan_id), \
            procedure_name = COALESCE($5, procedure_name), \
            procedure_notes = COALESCE($6, procedure_notes), \
            performed_at = COALESCE($7, performed_at), \
            updated_at = now() \
         WHERE procedure_id = $8 RETURNING {PROCEDURE_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(payload.doctor_id)
    .bind(payload.appointment_id)
    .bind(payload.plan_id)
    .bind(&payload.procedure_name)
    .bind(&payload.procedure_notes)
    .bind(payload.performed_at)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Procedure #{id} not found")))?;

    Ok(Json(procedure))
}

/// Permanently delete a procedure record.
#[openapi(tag = "Procedures")]
#[delete("/procedures/<id>")]
pub async fn delete_procedure(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM procedures WHERE procedure_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Procedure #{id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Procedure deleted successfully".into(),
    }))
}
