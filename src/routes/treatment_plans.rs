use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::{RequireClinician, RequireOwner};
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{MessageResponse, Paginated, TreatmentPlan, TreatmentPlanStatus};
use crate::routes::params::PageParams;

const PLAN_COLUMNS: &str = "plan_id, patient_id, doctor_id, appointment_id, diagnosis_summary, \
                            plan_details, prescription, status, created_at, updated_at";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateTreatmentPlanRequest {
    pub patient_id: i32,
    pub doctor_id: i32,
    pub appointment_id: i32,
    pub diagnosis_summary: String,
    pub plan_details: String,
    #[serde(default)]
    pub prescription: Option<Vec<u8>>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateTreatmentPlanRequest {
    pub patient_id: Option<i32>,
    pub doctor_id: Option<i32>,
    pub appointment_id: Option<i32>,
    pub diagnosis_summary: Option<String>,
    pub plan_details: Option<String>,
    pub prescription: Option<Vec<u8>>,
    pub status: Option<String>,
}

fn validated_status(raw: &str) -> Result<&str, ApiError> {
    TreatmentPlanStatus::parse(raw)
        .map(|status| status.as_str())
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "invalid treatment plan status '{raw}'; expected draft, active, completed \
                 or cancelled"
            ))
        })
}

/// Get all treatment plans, newest first.
#[openapi(tag = "Treatment Plans")]
#[get("/treatment-plans?<page..>")]
pub async fn list_treatment_plans(
    _guard: RequireClinician,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<TreatmentPlan>>, ApiError> {
    let data: Vec<TreatmentPlan> = sqlx::query_as(&format!(
        "SELECT {PLAN_COLUMNS} FROM treatment_plans ORDER BY created_at DESC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM treatment_plans")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single treatment plan by ID.
#[openapi(tag = "Treatment Plans")]
#[get("/treatment-plans/<id>")]
pub async fn get_treatment_plan(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<TreatmentPlan>, ApiError> {
    let plan: TreatmentPlan = sqlx::query_as(&format!(
        "SELECT {PLAN_COLUMNS} FROM treatment_plans WHERE plan_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Treatment plan #{id} not found")))?;

    Ok(Json(plan))
}

/// Draft a treatment plan for a patient. Status defaults to `draft`.
#[openapi(tag = "Treatment Plans")]
#[post("/treatment-plans", data = "<payload>")]
pub async fn create_treatment_plan(
    _guard: RequireClinician,
    payload: Json<CreateTreatmentPlanRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<TreatmentPlan>, ApiError> {
    let status = match payload.status.as_deref() {
        Some(raw) => validated_status(raw)?,
        None => TreatmentPlanStatus::Draft.as_str(),
    };

    let plan: TreatmentPlan = sqlx::query_as(&format!(
        "INSERT INTO treatment_plans \
            (patient_id, doctor_id, appointment_id, diagnosis_summary, plan_details, \
             prescription, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PLAN_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(payload.doctor_id)
    .bind(payload.appointment_id)
    .bind(&payload.diagnosis_summary)
    .bind(&payload.plan_details)
    .bind(&payload.prescription)
    .bind(status)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(plan))
}

/// Update a treatment plan; absent fields are left untouched.
#[openapi(tag = "Treatment Plans")]
#[put("/treatment-plans/<id>", data = "<payload>")]
pub async fn update_treatment_plan(
    _guard: RequireClinician,
    id: i32,
    payload: Json<UpdateTreatmentPlanRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<TreatmentPlan>, ApiError> {
    let status = match payload.status.as_deref() {
        Some(raw) => Some(validated_status(raw)?),
        None => None,
    };

    let plan: TreatmentPlan = sqlx::query_as(&format!(
        "UPDATE treatment_plans SET \
            patient_id = COALESCE($1, patient_id), \
            doctor_id = COALESCE($2, doctor_id), \
            appointment_id = COALESCE($3, appointment_id), \
            diagnosis_summary = COALESCE($4, diagnosis_summary), \
            plan_details = COALESCE($5, plan_details), \
            prescription = COALESCE($6, prescription), \
            status = COALESCE($7, status), \
            updated_at = now() \
         WHERE plan_id = $8 RETURNING {PLAN_COLUMNS}"
    ))
    .bind(payload.patient_id)
    .bind(payload.doctor_id)
    .bind(payload.appointment_id)
    .bind(&payload.diagnosis_summary)
    .bind(&payload.plan_details)
    .bind(&payload.prescription)
    .bind(status)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Treatment plan #{id} not found")))?;

    Ok(Json(plan))
}

/// Permanently delete a treatment plan.
#[openapi(tag = "Treatment Plans")]
#[delete("/treatment-plans/<id>")]
pub async fn delete_treatment_plan(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM treatment_plans WHERE plan_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Treatment plan #{id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Treatment plan deleted successfully".into(),
    }))
}
