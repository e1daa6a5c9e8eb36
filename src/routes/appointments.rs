use chrono::{DateTime, Utc};
use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::RequireFrontDesk;
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{Appointment, AppointmentStatus, MessageResponse, Paginated};
use crate::routes::params::PageParams;

const APPOINTMENT_COLUMNS: &str = "appointment_id, status, appointment_time, patient_id, \
                                   doctor_id, created_at, updated_at";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateAppointmentRequest {
    #[serde(default)]
    pub status: Option<String>,
    pub appointment_time: DateTime<Utc>,
    pub patient_id: i32,
    pub doctor_id: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateAppointmentRequest {
    pub status: Option<String>,
    pub appointment_time: Option<DateTime<Utc>>,
    pub patient_id: Option<i32>,
    pub doctor_id: Option<i32>,
}

fn validated_status(raw: &str) -> Result<&str, ApiError> {
    AppointmentStatus::parse(raw)
        .map(|status| status.as_str())
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "invalid appointment status '{raw}'; expected scheduled, completed, \
                 cancelled or no_show"
            ))
        })
}

/// Get all appointments, soonest first.
#[openapi(tag = "Appointments")]
#[get("/appointments?<page..>")]
pub async fn list_appointments(
    _guard: RequireFrontDesk,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<Appointment>>, ApiError> {
    let data: Vec<Appointment> = sqlx::query_as(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
         ORDER BY appointment_time ASC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single appointment by ID.
#[openapi(tag = "Appointments")]
#[get("/appointments/<id>")]
pub async fn get_appointment(
    _guard: RequireFrontDesk,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Appointment>, ApiError> {
    let appointment: Appointment = sqlx::query_as(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE appointment_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Appointment #{id} not found")))?;

    Ok(Json(appointment))
}

/// Book an appointment. Status defaults to `scheduled`.
#[openapi(tag = "Appointments")]
#[post("/appointments", data = "<payload>")]
pub async fn create_appointment(
    _guard: RequireFrontDesk,
    payload: Json<CreateAppointmentRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Appointment>, ApiError> {
    let status = match payload.status.as_deref() {
        Some(raw) => validated_status(raw)?,
        None => AppointmentStatus::Scheduled.as_str(),
    };

    let appointment: Appointment = sqlx::query_as(&format!(
        "INSERT INTO appointments (status, appointment_time, patient_id, doctor_id) \
         VALUES ($1, $2, $3, $4) RETURNING {APPOINTMENT_COLUMNS}"
    ))
    .bind(status)
    .bind(payload.appointment_time)
    .bind(payload.patient_id)
    .bind(payload.doctor_id)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(appointment))
}

/// Update an appointment; absent fields are left untouched.
#[openapi(tag = "Appointments")]
#[put("/appointments/<id>", data = "<payload>")]
pub async fn update_appointment(
    _guard: RequireFrontDesk,
    id: i32,
    payload: Json<UpdateAppointmentRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Appointment>, ApiError> {
    let status = match payload.status.as_deref() {
        Some(raw) => Some(validated_status(raw)?),
        None => None,
    };

    let appointment: Appointment = sqlx::query_as(&format!(
        "UPDATE appointments SET \
            status = COALESCE($1, status), \
            appointment_time = COALESCE($2, appointment_time), \
            patient_id = COALESCE($3, patient_id), \
            doctor_id = COALESCE($4, doctor_id), \
            updated_at = now() \
         WHERE appointment_id = $5 RETURNING {APPOINTMENT_COLUMNS}"
    ))
    .bind(status)
    .bind(payload.appointment_time)
    .bind(payload.patient_id)
    .bind(payload.doctor_id)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Appointment #{id} not found")))?;

    Ok(Json(appointment))
}

/// Cancel and remove an appointment record.
#[openapi(tag = "Appointments")]
#[delete("/appointments/<id>")]
pub async fn delete_appointment(
    _guard: RequireFrontDesk,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM appointments WHERE appointment_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Appointment #{id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Appointment deleted successfully".into(),
    }))
}
