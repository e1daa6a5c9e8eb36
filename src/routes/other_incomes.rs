use chrono::NaiveDate;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::RequireOwner;
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{MessageResponse, OtherIncome, Paginated};
use crate::routes::params::PageParams;

const INCOME_COLUMNS: &str = "income_id, source, amount, income_date, staff_id, patient_id";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateOtherIncomeRequest {
    pub source: String,
    pub amount: f64,
    pub income_date: NaiveDate,
    #[serde(default)]
    pub staff_id: Option<i32>,
    pub patient_id: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateOtherIncomeRequest {
    pub source: Option<String>,
    pub amount: Option<f64>,
    pub income_date: Option<NaiveDate>,
    pub staff_id: Option<i32>,
    pub patient_id: Option<i32>,
}

/// Get all non-treatment income entries, newest first.
#[openapi(tag = "Other Incomes")]
#[get("/other-incomes?<page..>")]
pub async fn list_other_incomes(
    _guard: RequireOwner,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<OtherIncome>>, ApiError> {
    let data: Vec<OtherIncome> = sqlx::query_as(&format!(
        "SELECT {INCOME_COLUMNS} FROM other_incomes ORDER BY income_date DESC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM other_incomes")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single income entry by ID.
#[openapi(tag = "Other Incomes")]
#[get("/other-incomes/<id>")]
pub async fn get_other_income(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<OtherIncome>, ApiError> {
    let income: OtherIncome = sqlx::query_as(&format!(
        "SELECT {INCOME_COLUMNS} FROM other_incomes WHERE income_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Other income #{id} not found")))?;

    Ok(Json(income))
}

/// Record an income entry.
#[openapi(tag = "Other Incomes")]
#[post("/other-incomes", data = "<payload>")]
pub async fn create_other_income(
    guard: RequireOwner,
    payload: Json<CreateOtherIncomeRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<OtherIncome>, ApiError> {
    if payload.amount < 0.0 {
        return Err(ApiError::BadRequest("amount must not be negative".into()));
    }

    let staff_id = payload.staff_id.unwrap_or(guard.user().id);

    let income: OtherIncome = sqlx::query_as(&format!(
        "INSERT INTO other_incomes (source, amount, income_date, staff_id, patient_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {INCOME_COLUMNS}"
    ))
    .bind(&payload.source)
    .bind(payload.amount)
    .bind(payload.income_date)
    .bind(staff_id)
    .bind(payload.patient_id)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(income))
}

/// Update an income entry; absent fields are left untouched.
#[openapi(tag = "Other Incomes")]
#[put("/other-incomes/<id>", data = "<payload>")]
pub async fn update_other_income(
    _guard: RequireOwner,
    id: i32,
    payload: Json<UpdateOtherIncomeRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<OtherIncome>, ApiError> {
    if payload.amount.is_some_and(|amount| amount < 0.0) {
        return Err(ApiError::BadRequest("amount must not be negative".into()));
    }

    let income: OtherIncome = sqlx::query_as(&format!(
        "UPDATE other_incomes SET \
            source = COALESCE($1, source), \
            amount = COALESCE($2, amount), \
            income_date = COALESCE($3, income_date), \
            staff_id = COALESCE($4, staff_id), \
            patient_id = COALESCE($5, patient_id) \
         WHERE income_id = $6 RETURNING {INCOME_COLUMNS}"
    ))
    .bind(&payload.source)
    .bind(payload.amount)
    .bind(payload.income_date)
    .bind(payload.staff_id)
    .bind(payload.patient_id)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Other income #{id} not found")))?;

    Ok(Json(income))
}

/// Permanently delete an income entry.
#[openapi(tag = "Other Incomes")]
#[delete("/other-incomes/<id>")]
pub async fn delete_other_income(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM other_incomes WHERE income_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Other income #{id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Other income deleted successfully".into(),
    }))
}
