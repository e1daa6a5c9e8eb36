use chrono::NaiveDate;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put};
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::guards::{RequireAnyStaff, RequireOwner};
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{Expense, MessageResponse, Paginated};
use crate::routes::params::PageParams;

const EXPENSE_COLUMNS: &str = "expense_id, category, amount, expense_date, reason, staff_id";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateExpenseRequest {
    pub category: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateExpenseRequest {
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub expense_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

/// Get all recorded expenses, newest first.
#[openapi(tag = "Expenses")]
#[get("/expenses?<page..>")]
pub async fn list_expenses(
    _guard: RequireOwner,
    page: PageParams,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Paginated<Expense>>, ApiError> {
    let data: Vec<Expense> = sqlx::query_as(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY expense_date DESC OFFSET $1 LIMIT $2"
    ))
    .bind(page.offset())
    .bind(page.limit())
    .fetch_all(&mut **db)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expenses")
        .fetch_one(&mut **db)
        .await?;

    Ok(Json(Paginated { data, count }))
}

/// Get a single expense by ID.
#[openapi(tag = "Expenses")]
#[get("/expenses/<id>")]
pub async fn get_expense(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Expense>, ApiError> {
    let expense: Expense = sqlx::query_as(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE expense_id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Expense #{id} not found")))?;

    Ok(Json(expense))
}

/// Record an expense, attributed to the calling staff member.
#[openapi(tag = "Expenses")]
#[post("/expenses", data = "<payload>")]
pub async fn create_expense(
    guard: RequireAnyStaff,
    payload: Json<CreateExpenseRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Expense>, ApiError> {
    if payload.amount < 0.0 {
        return Err(ApiError::BadRequest("amount must not be negative".into()));
    }

    let expense: Expense = sqlx::query_as(&format!(
        "INSERT INTO expenses (category, amount, expense_date, reason, staff_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {EXPENSE_COLUMNS}"
    ))
    .bind(&payload.category)
    .bind(payload.amount)
    .bind(payload.expense_date)
    .bind(&payload.reason)
    .bind(guard.user().id)
    .fetch_one(&mut **db)
    .await?;

    Ok(Json(expense))
}

/// Update an expense; absent fields are left untouched.
#[openapi(tag = "Expenses")]
#[put("/expenses/<id>", data = "<payload>")]
pub async fn update_expense(
    _guard: RequireOwner,
    id: i32,
    payload: Json<UpdateExpenseRequest>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<Expense>, ApiError> {
    if payload.amount.is_some_and(|amount| amount < 0.0) {
        return Err(ApiError::BadRequest("amount must not be negative".into()));
    }

    let expense: Expense = sqlx::query_as(&format!(
        "UPDATE expenses SET \
            category = COALESCE($1, category), \
            amount = COALESCE($2, amount), \
            expense_date = COALESCE($3, expense_date), \
            reason = COALESCE($4, reason) \
         WHERE expense_id = $5 RETURNING {EXPENSE_COLUMNS}"
    ))
    .bind(&payload.category)
    .bind(payload.amount)
    .bind(payload.expense_date)
    .bind(&payload.reason)
    .bind(id)
    .fetch_optional(&mut **db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Expense #{id} not found")))?;

    Ok(Json(expense))
}

/// Permanently delete an expense.
#[openapi(tag = "Expenses")]
#[delete("/expenses/<id>")]
pub async fn delete_expense(
    _guard: RequireOwner,
    id: i32,
    mut db: Connection<ClinicDb>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM expenses WHERE expense_id = $1")
        .bind(id)
        .execute(&mut **db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("Expense #{id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Expense deleted successfully".into(),
    }))
}
