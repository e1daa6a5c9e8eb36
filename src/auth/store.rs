use std::ops::DerefMut;

use chrono::NaiveDate;
use rocket_db_pools::sqlx::{self, PgPool, Postgres, Transaction};

use crate::auth::passwords::PasswordService;
use crate::auth::{AuthError, AuthResult};
use crate::models::{StaffAccount, StaffRole};

const STAFF_COLUMNS: &str = "staff_id, full_name, phone, email, password_hash, role, \
                             hire_date, doctor_id, created_at, updated_at";

/// Fields accepted when creating a login-capable account.
#[derive(Debug, Clone)]
pub struct NewStaffAccount {
    pub full_name: String,
    pub phone: Option<String>,
    pub email: String,
    pub password: String,
    pub role: Option<StaffRole>,
    pub hire_date: Option<NaiveDate>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct StaffUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<StaffRole>,
    pub hire_date: Option<NaiveDate>,
}

/// Canonical form for every email that touches the credential store.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Persistence layer for staff accounts, including the password hash column
/// that never leaves this module in API responses.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    pool: PgPool,
}

impl CredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<StaffAccount>> {
        let normalized = normalize_email(email);
        let account = sqlx::query_as::<_, StaffAccount>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE lower(email) = $1"
        ))
        .bind(&normalized)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    pub async fn find_by_id(&self, staff_id: i32) -> AuthResult<Option<StaffAccount>> {
        let account = sqlx::query_as::<_, StaffAccount>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE staff_id = $1"
        ))
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    pub async fn list(&self, offset: i64, limit: i64) -> AuthResult<(Vec<StaffAccount>, i64)> {
        let accounts = sqlx::query_as::<_, StaffAccount>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff ORDER BY staff_id ASC OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff")
            .fetch_one(&self.pool)
            .await?;

        Ok((accounts, count))
    }

    /// Create an account: normalized email, hashed password, role defaulting
    /// to `staff`. Duplicate email surfaces as [`AuthError::EmailExists`].
    pub async fn create(
        &self,
        passwords: &PasswordService,
        new: NewStaffAccount,
    ) -> AuthResult<StaffAccount> {
        let email = normalize_email(&new.email);

        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        let password_hash = passwords.hash_password(&new.password)?;
        let role = new.role.unwrap_or(StaffRole::Staff);

        let account = sqlx::query_as::<_, StaffAccount>(&format!(
            "INSERT INTO staff (full_name, phone, email, password_hash, role, hire_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {STAFF_COLUMNS}"
        ))
        .bind(&new.full_name)
        .bind(&new.phone)
        .bind(&email)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(new.hire_date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(account)
    }

    /// Apply a partial update. Password is re-hashed when supplied; when the
    /// account is linked to a doctor profile, identity fields propagate to
    /// the linked `doctors` row (staff to doctor only, never back).
    pub async fn update(
        &self,
        passwords: &PasswordService,
        staff_id: i32,
        update: StaffUpdate,
    ) -> AuthResult<StaffAccount> {
        let existing = self
            .find_by_id(staff_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let email = update.email.as_deref().map(normalize_email);
        let password_hash = match update.password.as_deref() {
            Some(plaintext) => Some(passwords.hash_password(plaintext)?),
            None => None,
        };

        let account = sqlx::query_as::<_, StaffAccount>(&format!(
            "UPDATE staff SET \
                full_name = COALESCE($1, full_name), \
                phone = COALESCE($2, phone), \
                email = COALESCE($3, email), \
                password_hash = COALESCE($4, password_hash), \
                role = COALESCE($5, role), \
                hire_date = COALESCE($6, hire_date), \
                updated_at = now() \
             WHERE staff_id = $7 RETURNING {STAFF_COLUMNS}"
        ))
        .bind(&update.full_name)
        .bind(&update.phone)
        .bind(&email)
        .bind(&password_hash)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.hire_date)
        .bind(staff_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        if let Some(doctor_id) = existing.doctor_id {
            let identity_changed = update.full_name.is_some()
                || update.phone.is_some()
                || email.is_some()
                || update.hire_date.is_some();
            if identity_changed {
                sqlx::query(
                    "UPDATE doctors SET \
                        full_name = $1, \
                        phone = COALESCE($2, phone), \
                        email = $3, \
                        hire_date = COALESCE($4, hire_date), \
                        updated_at = now() \
                     WHERE doctor_id = $5",
                )
                .bind(&account.full_name)
                .bind(&account.phone)
                .bind(&account.email)
                .bind(account.hire_date)
                .bind(doctor_id)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(account)
    }

    /// Overwrite the stored hash. Callers are responsible for any
    /// current-password verification; this is also the admin-reset path.
    pub async fn update_password(&self, staff_id: i32, password_hash: &str) -> AuthResult<()> {
        let result =
            sqlx::query("UPDATE staff SET password_hash = $1, updated_at = now() WHERE staff_id = $2")
                .bind(password_hash)
                .bind(staff_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    pub async fn remove(&self, staff_id: i32) -> AuthResult<()> {
        let result = sqlx::query("DELETE FROM staff WHERE staff_id = $1")
            .bind(staff_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    /// Insert an account inside an open unit of work. Used by the
    /// doctor-creation transaction so a failed linkage leaves no account.
    pub async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        full_name: &str,
        phone: Option<&str>,
        email: &str,
        password_hash: &str,
        role: StaffRole,
        hire_date: Option<NaiveDate>,
    ) -> AuthResult<StaffAccount> {
        let normalized = normalize_email(email);
        let account = sqlx::query_as::<_, StaffAccount>(&format!(
            "INSERT INTO staff (full_name, phone, email, password_hash, role, hire_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {STAFF_COLUMNS}"
        ))
        .bind(full_name)
        .bind(phone)
        .bind(&normalized)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(hire_date)
        .fetch_one(tx.deref_mut())
        .await
        .map_err(map_unique_violation)?;

        Ok(account)
    }

    /// Point an account at its doctor profile, inside the same unit of work.
    pub async fn set_doctor_link_tx(
        tx: &mut Transaction<'_, Postgres>,
        staff_id: i32,
        doctor_id: i32,
    ) -> AuthResult<()> {
        sqlx::query("UPDATE staff SET doctor_id = $1, updated_at = now() WHERE staff_id = $2")
            .bind(doctor_id)
            .bind(staff_id)
            .execute(tx.deref_mut())
            .await?;
        Ok(())
    }
}

fn map_unique_violation(err: sqlx::Error) -> AuthError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AuthError::EmailExists
        }
        _ => AuthError::Sqlx(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_email_case_and_whitespace() {
        assert_eq!(normalize_email("  Nurse@Clinic.TEST "), "nurse@clinic.test");
        assert_eq!(normalize_email("plain@clinic.test"), "plain@clinic.test");
    }
}
