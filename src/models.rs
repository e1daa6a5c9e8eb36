use chrono::{DateTime, NaiveDate, Utc};
use rocket_db_pools::sqlx::FromRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ===== Role & Status Vocabulary =====

/// Clinic staff roles ordered from least to most privileged.
///
/// Stored as lowercase text; `owner` is the top role required for
/// administrative recovery operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Staff,
    Doctor,
    Admin,
    Owner,
}

impl StaffRole {
    pub fn from_str(role: &str) -> Self {
        match role {
            "owner" => StaffRole::Owner,
            "admin" => StaffRole::Admin,
            "doctor" => StaffRole::Doctor,
            _ => StaffRole::Staff,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Owner => "owner",
            StaffRole::Admin => "admin",
            StaffRole::Doctor => "doctor",
            StaffRole::Staff => "staff",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "no_show" => Some(AppointmentStatus::NoShow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TreatmentPlanStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl TreatmentPlanStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(TreatmentPlanStatus::Draft),
            "active" => Some(TreatmentPlanStatus::Active),
            "completed" => Some(TreatmentPlanStatus::Completed),
            "cancelled" => Some(TreatmentPlanStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TreatmentPlanStatus::Draft => "draft",
            TreatmentPlanStatus::Active => "active",
            TreatmentPlanStatus::Completed => "completed",
            TreatmentPlanStatus::Cancelled => "cancelled",
        }
    }
}

// ===== Staff (credential store) =====

/// Full staff row including the password hash. Never serialized; API
/// responses go through [`StaffProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct StaffAccount {
    pub staff_id: i32,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub hire_date: Option<NaiveDate>,
    pub doctor_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StaffAccount {
    pub fn role(&self) -> StaffRole {
        StaffRole::from_str(&self.role)
    }
}

/// Public view of a staff account.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StaffProfile {
    pub staff_id: i32,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub email: String,
    pub role: StaffRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StaffAccount> for StaffProfile {
    fn from(account: StaffAccount) -> Self {
        let role = account.role();
        Self {
            staff_id: account.staff_id,
            full_name: account.full_name,
            phone: account.phone,
            email: account.email,
            role,
            hire_date: account.hire_date,
            doctor_id: account.doctor_id,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

// ===== Clinical Entities =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct Doctor {
    pub doctor_id: i32,
    pub full_name: String,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub hire_date: NaiveDate,
    pub staff_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct Patient {
    pub patient_id: i32,
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub email: String,
    pub address: Option<String>,
    pub allergies_text: Option<String>,
    pub medical_conditions_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct Appointment {
    pub appointment_id: i32,
    pub status: String,
    pub appointment_time: DateTime<Utc>,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct MedicalRecord {
    pub record_id: i32,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub diagnosis: String,
    pub clinical_findings: String,
    pub treatment: String,
    pub allergies: String,
    pub medical_conditions: String,
    pub current_meds: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct TreatmentPlan {
    pub plan_id: i32,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub appointment_id: i32,
    pub diagnosis_summary: String,
    pub plan_details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription: Option<Vec<u8>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct ProcedureRecord {
    pub procedure_id: i32,
    pub patient_id: i32,
    pub doctor_id: i32,
    pub appointment_id: i32,
    pub plan_id: i32,
    pub procedure_name: String,
    pub procedure_notes: String,
    pub performed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ===== Financial Ledgers =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct Expense {
    pub expense_id: i32,
    pub category: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub reason: String,
    pub staff_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct OtherIncome {
    pub income_id: i32,
    pub source: String,
    pub amount: f64,
    pub income_date: NaiveDate,
    pub staff_id: Option<i32>,
    pub patient_id: i32,
}

// ===== File-Backed Records =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct ClinicalDocument {
    pub document_id: i32,
    pub patient_id: i32,
    pub appointment_id: i32,
    pub document_type: String,
    pub consent_version: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct PatientImage {
    pub image_id: i32,
    pub patient_id: i32,
    pub image_type: String,
    pub file_path: String,
    pub uploaded_by_staff_id: Option<i32>,
    pub notes: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

// ===== Response Envelopes =====

/// Standard list envelope: one page of rows plus the total row count.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_role_round_trips_through_strings() {
        for role in [
            StaffRole::Owner,
            StaffRole::Admin,
            StaffRole::Doctor,
            StaffRole::Staff,
        ] {
            assert_eq!(StaffRole::from_str(role.as_str()), role);
        }
        // Unknown vocabulary degrades to the least privileged role.
        assert_eq!(StaffRole::from_str("custumer"), StaffRole::Staff);
    }

    #[test]
    fn appointment_status_rejects_unknown_values() {
        assert_eq!(
            AppointmentStatus::parse("no_show"),
            Some(AppointmentStatus::NoShow)
        );
        assert!(AppointmentStatus::parse("noshow").is_none());
    }

    #[test]
    fn staff_profile_omits_password_hash() {
        let account = StaffAccount {
            staff_id: 1,
            full_name: "Amira Hadad".into(),
            phone: None,
            email: "amira@clinic.test".into(),
            password_hash: "$2b$12$secret".into(),
            role: "admin".into(),
            hire_date: None,
            doctor_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(StaffProfile::from(account)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "admin");
    }
}
