//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule corresponds to a logical area of the API (patients,
//! doctors, appointments, etc.) and exposes typed Rocket handlers annotated
//! with `#[openapi]` so `rocket_okapi` can derive an OpenAPI document
//! automatically. The multipart upload and raw file retrieval handlers live
//! in [`uploads`] and are mounted outside the OpenAPI document.

pub mod appointments;
pub mod clinical_documents;
pub mod doctors;
pub mod expenses;
pub mod health;
pub mod medical_records;
pub mod other_incomes;
pub mod params;
pub mod patient_images;
pub mod patients;
pub mod procedures;
pub mod staff;
pub mod treatment_plans;
pub mod uploads;
