//! Multipart upload endpoints for clinical documents and patient images,
//! plus the public filename-based retrieval endpoint.
//!
//! Files land under the upload root in one subdirectory per area, renamed to
//! a generated `<area>-<uuid>.<ext>` so the serving path never contains
//! caller-controlled names.

use std::io;
use std::path::PathBuf;

use rocket::form::{Form, FromForm};
use rocket::fs::{NamedFile, TempFile};
use rocket::http::ContentType;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::guards::{RequireAdmin, RequireOwner};
use crate::db::ClinicDb;
use crate::error::ApiError;
use crate::models::{ClinicalDocument, PatientImage};
use rocket_db_pools::{Connection, sqlx};

pub const CLINICAL_DOCUMENTS_AREA: &str = "clinical-documents";
pub const PATIENT_IMAGES_AREA: &str = "patient-images";

const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Filesystem root for uploaded content, from `CLINIC_UPLOAD_DIR`.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    root: PathBuf,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        let root = std::env::var("CLINIC_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        Self { root: PathBuf::from(root) }
    }

    pub fn area_dir(&self, area: &str) -> PathBuf {
        self.root.join(area)
    }

    /// Create the per-area directories; called once at ignition.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for area in [CLINICAL_DOCUMENTS_AREA, PATIENT_IMAGES_AREA] {
            std::fs::create_dir_all(self.area_dir(area))?;
        }
        Ok(())
    }
}

/// Map the uploaded content type to a stored file extension.
fn extension_for(content_type: Option<&ContentType>) -> &'static str {
    match content_type {
        Some(ct) if ct.is_jpeg() => "jpg",
        Some(ct) if ct.is_png() => "png",
        Some(ct) if ct.is_gif() => "gif",
        Some(ct) if ct.is_bmp() => "bmp",
        Some(ct) if ct.is_webp() => "webp",
        Some(ct) if ct.is_svg() => "svg",
        Some(ct) if ct.is_pdf() => "pdf",
        _ => "bin",
    }
}

fn generated_filename(area: &str, content_type: Option<&ContentType>) -> String {
    format!("{}-{}.{}", area, Uuid::new_v4(), extension_for(content_type))
}

/// Only generated names are ever served; anything with path structure in it
/// is rejected outright.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}

fn retrieval_url(area: &str, filename: &str) -> String {
    format!("/api/v1/files/{area}/{filename}")
}

async fn store_file(
    config: &UploadConfig,
    area: &str,
    file: &mut TempFile<'_>,
) -> Result<String, ApiError> {
    let filename = generated_filename(area, file.content_type());
    let dest = config.area_dir(area).join(&filename);

    file.copy_to(&dest)
        .await
        .map_err(|err| ApiError::InternalError(format!("failed to store upload: {err}")))?;

    Ok(filename)
}

// ===== Clinical document upload =====

#[derive(FromForm)]
pub struct DocumentUploadForm<'r> {
    pub file: TempFile<'r>,
    pub patient_id: i32,
    pub appointment_id: i32,
    pub document_type: String,
    pub consent_version: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UploadedDocumentResponse {
    #[serde(flatten)]
    pub document: ClinicalDocument,
    pub url: String,
}

/// Upload a consent or clinical document and create its record.
#[post("/clinical-documents/upload", data = "<payload>")]
pub async fn upload_clinical_document(
    _guard: RequireOwner,
    config: &State<UploadConfig>,
    payload: Form<DocumentUploadForm<'_>>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<UploadedDocumentResponse>, ApiError> {
    let mut form = payload.into_inner();

    let filename = store_file(config, CLINICAL_DOCUMENTS_AREA, &mut form.file).await?;
    let file_path = format!("{CLINICAL_DOCUMENTS_AREA}/{filename}");

    let document: ClinicalDocument = sqlx::query_as(
        "INSERT INTO clinical_documents \
            (patient_id, appointment_id, document_type, consent_version, file_path) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING document_id, patient_id, appointment_id, document_type, consent_version, \
                   file_path",
    )
    .bind(form.patient_id)
    .bind(form.appointment_id)
    .bind(&form.document_type)
    .bind(&form.consent_version)
    .bind(&file_path)
    .fetch_one(&mut **db)
    .await?;

    let url = retrieval_url(CLINICAL_DOCUMENTS_AREA, &filename);
    Ok(Json(UploadedDocumentResponse { document, url }))
}

// ===== Patient image upload =====

#[derive(FromForm)]
pub struct ImageUploadForm<'r> {
    pub file: TempFile<'r>,
    pub patient_id: i32,
    pub image_type: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UploadedImageResponse {
    #[serde(flatten)]
    pub image: PatientImage,
    pub url: String,
}

/// Upload a medical image (X-ray, MRI, ...) for a patient. The uploader is
/// taken from the bearer identity.
#[post("/patient-images/upload", data = "<payload>")]
pub async fn upload_patient_image(
    guard: RequireAdmin,
    config: &State<UploadConfig>,
    payload: Form<ImageUploadForm<'_>>,
    mut db: Connection<ClinicDb>,
) -> Result<Json<UploadedImageResponse>, ApiError> {
    let mut form = payload.into_inner();

    let is_image = form
        .file
        .content_type()
        .map(|ct| ct.top() == "image")
        .unwrap_or(false);
    if !is_image {
        return Err(ApiError::BadRequest(
            "Only image files are allowed (jpg, jpeg, png, gif, bmp, webp, svg)".into(),
        ));
    }
    if form.file.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::BadRequest(
            "Image exceeds the 5MB upload limit".into(),
        ));
    }

    let filename = store_file(config, PATIENT_IMAGES_AREA, &mut form.file).await?;
    let file_path = format!("{PATIENT_IMAGES_AREA}/{filename}");

    let image: PatientImage = sqlx::query_as(
        "INSERT INTO patient_images \
            (patient_id, image_type, file_path, uploaded_by_staff_id, notes) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING image_id, patient_id, image_type, file_path, uploaded_by_staff_id, notes, \
                   uploaded_at",
    )
    .bind(form.patient_id)
    .bind(&form.image_type)
    .bind(&file_path)
    .bind(guard.user().id)
    .bind(&form.notes)
    .fetch_one(&mut **db)
    .await?;

    let url = retrieval_url(PATIENT_IMAGES_AREA, &filename);
    Ok(Json(UploadedImageResponse { image, url }))
}

// ===== Public retrieval =====

/// Serve a stored file back by its generated name.
#[get("/files/<area>/<filename>")]
pub async fn get_file(
    area: &str,
    filename: &str,
    config: &State<UploadConfig>,
) -> Result<NamedFile, ApiError> {
    if area != CLINICAL_DOCUMENTS_AREA && area != PATIENT_IMAGES_AREA {
        return Err(ApiError::NotFound(format!("Unknown file area '{area}'")));
    }
    if !is_safe_filename(filename) {
        return Err(ApiError::BadRequest("invalid file name".into()));
    }

    let path = config.area_dir(area).join(filename);
    NamedFile::open(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("File '{filename}' not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_filenames() {
        assert!(is_safe_filename("patient-images-abc123.png"));
        assert!(!is_safe_filename("../secrets.txt"));
        assert!(!is_safe_filename("a/b.png"));
        assert!(!is_safe_filename("a\\b.png"));
        assert!(!is_safe_filename(""));
    }

    #[test]
    fn generated_filenames_carry_area_prefix_and_extension() {
        let name = generated_filename(PATIENT_IMAGES_AREA, Some(&ContentType::PNG));
        assert!(name.starts_with("patient-images-"));
        assert!(name.ends_with(".png"));
        assert!(is_safe_filename(&name));

        let fallback = generated_filename(CLINICAL_DOCUMENTS_AREA, None);
        assert!(fallback.ends_with(".bin"));
    }

    #[test]
    fn unknown_content_types_map_to_bin() {
        assert_eq!(extension_for(Some(&ContentType::Binary)), "bin");
        assert_eq!(extension_for(Some(&ContentType::PDF)), "pdf");
        assert_eq!(extension_for(Some(&ContentType::JPEG)), "jpg");
    }

    #[test]
    fn upload_root_defaults_to_local_uploads_dir() {
        let config = UploadConfig {
            root: PathBuf::from("./uploads"),
        };
        assert_eq!(
            config.area_dir(PATIENT_IMAGES_AREA),
            PathBuf::from("./uploads/patient-images")
        );
    }
}
