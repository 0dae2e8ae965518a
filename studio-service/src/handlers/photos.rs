use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use utoipa::ToSchema;

use crate::{dtos::ErrorResponse, models::JobPhoto, services::PhotoUpload, AppState};

/// Multipart body accepted by the upload endpoint (documentation only).
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct PhotoUploadForm {
    #[schema(example = "Wedding")]
    work_type: String,
    #[schema(example = "Ana and Rui")]
    work_name: String,
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Vec<Vec<u8>>,
}

fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(format!("Upload too large: {}", err.body_text()));
    }
    AppError::BadRequest(anyhow::anyhow!("{}: {}", context, err.body_text()))
}

/// Upload photos for a job
#[utoipa::path(
    post,
    path = "/jobs/{id}/photos",
    params(("id" = i64, Path, description = "Job id")),
    request_body(content = PhotoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Photos stored", body = [JobPhoto]),
        (status = 400, description = "No files or malformed form", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 413, description = "Upload exceeds PHOTO_MAX_UPLOAD_BYTES", body = ErrorResponse)
    ),
    tag = "Jobs",
    security(("cookie_auth" = []))
)]
pub async fn upload_photos(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut work_type = None;
    let mut work_name = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let data = field
                .bytes()
                .await
                .map_err(|e| multipart_error("Failed to read file", e))?;
            files.push(PhotoUpload {
                file_name,
                data: data.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| multipart_error("Invalid form field", e))?;
        match name.as_str() {
            "workType" => work_type = Some(value),
            "workName" => work_name = Some(value),
            _ => {}
        }
    }

    let work_type = work_type
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("workType is required")))?;
    let work_name = work_name
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("workName is required")))?;

    let photos = state
        .photo_service
        .upload(job_id, &work_type, &work_name, files)
        .await?;

    Ok((StatusCode::CREATED, Json(photos)))
}

#[utoipa::path(
    get,
    path = "/jobs/{id}/photos",
    params(("id" = i64, Path, description = "Job id")),
    responses(
        (status = 200, description = "Stored photo keys", body = [JobPhoto]),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    tag = "Jobs",
    security(("cookie_auth" = []))
)]
pub async fn list_photos(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.photo_service.list(job_id).await?))
}
