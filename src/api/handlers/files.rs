use crate::api::error::AppError;
use crate::entities::files::{self, ScanStatus};
use crate::services::lifecycle::FileState;
use crate::services::record_store::NewFile;
use crate::utils::validation::{resolve_expires_at, validate_file_name};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct FileResponse {
    pub id: String,
    pub owner_id: Option<String>,
    pub file_name: String,
    pub gcs_url: String,
    pub upload_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub scan_status: ScanStatus,
    pub state: FileState,
}

impl FileResponse {
    pub fn from_model(file: files::Model, now: DateTime<Utc>) -> Self {
        let state = FileState::of(&file, now);
        Self {
            id: file.id,
            owner_id: file.owner_id,
            file_name: file.file_name,
            gcs_url: file.gcs_url,
            upload_time: file.upload_time,
            expires_at: file.expires_at,
            scan_status: file.scan_status,
            state,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateFileRequest {
    pub file_name: String,
    pub gcs_url: String,
    pub owner_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expiration_hours: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ScanStatusRequest {
    pub status: ScanStatus,
}

#[utoipa::path(
    post,
    path = "/files",
    request_body = CreateFileRequest,
    responses(
        (status = 201, description = "File record created", body = FileResponse),
        (status = 400, description = "Missing or invalid field")
    ),
    tag = "files"
)]
pub async fn create_file(
    State(state): State<crate::AppState>,
    Json(req): Json<CreateFileRequest>,
) -> Result<(StatusCode, Json<FileResponse>), AppError> {
    validate_file_name(&req.file_name)?;

    let now = Utc::now();
    let expires_at = resolve_expires_at(
        req.expires_at,
        req.expiration_hours,
        now,
        state.config.max_expiration_hours,
    )?;

    let owner_id = req.owner_id.filter(|id| !id.is_empty());

    let file = state
        .store
        .create_file(NewFile {
            owner_id,
            file_name: req.file_name,
            gcs_url: req.gcs_url,
            upload_time: Some(now),
            expires_at: Some(expires_at),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(FileResponse::from_model(file, now))))
}

#[utoipa::path(
    get,
    path = "/files/{id}",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File record", body = FileResponse),
        (status = 404, description = "File not found"),
        (status = 410, description = "File expired")
    ),
    tag = "files"
)]
pub async fn get_file(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, AppError> {
    let file = state
        .store
        .get_file(&id)
        .await?
        .ok_or(AppError::NotFound("File not found".to_string()))?;

    let now = Utc::now();
    if FileState::of(&file, now) == FileState::Expired {
        return Err(AppError::Gone("File has expired".to_string()));
    }

    Ok(Json(FileResponse::from_model(file, now)))
}

#[utoipa::path(
    put,
    path = "/files/{id}/scan-status",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    request_body = ScanStatusRequest,
    responses(
        (status = 200, description = "Scan verdict recorded", body = FileResponse),
        (status = 404, description = "File not found"),
        (status = 409, description = "File already has a verdict"),
        (status = 410, description = "File expired")
    ),
    tag = "files"
)]
pub async fn update_scan_status(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
    Json(req): Json<ScanStatusRequest>,
) -> Result<Json<FileResponse>, AppError> {
    let now = Utc::now();
    let file = state
        .store
        .update_scan_status(&id, req.status, now)
        .await?;

    Ok(Json(FileResponse::from_model(file, now)))
}
