use crate::api::error::AppError;
use crate::api::handlers::files::FileResponse;
use crate::entities::users;
use crate::services::record_store::{NewUser, StorageSummary, not_blank};
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 1, max = 64, message = "Username must be between 1 and 64 characters"),
        custom(function = "not_blank")
    )]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Public view of a user; the password hash never leaves the store
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
}

/// File counts for one owner, by scan status and by expiry
#[derive(Serialize, ToSchema)]
pub struct StorageSummaryResponse {
    pub user_id: String,
    pub file_count: u64,
    pub pending: u64,
    pub clean: u64,
    pub infected: u64,
    /// Past their deadline but not swept yet
    pub expired: u64,
}

impl StorageSummaryResponse {
    fn new(user_id: String, summary: StorageSummary) -> Self {
        Self {
            user_id,
            file_count: summary.file_count,
            pending: summary.pending,
            clean: summary.clean,
            infected: summary.infected,
            expired: summary.expired,
        }
    }
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid username or password"),
        (status = 409, description = "Username already exists")
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string();

    let user = state
        .store
        .create_user(NewUser {
            username: payload.username,
            password_hash,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .store
        .get_user(&id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/users/{id}/files",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Files owned by the user", body = FileListResponse),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn list_user_files(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileListResponse>, AppError> {
    if state.store.get_user(&id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let now = Utc::now();
    let files = state
        .store
        .list_files_by_owner(&id)
        .await?
        .into_iter()
        .map(|f| FileResponse::from_model(f, now))
        .collect();

    Ok(Json(FileListResponse { files }))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/files/{file_id}",
    params(
        ("id" = String, Path, description = "Owner ID"),
        ("file_id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 204, description = "File removed"),
        (status = 404, description = "File not found or not owned by this user")
    ),
    tag = "users"
)]
pub async fn delete_user_file(
    State(state): State<crate::AppState>,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let file = state
        .store
        .get_file(&file_id)
        .await?
        .filter(|f| f.owner_id.as_deref() == Some(id.as_str()))
        .ok_or(AppError::NotFound(
            "File not found or access denied".to_string(),
        ))?;

    state.file_service.remove_file(&file).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/{id}/storage",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Storage summary for the user", body = StorageSummaryResponse),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn get_user_storage(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> Result<Json<StorageSummaryResponse>, AppError> {
    if state.store.get_user(&id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let summary = state.store.storage_summary(&id, Utc::now()).await?;
    tracing::debug!("Storage summary for user {}: {:?}", id, summary);

    Ok(Json(StorageSummaryResponse::new(id, summary)))
}
