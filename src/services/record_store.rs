use crate::entities::files::ScanStatus;
use crate::entities::{prelude::*, *};
use crate::services::lifecycle::is_expired;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate key: {0} already exists")]
    DuplicateKey(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File {0} has expired")]
    Expired(String),

    #[error("Invalid scan status transition: {from} -> {to}")]
    InvalidTransition { from: ScanStatus, to: ScanStatus },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ValidationErrors> for StoreError {
    fn from(e: ValidationErrors) -> Self {
        StoreError::Validation(e.to_string())
    }
}

fn unique_violation(e: DbErr, key: &'static str) -> StoreError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateKey(key),
        _ => StoreError::Database(e),
    }
}

/// Rejects values made only of whitespace
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank")
            .with_message("Username cannot be blank".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Validate)]
pub struct NewUser {
    #[validate(
        length(min = 1, max = 64, message = "Username must be between 1 and 64 characters"),
        custom(function = "not_blank")
    )]
    pub username: String,
    #[validate(length(min = 1, message = "Password hash cannot be empty"))]
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct NewFile {
    pub owner_id: Option<String>,
    #[validate(length(min = 1, max = 255, message = "File name must be between 1 and 255 characters"))]
    pub file_name: String,
    #[validate(length(min = 1, message = "Storage URL cannot be empty"))]
    pub gcs_url: String,
    /// Defaults to the insertion time
    pub upload_time: Option<DateTime<Utc>>,
    #[validate(required(message = "expires_at is required"))]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Per-owner file counts, by scan status and by expiry
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StorageSummary {
    pub file_count: u64,
    pub pending: u64,
    pub clean: u64,
    pub infected: u64,
    pub expired: u64,
}

/// Position of the sweep inside the `(expires_at, id)` ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryCursor {
    pub expires_at: DateTime<Utc>,
    pub id: String,
}

impl From<&files::Model> for ExpiryCursor {
    fn from(file: &files::Model) -> Self {
        Self {
            expires_at: file.expires_at,
            id: file.id.clone(),
        }
    }
}

/// Persistence for users and files.
///
/// All invariants on the records are enforced here so that every caller
/// (HTTP handlers, the sweeper, tests) sees the same rules.
#[derive(Clone)]
pub struct RecordStore {
    db: DatabaseConnection,
}

impl RecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<users::Model, StoreError> {
        new_user.validate()?;

        if self
            .find_user_by_username(&new_user.username)
            .await?
            .is_some()
        {
            return Err(StoreError::DuplicateKey("username"));
        }

        let user = users::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            username: Set(new_user.username),
            password_hash: Set(new_user.password_hash),
            created_at: Set(Utc::now()),
        };

        // The unique index still guards against a concurrent insert of the same name
        let user = user
            .insert(&self.db)
            .await
            .map_err(|e| unique_violation(e, "username"))?;

        tracing::info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<users::Model>, StoreError> {
        Ok(Users::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<users::Model>, StoreError> {
        Ok(Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    pub async fn create_file(&self, new_file: NewFile) -> Result<files::Model, StoreError> {
        new_file.validate()?;

        let expires_at = new_file
            .expires_at
            .ok_or_else(|| StoreError::Validation("expires_at is required".to_string()))?;

        if let Some(owner_id) = &new_file.owner_id {
            if self.get_user(owner_id).await?.is_none() {
                return Err(StoreError::InvalidReference(format!(
                    "owner {} does not exist",
                    owner_id
                )));
            }
        }

        let file = files::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            owner_id: Set(new_file.owner_id),
            file_name: Set(new_file.file_name),
            gcs_url: Set(new_file.gcs_url),
            upload_time: Set(new_file.upload_time.unwrap_or_else(Utc::now)),
            expires_at: Set(expires_at),
            scan_status: Set(ScanStatus::default()),
        };

        let file = file.insert(&self.db).await?;

        tracing::info!(
            "Created file {} '{}' (expires at {})",
            file.id,
            file.file_name,
            file.expires_at
        );
        Ok(file)
    }

    pub async fn get_file(&self, id: &str) -> Result<Option<files::Model>, StoreError> {
        Ok(Files::find_by_id(id).one(&self.db).await?)
    }

    pub async fn list_files_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<files::Model>, StoreError> {
        Ok(Files::find()
            .filter(files::Column::OwnerId.eq(owner_id))
            .order_by_asc(files::Column::UploadTime)
            .order_by_asc(files::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Record a scan verdict.
    ///
    /// The update is conditional on the row still being pending, so two
    /// verdicts racing for the same file cannot both win.
    pub async fn update_scan_status(
        &self,
        id: &str,
        status: ScanStatus,
        now: DateTime<Utc>,
    ) -> Result<files::Model, StoreError> {
        let file = self
            .get_file(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))?;

        if is_expired(file.expires_at, now) {
            return Err(StoreError::Expired(file.id));
        }

        if !file.scan_status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: file.scan_status,
                to: status,
            });
        }

        let result = Files::update_many()
            .col_expr(files::Column::ScanStatus, Expr::value(status))
            .filter(files::Column::Id.eq(id))
            .filter(files::Column::ScanStatus.eq(file.scan_status))
            .exec(&self.db)
            .await?;

        let updated = self
            .get_file(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("file {}", id)))?;

        if result.rows_affected == 0 {
            return Err(StoreError::InvalidTransition {
                from: updated.scan_status,
                to: status,
            });
        }

        tracing::info!("File {} scan status: {} -> {}", id, file.scan_status, status);
        Ok(updated)
    }

    /// Returns false when no such record existed
    pub async fn delete_file(&self, id: &str) -> Result<bool, StoreError> {
        let result = Files::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<files::Model>, StoreError> {
        self.find_expired_after(now, None, limit).await
    }

    /// Expired files ordered by `(expires_at, id)`, starting strictly after `after`
    pub async fn find_expired_after(
        &self,
        now: DateTime<Utc>,
        after: Option<&ExpiryCursor>,
        limit: u64,
    ) -> Result<Vec<files::Model>, StoreError> {
        let mut query = Files::find().filter(files::Column::ExpiresAt.lte(now));

        if let Some(cursor) = after {
            query = query.filter(
                Condition::any()
                    .add(files::Column::ExpiresAt.gt(cursor.expires_at))
                    .add(
                        Condition::all()
                            .add(files::Column::ExpiresAt.eq(cursor.expires_at))
                            .add(files::Column::Id.gt(cursor.id.as_str())),
                    ),
            );
        }

        Ok(query
            .order_by_asc(files::Column::ExpiresAt)
            .order_by_asc(files::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn storage_summary(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StorageSummary, StoreError> {
        let owned = || Files::find().filter(files::Column::OwnerId.eq(owner_id));

        let mut summary = StorageSummary {
            expired: owned()
                .filter(files::Column::ExpiresAt.lte(now))
                .count(&self.db)
                .await?,
            ..Default::default()
        };

        for status in [ScanStatus::Pending, ScanStatus::Clean, ScanStatus::Infected] {
            let count = owned()
                .filter(files::Column::ScanStatus.eq(status))
                .count(&self.db)
                .await?;
            match status {
                ScanStatus::Pending => summary.pending = count,
                ScanStatus::Clean => summary.clean = count,
                ScanStatus::Infected => summary.infected = count,
            }
            summary.file_count += count;
        }

        Ok(summary)
    }
}
