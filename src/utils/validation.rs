use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Rejects names that could be read as a path or that carry control characters
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        });
    }

    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", name);
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot contain path separators".to_string(),
        });
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot contain control characters".to_string(),
        });
    }

    Ok(())
}

/// Turns the expiry fields of an upload request into one absolute deadline.
///
/// Exactly one of `expires_at` and `expiration_hours` must be given, and the
/// result must fall in `(now, now + max_hours]`.
pub fn resolve_expires_at(
    expires_at: Option<DateTime<Utc>>,
    expiration_hours: Option<i64>,
    now: DateTime<Utc>,
    max_hours: i64,
) -> Result<DateTime<Utc>, ValidationError> {
    let horizon = add_hours(now, max_hours)?;

    match (expires_at, expiration_hours) {
        (Some(_), Some(_)) => Err(ValidationError {
            code: "AMBIGUOUS_EXPIRY",
            message: "Provide either expires_at or expiration_hours, not both".to_string(),
        }),
        (None, None) => Err(ValidationError {
            code: "MISSING_EXPIRY",
            message: "expires_at is required".to_string(),
        }),
        (None, Some(hours)) => {
            if hours < 1 || hours > max_hours {
                return Err(ValidationError {
                    code: "INVALID_EXPIRY",
                    message: format!("expiration_hours must be between 1 and {}", max_hours),
                });
            }
            add_hours(now, hours)
        }
        (Some(at), None) => {
            if at <= now {
                return Err(ValidationError {
                    code: "INVALID_EXPIRY",
                    message: "expires_at must be in the future".to_string(),
                });
            }
            if at > horizon {
                return Err(ValidationError {
                    code: "INVALID_EXPIRY",
                    message: format!("expires_at cannot be more than {} hours ahead", max_hours),
                });
            }
            Ok(at)
        }
    }
}

fn add_hours(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, ValidationError> {
    Duration::try_hours(hours)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| ValidationError {
            code: "INVALID_EXPIRY",
            message: format!("{} hours is out of range", hours),
        })
}
