use crate::entities::files::{self, ScanStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Where a file stands in its lifecycle.
///
/// `Pending`, `Clean` and `Infected` mirror the persisted scan status.
/// `Expired` is never stored: it is derived from `expires_at` and overrides
/// every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Pending,
    Clean,
    Infected,
    Expired,
}

impl FileState {
    pub fn of(file: &files::Model, now: DateTime<Utc>) -> Self {
        if is_expired(file.expires_at, now) {
            return Self::Expired;
        }
        match file.scan_status {
            ScanStatus::Pending => Self::Pending,
            ScanStatus::Clean => Self::Clean,
            ScanStatus::Infected => Self::Infected,
        }
    }
}

pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= expires_at
}

impl ScanStatus {
    /// Only a pending file can receive a verdict, and the verdict must be final.
    pub fn can_transition_to(self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (ScanStatus::Pending, ScanStatus::Clean) | (ScanStatus::Pending, ScanStatus::Infected)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn file(status: ScanStatus, expires_at: DateTime<Utc>) -> files::Model {
        files::Model {
            id: "f1".to_string(),
            owner_id: None,
            file_name: "report.pdf".to_string(),
            gcs_url: "gs://driftbox/report.pdf".to_string(),
            upload_time: expires_at - Duration::hours(1),
            expires_at,
            scan_status: status,
        }
    }

    #[test]
    fn test_transitions_only_leave_pending() {
        use ScanStatus::*;
        assert!(Pending.can_transition_to(Clean));
        assert!(Pending.can_transition_to(Infected));
        assert!(!Pending.can_transition_to(Pending));
        for from in [Clean, Infected] {
            for to in [Pending, Clean, Infected] {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn test_state_follows_scan_status_until_expiry() {
        let now = Utc::now();
        let later = now + Duration::minutes(5);
        assert_eq!(FileState::of(&file(ScanStatus::Pending, later), now), FileState::Pending);
        assert_eq!(FileState::of(&file(ScanStatus::Clean, later), now), FileState::Clean);
        assert_eq!(
            FileState::of(&file(ScanStatus::Infected, later), now),
            FileState::Infected
        );
    }

    #[test]
    fn test_any_state_expires_at_deadline() {
        let now = Utc::now();
        for status in [ScanStatus::Pending, ScanStatus::Clean, ScanStatus::Infected] {
            assert_eq!(FileState::of(&file(status, now), now), FileState::Expired);
            assert_eq!(
                FileState::of(&file(status, now - Duration::seconds(1)), now),
                FileState::Expired
            );
        }
    }

    #[test]
    fn test_expired_state_serializes_lowercase() {
        let json = serde_json::to_string(&FileState::Expired).unwrap();
        assert_eq!(json, "\"expired\"");
    }
}
