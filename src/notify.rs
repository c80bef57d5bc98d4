// 📣 Collaborators - access grants and notifications
//
// The core never formats messages or talks to a chat platform. It hands
// these traits plain payloads; delivery is somebody else's problem.
// Notification failures are logged and dropped.

use crate::board::TileProgress;
use crate::teams::TeamId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Access grant failed for {caller} on {team}: {reason}")]
    Grant {
        caller: String,
        team: String,
        reason: String,
    },
}

// ============================================================================
// ACCESS GRANTS
// ============================================================================

/// "Does this caller hold team X's access role", plus the grant action
pub trait AccessGrants: Send + Sync {
    fn holds(&self, caller: &str, team: &TeamId) -> bool;
    fn grant(&self, caller: &str, team: &TeamId) -> Result<(), NotifyError>;
}

/// In-process grant table (CLI runs, tests)
#[derive(Debug, Default)]
pub struct MemoryAccessGrants {
    grants: Mutex<HashSet<(String, TeamId)>>,
}

impl MemoryAccessGrants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a grant
    pub fn with_grant(self, caller: &str, team: &TeamId) -> Self {
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((caller.to_string(), team.clone()));
        self
    }

    pub fn revoke(&self, caller: &str, team: &TeamId) {
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(caller.to_string(), team.clone()));
    }
}

impl AccessGrants for MemoryAccessGrants {
    fn holds(&self, caller: &str, team: &TeamId) -> bool {
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(caller.to_string(), team.clone()))
    }

    fn grant(&self, caller: &str, team: &TeamId) -> Result<(), NotifyError> {
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((caller.to_string(), team.clone()));
        Ok(())
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

/// Payload emitted after each core state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    SignupsImported {
        imported: usize,
    },
    VerificationPending {
        username: String,
        team: TeamId,
        caller: String,
    },
    ReapprovalNeeded {
        username: String,
        team: TeamId,
        caller: String,
    },
    UserApproved {
        username: String,
        team: TeamId,
        caller: String,
    },
    SubmissionRecorded {
        submission_id: String,
        team: TeamId,
        coordinate: String,
        item_name: String,
        submitter: String,
        similarity: f64,
        needs_review: bool,
    },
    SubmissionApproved {
        submission_id: String,
        team: TeamId,
        coordinate: String,
        item_name: String,
        submitter: String,
        progress: TileProgress,
        tile_completed: bool,
        points_delta: i64,
        total_points: i64,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::SignupsImported { .. } => "signups_imported",
            Notification::VerificationPending { .. } => "verification_pending",
            Notification::ReapprovalNeeded { .. } => "reapproval_needed",
            Notification::UserApproved { .. } => "user_approved",
            Notification::SubmissionRecorded { .. } => "submission_recorded",
            Notification::SubmissionApproved { .. } => "submission_approved",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Fire-and-forget: a failed delivery is logged, never returned
pub fn deliver(notifier: &dyn Notifier, notification: &Notification) {
    if let Err(e) = notifier.notify(notification) {
        tracing::warn!(kind = notification.kind(), error = %e, "notification dropped");
    }
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        tracing::info!(kind = notification.kind(), %payload, "notification");
        Ok(())
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent().iter().map(Notification::kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&self, _: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("channel gone".into()))
        }
    }

    #[test]
    fn test_memory_grants() {
        let melon = TeamId::new("melon");
        let grants = MemoryAccessGrants::new().with_grant("c1", &melon);

        assert!(grants.holds("c1", &melon));
        assert!(!grants.holds("c1", &TeamId::new("weenor")));

        grants.grant("c2", &melon).unwrap();
        assert!(grants.holds("c2", &melon));

        grants.revoke("c1", &melon);
        assert!(!grants.holds("c1", &melon));
    }

    #[test]
    fn test_failed_delivery_is_swallowed() {
        deliver(&FailingNotifier, &Notification::SignupsImported { imported: 2 });
    }

    #[test]
    fn test_recording_and_tagged_payload() {
        let recorder = RecordingNotifier::new();
        let note = Notification::UserApproved {
            username: "Zezima".into(),
            team: TeamId::new("melon"),
            caller: "c1".into(),
        };
        deliver(&recorder, &note);
        assert!(LogNotifier.notify(&note).is_ok());

        assert_eq!(recorder.kinds(), vec!["user_approved"]);
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["kind"], "user_approved");
        assert_eq!(value["team"], "melon");
    }
}
