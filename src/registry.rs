// 🪪 Identity Registry - signup lifecycle: unprocessed → pending → approved
//
// Invariants:
// - a username (case-insensitive) lives in at most one place at a time
// - at most one pending entry per caller and per username
//
// Persisted shape:
//   { "<team>": { "<lowercased username>": UserRecord }, ...,
//     "unprocessed": [UnprocessedEntry], "pending": [PendingEntry] }

use crate::error::{BingoError, Result};
use crate::notify::AccessGrants;
use crate::store::JsonDocument;
use crate::teams::{TeamId, TeamRoster};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,

    /// Filled from the document key on load
    #[serde(default)]
    pub team: TeamId,

    #[serde(alias = "discordId")]
    pub external_id: String,

    #[serde(default)]
    pub approved: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnprocessedEntry {
    pub username: String,
    pub team: TeamId,

    /// Free-text timestamp from the signup source
    #[serde(default, alias = "timestamp")]
    pub source_timestamp: String,

    pub imported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    pub username: String,
    pub team: TeamId,

    #[serde(alias = "discordId")]
    pub external_id: String,

    /// RFC 3339 when written here; older documents carry the sheet timestamp
    pub submitted_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<String>,
}

/// Outcome of a successful `verify`
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// Unprocessed entry moved to pending
    Pending(PendingEntry),
    /// Approved record without its access grant, demoted back to pending
    ReapprovalNeeded(PendingEntry),
}

impl Verification {
    pub fn entry(&self) -> &PendingEntry {
        match self {
            Verification::Pending(entry) | Verification::ReapprovalNeeded(entry) => entry,
        }
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub unprocessed: Vec<UnprocessedEntry>,

    #[serde(default)]
    pub pending: Vec<PendingEntry>,

    /// team id → lowercased username → record
    #[serde(flatten)]
    pub teams: BTreeMap<String, BTreeMap<String, UserRecord>>,
}

fn key(username: &str) -> String {
    username.trim().to_lowercase()
}

impl RegistryDocument {
    /// Ensure every roster team has a map and every record knows its team
    fn normalize(&mut self, roster: &TeamRoster) {
        for team in roster.ids() {
            self.teams.entry(team.as_str().to_string()).or_default();
        }
        for (team, users) in self.teams.iter_mut() {
            for record in users.values_mut() {
                record.team = TeamId::new(team);
            }
        }
    }

    pub fn approved(&self, username: &str) -> Option<&UserRecord> {
        let wanted = key(username);
        self.teams.values().find_map(|users| users.get(&wanted))
    }

    fn take_approved(&mut self, username: &str) -> Option<UserRecord> {
        let wanted = key(username);
        let mut removed = None;
        for users in self.teams.values_mut() {
            if let Some(record) = users.remove(&wanted) {
                removed = Some(record);
            }
        }
        removed
    }

    pub fn unprocessed(&self, username: &str) -> Option<&UnprocessedEntry> {
        let wanted = key(username);
        self.unprocessed.iter().find(|u| key(&u.username) == wanted)
    }

    pub fn pending_for_caller(&self, caller: &str) -> Option<&PendingEntry> {
        self.pending.iter().find(|p| p.external_id == caller)
    }

    pub fn pending_for_username(&self, username: &str) -> Option<&PendingEntry> {
        let wanted = key(username);
        self.pending.iter().find(|p| key(&p.username) == wanted)
    }

    fn knows(&self, username: &str) -> bool {
        self.approved(username).is_some()
            || self.unprocessed(username).is_some()
            || self.pending_for_username(username).is_some()
    }
}

// ============================================================================
// BREAKDOWN
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamBreakdown {
    pub team: TeamId,
    pub approved: Vec<String>,
    pub pending: Vec<String>,
    pub unprocessed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryBreakdown {
    pub teams: Vec<TeamBreakdown>,
    pub total_approved: usize,
    pub total_pending: usize,
    pub total_unprocessed: usize,
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Registry backed by one JSON document; mutations are serialized
pub struct IdentityRegistry {
    document: JsonDocument,
    roster: TeamRoster,
    writer: Mutex<()>,
}

impl IdentityRegistry {
    pub fn new(path: impl Into<PathBuf>, roster: TeamRoster) -> Self {
        IdentityRegistry {
            document: JsonDocument::new(path),
            roster,
            writer: Mutex::new(()),
        }
    }

    pub fn roster(&self) -> &TeamRoster {
        &self.roster
    }

    /// Current document; a missing file is the empty default
    pub fn snapshot(&self) -> Result<RegistryDocument> {
        let mut doc: RegistryDocument = self.document.load_or_default()?;
        doc.normalize(&self.roster);
        Ok(doc)
    }

    /// Lock → load → mutate → save; nothing is written when `f` fails
    fn transact<R>(&self, f: impl FnOnce(&mut RegistryDocument) -> Result<R>) -> Result<R> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.snapshot()?;
        let out = f(&mut doc)?;
        self.document.save(&doc)?;
        Ok(out)
    }

    /// Import a signup; false when the username is already known anywhere
    pub fn import_unprocessed(
        &self,
        username: &str,
        team: &TeamId,
        source_timestamp: &str,
    ) -> Result<bool> {
        let username = username.trim();
        if username.is_empty() {
            return Err(BingoError::ValidationFailed("username is empty".to_string()));
        }
        if !self.roster.contains(team) {
            return Err(BingoError::InvalidTeam(team.to_string()));
        }

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.snapshot()?;
        if doc.knows(username) {
            tracing::debug!(username, "signup already known");
            return Ok(false);
        }

        doc.unprocessed.push(UnprocessedEntry {
            username: username.to_string(),
            team: team.clone(),
            source_timestamp: source_timestamp.to_string(),
            imported_at: Utc::now(),
        });
        self.document.save(&doc)?;

        tracing::info!(username, team = %team, "signup imported");
        Ok(true)
    }

    /// Claim a username for a caller
    pub fn verify(
        &self,
        username: &str,
        caller: &str,
        grants: &dyn AccessGrants,
    ) -> Result<Verification> {
        self.transact(|doc| {
            if let Some(record) = doc.approved(username).cloned() {
                if record.external_id != caller {
                    return Err(BingoError::IdentityConflict {
                        username: record.username,
                    });
                }
                if grants.holds(caller, &record.team) {
                    return Err(BingoError::AlreadyApproved(record.username));
                }
                // A second claim held by this caller must be approved or rejected first
                if let Some(existing) = doc.pending_for_caller(caller) {
                    return Err(BingoError::AlreadyPending {
                        username: existing.username.clone(),
                    });
                }

                tracing::warn!(
                    username = %record.username,
                    caller,
                    "approved user missing access grant, demoting to pending"
                );
                doc.take_approved(username);
                let entry = PendingEntry {
                    username: record.username,
                    team: record.team,
                    external_id: caller.to_string(),
                    submitted_at: Utc::now().to_rfc3339(),
                    source_timestamp: None,
                };
                doc.pending.push(entry.clone());
                return Ok(Verification::ReapprovalNeeded(entry));
            }

            if let Some(claimed) = doc.pending_for_username(username) {
                if claimed.external_id != caller {
                    return Err(BingoError::IdentityConflict {
                        username: claimed.username.clone(),
                    });
                }
            }

            if let Some(existing) = doc.pending_for_caller(caller) {
                return Err(BingoError::AlreadyPending {
                    username: existing.username.clone(),
                });
            }

            let wanted = key(username);
            let index = doc
                .unprocessed
                .iter()
                .position(|u| key(&u.username) == wanted)
                .ok_or_else(|| BingoError::NotFound(format!("signup for \"{}\"", username.trim())))?;

            let signup = doc.unprocessed.remove(index);
            let entry = PendingEntry {
                username: signup.username,
                team: signup.team,
                external_id: caller.to_string(),
                submitted_at: Utc::now().to_rfc3339(),
                source_timestamp: Some(signup.source_timestamp),
            };
            doc.pending.push(entry.clone());

            tracing::info!(username = %entry.username, caller, "verification pending");
            Ok(Verification::Pending(entry))
        })
    }

    /// Promote the caller's pending entry to an approved record
    pub fn approve(&self, caller: &str) -> Result<UserRecord> {
        self.transact(|doc| {
            let index = doc
                .pending
                .iter()
                .position(|p| p.external_id == caller)
                .ok_or_else(|| BingoError::NotFound(format!("pending verification for {}", caller)))?;

            let team = doc.pending[index].team.clone();
            if !self.roster.contains(&team) {
                return Err(BingoError::InvalidTeam(team.to_string()));
            }

            let entry = doc.pending.remove(index);
            doc.take_approved(&entry.username);
            let wanted = key(&entry.username);
            doc.unprocessed.retain(|u| key(&u.username) != wanted);

            let record = UserRecord {
                username: entry.username,
                team: team.clone(),
                external_id: entry.external_id,
                approved: true,
                approved_at: Some(Utc::now()),
            };
            doc.teams
                .entry(team.as_str().to_string())
                .or_default()
                .insert(wanted, record.clone());

            tracing::info!(username = %record.username, team = %team, "user approved");
            Ok(record)
        })
    }

    /// Drop the caller's pending claim; the username returns to unprocessed
    pub fn reject(&self, caller: &str) -> Result<PendingEntry> {
        self.transact(|doc| {
            let index = doc
                .pending
                .iter()
                .position(|p| p.external_id == caller)
                .ok_or_else(|| BingoError::NotFound(format!("pending verification for {}", caller)))?;

            let entry = doc.pending.remove(index);
            if doc.unprocessed(&entry.username).is_none() {
                doc.unprocessed.push(UnprocessedEntry {
                    username: entry.username.clone(),
                    team: entry.team.clone(),
                    source_timestamp: entry
                        .source_timestamp
                        .clone()
                        .unwrap_or_else(|| entry.submitted_at.clone()),
                    imported_at: Utc::now(),
                });
            }

            tracing::info!(username = %entry.username, caller, "verification rejected");
            Ok(entry)
        })
    }

    pub fn remove_user(&self, username: &str) -> Result<UserRecord> {
        self.transact(|doc| {
            let record = doc
                .take_approved(username)
                .ok_or_else(|| BingoError::NotFound(format!("user \"{}\"", username.trim())))?;
            tracing::info!(username = %record.username, team = %record.team, "user removed");
            Ok(record)
        })
    }

    // ========================================================================
    // LOOKUPS (pure reads)
    // ========================================================================

    pub fn find_by_external_id(&self, caller: &str) -> Result<Option<UserRecord>> {
        let doc = self.snapshot()?;
        Ok(doc
            .teams
            .values()
            .flat_map(|users| users.values())
            .find(|r| r.external_id == caller)
            .cloned())
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.snapshot()?.approved(username).cloned())
    }

    pub fn find_pending(&self, caller: &str) -> Result<Option<PendingEntry>> {
        Ok(self.snapshot()?.pending_for_caller(caller).cloned())
    }

    pub fn find_unprocessed(&self, username: &str) -> Result<Option<UnprocessedEntry>> {
        Ok(self.snapshot()?.unprocessed(username).cloned())
    }

    pub fn pending(&self) -> Result<Vec<PendingEntry>> {
        Ok(self.snapshot()?.pending)
    }

    /// Per-team approved / pending / unprocessed usernames
    pub fn breakdown(&self) -> Result<RegistryBreakdown> {
        let doc = self.snapshot()?;
        let mut report = RegistryBreakdown::default();

        for team in self.roster.ids() {
            let approved: Vec<String> = doc
                .teams
                .get(team.as_str())
                .map(|users| users.values().map(|r| r.username.clone()).collect())
                .unwrap_or_default();
            let pending: Vec<String> = doc
                .pending
                .iter()
                .filter(|p| p.team == team)
                .map(|p| p.username.clone())
                .collect();
            let unprocessed: Vec<String> = doc
                .unprocessed
                .iter()
                .filter(|u| u.team == team)
                .map(|u| u.username.clone())
                .collect();

            report.total_approved += approved.len();
            report.total_pending += pending.len();
            report.total_unprocessed += unprocessed.len();
            report.teams.push(TeamBreakdown {
                team,
                approved,
                pending,
                unprocessed,
            });
        }

        Ok(report)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryAccessGrants;
    use tempfile::TempDir;

    fn registry(dir: &TempDir) -> IdentityRegistry {
        IdentityRegistry::new(dir.path().join("users.json"), TeamRoster::default())
    }

    fn melon() -> TeamId {
        TeamId::new("melon")
    }

    #[test]
    fn test_missing_file_is_empty_default() {
        let dir = TempDir::new().unwrap();
        let doc = registry(&dir).snapshot().unwrap();

        assert!(doc.unprocessed.is_empty());
        assert!(doc.pending.is_empty());
        assert!(doc.teams["melon"].is_empty());
        assert!(doc.teams["weenor"].is_empty());
    }

    #[test]
    fn test_zezima_signup_lifecycle() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let grants = MemoryAccessGrants::new();

        let team = registry.roster().detect("melon bingo").unwrap();
        assert!(registry.import_unprocessed("Zezima", &team, "10/1/2025 12:00:00").unwrap());
        let doc = registry.snapshot().unwrap();
        assert_eq!(doc.unprocessed.len(), 1);
        assert_eq!(doc.unprocessed[0].username, "Zezima");
        assert_eq!(doc.unprocessed[0].team, melon());

        let verification = registry.verify("Zezima", "C1", &grants).unwrap();
        let pending = match verification {
            Verification::Pending(entry) => entry,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(pending.username, "Zezima");
        assert_eq!(pending.team, melon());
        assert_eq!(pending.external_id, "C1");
        assert!(registry.find_unprocessed("zezima").unwrap().is_none());

        let record = registry.approve("C1").unwrap();
        assert_eq!(record.username, "Zezima");
        assert_eq!(record.team, melon());
        assert!(record.approved);
        assert!(record.approved_at.is_some());
        assert!(registry.find_pending("C1").unwrap().is_none());

        let doc = registry.snapshot().unwrap();
        assert!(doc.teams["melon"].contains_key("zezima"));
        assert_eq!(registry.find_by_external_id("C1").unwrap().unwrap().username, "Zezima");
    }

    #[test]
    fn test_double_import_any_casing() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        assert!(registry.import_unprocessed("Zezima", &melon(), "t1").unwrap());
        assert!(!registry.import_unprocessed("ZEZIMA", &melon(), "t2").unwrap());
        assert!(!registry.import_unprocessed(" zezima ", &TeamId::new("weenor"), "t3").unwrap());

        assert_eq!(registry.snapshot().unwrap().unprocessed.len(), 1);
    }

    #[test]
    fn test_import_rejects_unknown_team() {
        let dir = TempDir::new().unwrap();
        let result = registry(&dir).import_unprocessed("Zezima", &TeamId::new("banana"), "t");
        assert!(matches!(result, Err(BingoError::InvalidTeam(_))));
    }

    #[test]
    fn test_verify_unknown_username() {
        let dir = TempDir::new().unwrap();
        let result = registry(&dir).verify("Nobody", "C1", &MemoryAccessGrants::new());
        assert!(matches!(result, Err(BingoError::NotFound(_))));
    }

    #[test]
    fn test_verify_already_pending() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let grants = MemoryAccessGrants::new();
        registry.import_unprocessed("Zezima", &melon(), "t").unwrap();
        registry.import_unprocessed("Lynx Titan", &melon(), "t").unwrap();

        registry.verify("Zezima", "C1", &grants).unwrap();
        let result = registry.verify("Lynx Titan", "C1", &grants);
        assert!(matches!(result, Err(BingoError::AlreadyPending { ref username }) if username == "Zezima"));
        assert!(registry.find_unprocessed("Lynx Titan").unwrap().is_some());
    }

    #[test]
    fn test_verify_pending_username_claimed_by_other_caller() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let grants = MemoryAccessGrants::new();
        registry.import_unprocessed("Zezima", &melon(), "t").unwrap();

        registry.verify("Zezima", "C1", &grants).unwrap();
        let result = registry.verify("zezima", "C2", &grants);
        assert!(matches!(result, Err(BingoError::IdentityConflict { .. })));
    }

    #[test]
    fn test_reapproval_requires_same_caller() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let grants = MemoryAccessGrants::new();
        registry.import_unprocessed("Zezima", &melon(), "t").unwrap();
        registry.verify("Zezima", "C1", &grants).unwrap();
        registry.approve("C1").unwrap();

        // C2 lacks the role too, but the record belongs to C1
        let result = registry.verify("Zezima", "C2", &grants);
        assert!(matches!(result, Err(BingoError::IdentityConflict { .. })));
        assert_eq!(registry.find_by_username("Zezima").unwrap().unwrap().external_id, "C1");
        assert!(registry.find_pending("C2").unwrap().is_none());
    }

    #[test]
    fn test_verify_approved_with_grant() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let grants = MemoryAccessGrants::new().with_grant("C1", &melon());
        registry.import_unprocessed("Zezima", &melon(), "t").unwrap();
        registry.verify("Zezima", "C1", &grants).unwrap();
        registry.approve("C1").unwrap();

        let result = registry.verify("Zezima", "C1", &grants);
        assert!(matches!(result, Err(BingoError::AlreadyApproved(_))));
    }

    #[test]
    fn test_verify_approved_missing_grant_demotes() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let grants = MemoryAccessGrants::new();
        registry.import_unprocessed("Zezima", &melon(), "t").unwrap();
        registry.verify("Zezima", "C1", &grants).unwrap();
        registry.approve("C1").unwrap();

        let verification = registry.verify("ZEZIMA", "C1", &grants).unwrap();
        assert!(matches!(verification, Verification::ReapprovalNeeded(_)));
        assert_eq!(verification.entry().team, melon());

        assert!(registry.find_by_username("Zezima").unwrap().is_none());
        assert_eq!(registry.find_pending("C1").unwrap().unwrap().username, "Zezima");

        registry.approve("C1").unwrap();
        assert!(registry.find_by_username("zezima").unwrap().is_some());
    }

    #[test]
    fn test_reapproval_keeps_other_pending_claim() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let grants = MemoryAccessGrants::new();
        registry.import_unprocessed("Zezima", &melon(), "t").unwrap();
        registry.import_unprocessed("Lynx Titan", &melon(), "t").unwrap();
        registry.verify("Zezima", "C1", &grants).unwrap();
        registry.approve("C1").unwrap();
        registry.verify("Lynx Titan", "C1", &grants).unwrap();

        let result = registry.verify("Zezima", "C1", &grants);
        assert!(matches!(
            result,
            Err(BingoError::AlreadyPending { ref username }) if username == "Lynx Titan"
        ));
        assert!(registry.find_by_username("Zezima").unwrap().is_some());
        assert_eq!(registry.find_pending("C1").unwrap().unwrap().username, "Lynx Titan");

        registry.reject("C1").unwrap();
        assert!(matches!(
            registry.verify("Lynx Titan", "C9", &grants).unwrap(),
            Verification::Pending(_)
        ));
    }

    #[test]
    fn test_concurrent_imports_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let registry = std::sync::Arc::new(registry(&dir));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry
                        .import_unprocessed(&format!("Player {}", i), &melon(), "t")
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let doc = registry.snapshot().unwrap();
        assert_eq!(doc.unprocessed.len(), 8);
        for i in 0..8 {
            assert!(doc.unprocessed(&format!("player {}", i)).is_some());
        }
    }

    #[test]
    fn test_approve_without_pending() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(registry(&dir).approve("C9"), Err(BingoError::NotFound(_))));
    }

    #[test]
    fn test_reject_returns_signup() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let grants = MemoryAccessGrants::new();
        registry.import_unprocessed("Zezima", &melon(), "10/1/2025").unwrap();
        registry.verify("Zezima", "IMPOSTER", &grants).unwrap();

        let rejected = registry.reject("IMPOSTER").unwrap();
        assert_eq!(rejected.username, "Zezima");

        let back = registry.find_unprocessed("Zezima").unwrap().unwrap();
        assert_eq!(back.source_timestamp, "10/1/2025");
        assert!(matches!(registry.verify("Zezima", "C1", &grants).unwrap(), Verification::Pending(_)));
    }

    #[test]
    fn test_remove_user() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        registry.import_unprocessed("Zezima", &melon(), "t").unwrap();
        registry.verify("Zezima", "C1", &MemoryAccessGrants::new()).unwrap();
        registry.approve("C1").unwrap();

        assert_eq!(registry.remove_user("zezima").unwrap().username, "Zezima");
        assert!(matches!(registry.remove_user("zezima"), Err(BingoError::NotFound(_))));
    }

    #[test]
    fn test_legacy_document_loads() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("users.json"),
            r#"{
                "melon": {
                    "zezima": { "username": "Zezima", "discordId": "111", "approved": true,
                                "approvedAt": "2025-10-01T12:00:00.000Z" }
                },
                "weenor": {},
                "unprocessed": [
                    { "username": "Lynx Titan", "team": "weenor", "timestamp": "10/2/2025 9:00:00",
                      "importedAt": "2025-10-02T09:00:00.000Z" }
                ],
                "pending": [
                    { "username": "B0aty", "team": "melon", "discordId": "222",
                      "submittedAt": "10/3/2025 8:00:00" }
                ]
            }"#,
        )
        .unwrap();

        let registry = registry(&dir);
        let record = registry.find_by_external_id("111").unwrap().unwrap();
        assert_eq!(record.team, melon());
        assert_eq!(
            registry.find_unprocessed("lynx titan").unwrap().unwrap().source_timestamp,
            "10/2/2025 9:00:00"
        );
        assert_eq!(registry.find_pending("222").unwrap().unwrap().username, "B0aty");
    }

    #[test]
    fn test_breakdown() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let grants = MemoryAccessGrants::new();
        let weenor = TeamId::new("weenor");
        registry.import_unprocessed("Zezima", &melon(), "t").unwrap();
        registry.import_unprocessed("Lynx Titan", &weenor, "t").unwrap();
        registry.import_unprocessed("B0aty", &weenor, "t").unwrap();
        registry.verify("Zezima", "C1", &grants).unwrap();
        registry.approve("C1").unwrap();
        registry.verify("B0aty", "C2", &grants).unwrap();

        let report = registry.breakdown().unwrap();
        assert_eq!(report.total_approved, 1);
        assert_eq!(report.total_pending, 1);
        assert_eq!(report.total_unprocessed, 1);
        assert_eq!(report.teams[0].team, melon());
        assert_eq!(report.teams[0].approved, vec!["Zezima".to_string()]);
        assert_eq!(report.teams[1].pending, vec!["B0aty".to_string()]);
    }
}
