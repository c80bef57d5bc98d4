// 📝 Signup Service - feed sync and the verify/approve glue around the registry
//
// The registry owns the state machine. This layer adds the side effects:
// access grants, processed marks on the feed, notifications, journal events.
// Side-effect failures are logged and never undo a registry transition.

use crate::error::Result;
use crate::feed::SignupFeed;
use crate::journal::{self, Event, Journal};
use crate::notify::{deliver, AccessGrants, Notification, Notifier};
use crate::registry::{IdentityRegistry, PendingEntry, UserRecord, Verification};
use crate::teams::TeamId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSignup {
    pub username: String,
    pub team: TeamId,
}

/// What one sync pass did with each feed row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub imported: usize,
    pub already_known: usize,
    pub unpaid: usize,
    pub unknown_team: usize,
    pub invalid: usize,
    pub new_signups: Vec<NewSignup>,
}

pub struct SignupService {
    registry: Arc<IdentityRegistry>,
    grants: Arc<dyn AccessGrants>,
    notifier: Arc<dyn Notifier>,
    journal: Arc<Journal>,
    feed: Option<Arc<dyn SignupFeed>>,
    paid_marker: String,
}

impl SignupService {
    pub fn new(
        registry: Arc<IdentityRegistry>,
        grants: Arc<dyn AccessGrants>,
        notifier: Arc<dyn Notifier>,
        journal: Arc<Journal>,
    ) -> Self {
        SignupService {
            registry,
            grants,
            notifier,
            journal,
            feed: None,
            paid_marker: "paid".to_string(),
        }
    }

    pub fn with_feed(mut self, feed: Arc<dyn SignupFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_paid_marker(mut self, marker: &str) -> Self {
        self.paid_marker = marker.to_string();
        self
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Import every eligible feed row into the unprocessed list
    pub fn sync(&self, feed: &dyn SignupFeed) -> Result<SyncReport> {
        let roster = self.registry.roster();
        let mut report = SyncReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for row in feed.form_responses()? {
            let username = row.username.trim();
            if username.is_empty() {
                tracing::debug!(row = row.row_index, "skipping row without username");
                report.invalid += 1;
                continue;
            }
            // Processed marks are bookkeeping; the registry decides what is known
            if seen.contains(&username.to_lowercase()) {
                report.already_known += 1;
                continue;
            }

            let team = match roster.detect(&row.team_text) {
                Some(team) => team,
                None => {
                    tracing::debug!(username, team_text = %row.team_text, "skipping non-team row");
                    report.unknown_team += 1;
                    continue;
                }
            };

            if !row.is_paid(&self.paid_marker) {
                tracing::debug!(username, paid = %row.paid, "skipping unpaid signup");
                report.unpaid += 1;
                continue;
            }
            seen.insert(username.to_lowercase());

            if self.registry.import_unprocessed(username, &team, &row.timestamp)? {
                report.imported += 1;
                report.new_signups.push(NewSignup {
                    username: username.to_string(),
                    team: team.clone(),
                });
                self.journal.append(Event::new(
                    journal::SIGNUP_IMPORTED,
                    "user",
                    &username.to_lowercase(),
                    serde_json::json!({ "team": team, "source_timestamp": row.timestamp }),
                    "sync",
                ));
            } else {
                report.already_known += 1;
            }
        }

        if report.imported > 0 {
            deliver(
                self.notifier.as_ref(),
                &Notification::SignupsImported {
                    imported: report.imported,
                },
            );
        }

        tracing::info!(
            imported = report.imported,
            already_known = report.already_known,
            unpaid = report.unpaid,
            unknown_team = report.unknown_team,
            invalid = report.invalid,
            "signup sync complete"
        );
        Ok(report)
    }

    /// Sync from the configured feed
    pub fn sync_configured(&self) -> Result<SyncReport> {
        match &self.feed {
            Some(feed) => self.sync(feed.as_ref()),
            None => Err(crate::error::BingoError::NotFound(
                "signup feed not configured".to_string(),
            )),
        }
    }

    pub fn verify(&self, username: &str, caller: &str) -> Result<Verification> {
        let verification = self.registry.verify(username, caller, self.grants.as_ref())?;
        let entry = verification.entry().clone();

        let (event_type, notification) = match verification {
            Verification::Pending(_) => (
                journal::VERIFICATION_PENDING,
                Notification::VerificationPending {
                    username: entry.username.clone(),
                    team: entry.team.clone(),
                    caller: caller.to_string(),
                },
            ),
            Verification::ReapprovalNeeded(_) => (
                journal::REAPPROVAL_NEEDED,
                Notification::ReapprovalNeeded {
                    username: entry.username.clone(),
                    team: entry.team.clone(),
                    caller: caller.to_string(),
                },
            ),
        };

        self.journal.append(Event::new(
            event_type,
            "user",
            &entry.username.to_lowercase(),
            serde_json::json!({ "team": entry.team, "caller": caller }),
            caller,
        ));
        deliver(self.notifier.as_ref(), &notification);
        Ok(verification)
    }

    /// Approve the caller's pending claim, then grant access and mark the feed row
    pub fn approve_user(&self, caller: &str, admin: &str) -> Result<UserRecord> {
        let record = self.registry.approve(caller)?;

        if let Err(e) = self.grants.grant(caller, &record.team) {
            tracing::warn!(caller, team = %record.team, error = %e, "access grant failed");
        }
        self.mark_feed_row(&record);

        self.journal.append(Event::new(
            journal::USER_APPROVED,
            "user",
            &record.username.to_lowercase(),
            serde_json::json!({ "team": record.team, "caller": caller }),
            admin,
        ));
        deliver(
            self.notifier.as_ref(),
            &Notification::UserApproved {
                username: record.username.clone(),
                team: record.team.clone(),
                caller: caller.to_string(),
            },
        );
        Ok(record)
    }

    pub fn reject_user(&self, caller: &str, admin: &str) -> Result<PendingEntry> {
        let entry = self.registry.reject(caller)?;
        self.journal.append(Event::new(
            journal::USER_REJECTED,
            "user",
            &entry.username.to_lowercase(),
            serde_json::json!({ "team": entry.team, "caller": caller }),
            admin,
        ));
        Ok(entry)
    }

    fn mark_feed_row(&self, record: &UserRecord) {
        let Some(feed) = &self.feed else {
            return;
        };
        let roster = self.registry.roster();
        let wanted = record.username.to_lowercase();

        let rows = match feed.form_responses() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "could not read signup feed to mark row processed");
                return;
            }
        };

        let row = rows.iter().find(|row| {
            row.username.trim().to_lowercase() == wanted
                && roster.detect(&row.team_text).as_ref() == Some(&record.team)
        });
        match row {
            Some(row) => {
                if let Err(e) = feed.mark_processed(row.row_index) {
                    tracing::warn!(row = row.row_index, error = %e, "could not mark signup processed");
                }
            }
            None => tracing::debug!(username = %record.username, "no feed row for approved user"),
        }
    }
}
