// 🏹 Submission Workflow - caller + free text → recorded submission → approval
//
// Matching, eligibility and the append happen inside one board update, so
// the tile a caller is checked against is the tile the submission lands on.

use crate::board::{Submission, TileProgress};
use crate::engine::{ApprovalResult, BingoEngine, PendingSubmission};
use crate::error::{BingoError, Result};
use crate::journal::{self, Event, Journal};
use crate::matcher::{MatchConfidence, ScoredItem};
use crate::notify::{deliver, Notification, Notifier};
use crate::registry::IdentityRegistry;
use crate::teams::TeamId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// "sub_<millis>_<9 random chars>"
pub fn generate_submission_id() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("sub_{}_{}", Utc::now().timestamp_millis(), &random[..9])
}

/// What the caller gets back after submitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub team: TeamId,
    pub coordinate: String,
    pub submission: Submission,
    pub confidence: MatchConfidence,
    /// Near misses to show a reviewer alongside a fuzzy match
    pub alternates: Vec<ScoredItem<String>>,
    pub tile_points: i64,
    pub tile_description: String,
    pub progress: TileProgress,
}

impl SubmissionReceipt {
    pub fn needs_review(&self) -> bool {
        self.confidence.needs_review()
    }
}

/// Approval result plus its location and the score delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub team: TeamId,
    pub coordinate: String,
    pub result: ApprovalResult,
    pub points_delta: i64,
}

pub struct SubmissionWorkflow {
    registry: Arc<IdentityRegistry>,
    engine: Arc<BingoEngine>,
    notifier: Arc<dyn Notifier>,
    journal: Arc<Journal>,
}

impl SubmissionWorkflow {
    pub fn new(
        registry: Arc<IdentityRegistry>,
        engine: Arc<BingoEngine>,
        notifier: Arc<dyn Notifier>,
        journal: Arc<Journal>,
    ) -> Self {
        SubmissionWorkflow {
            registry,
            engine,
            notifier,
            journal,
        }
    }

    pub fn engine(&self) -> &BingoEngine {
        &self.engine
    }

    /// Resolve the caller, match the text, check the tile, record
    pub fn submit(&self, caller: &str, text: &str, attachment_ref: &str) -> Result<SubmissionReceipt> {
        let user = self
            .registry
            .find_by_external_id(caller)?
            .ok_or_else(|| BingoError::NotFound(format!("approved user for caller {}", caller)))?;
        let team = user.team.clone();
        let matcher = self.engine.matcher();

        let receipt = self.engine.update(&team, |board| {
            let found = board.find_tile_for_item(matcher, text);
            let found = matcher.accept(text, found)?;
            let coordinate = found.best.key.clone();

            let tile = board.tile_mut(&coordinate)?;
            tile.can_submit(&found.best.item, caller)?;

            let submission = Submission {
                id: generate_submission_id(),
                item_name: found.best.item.clone(),
                original_input: text.trim().to_string(),
                similarity: found.similarity(),
                submitted_by: caller.to_string(),
                submitter_rsn: user.username.clone(),
                attachment_ref: attachment_ref.to_string(),
                timestamp: Utc::now(),
                approved: false,
            };
            tile.submissions.push(submission.clone());

            Ok(SubmissionReceipt {
                team: team.clone(),
                coordinate,
                submission,
                confidence: matcher.confidence(found.similarity()),
                alternates: found.alternates,
                tile_points: tile.points,
                tile_description: tile.describe(),
                progress: tile.progress(),
            })
        })?;

        tracing::info!(
            team = %team,
            coordinate = %receipt.coordinate,
            id = %receipt.submission.id,
            item = %receipt.submission.item_name,
            similarity = receipt.submission.similarity,
            "submission recorded"
        );

        self.journal.append(Event::new(
            journal::SUBMISSION_RECORDED,
            "submission",
            &receipt.submission.id,
            serde_json::json!({
                "team": team,
                "coordinate": receipt.coordinate,
                "item": receipt.submission.item_name,
                "input": receipt.submission.original_input,
                "similarity": receipt.submission.similarity,
            }),
            caller,
        ));
        deliver(
            self.notifier.as_ref(),
            &Notification::SubmissionRecorded {
                submission_id: receipt.submission.id.clone(),
                team: team.clone(),
                coordinate: receipt.coordinate.clone(),
                item_name: receipt.submission.item_name.clone(),
                submitter: user.username,
                similarity: receipt.submission.similarity,
                needs_review: receipt.needs_review(),
            },
        );

        Ok(receipt)
    }

    /// Approve by id alone; the submission is located across teams
    pub fn approve(&self, submission_id: &str, admin: &str) -> Result<ApprovalOutcome> {
        let (team, coordinate) = self
            .engine
            .find_submission(submission_id)?
            .ok_or_else(|| BingoError::NotFound(format!("submission {}", submission_id)))?;

        let result = self.engine.approve_submission(&team, &coordinate, submission_id)?;
        let outcome = ApprovalOutcome {
            points_delta: result.points_awarded,
            team,
            coordinate,
            result,
        };

        self.journal.append(Event::new(
            journal::SUBMISSION_APPROVED,
            "submission",
            submission_id,
            serde_json::json!({
                "team": outcome.team,
                "coordinate": outcome.coordinate,
                "progress": outcome.result.progress.description,
                "points_delta": outcome.points_delta,
            }),
            admin,
        ));
        if outcome.result.tile_completed {
            self.journal.append(Event::new(
                journal::TILE_COMPLETED,
                "tile",
                &format!("{}/{}", outcome.team, outcome.coordinate),
                serde_json::json!({
                    "points": outcome.points_delta,
                    "total_points": outcome.result.new_total_points,
                }),
                admin,
            ));
        }

        let submission = &outcome.result.submission;
        deliver(
            self.notifier.as_ref(),
            &Notification::SubmissionApproved {
                submission_id: submission.id.clone(),
                team: outcome.team.clone(),
                coordinate: outcome.coordinate.clone(),
                item_name: submission.item_name.clone(),
                submitter: submission.submitter_rsn.clone(),
                progress: outcome.result.progress.clone(),
                tile_completed: outcome.result.tile_completed,
                points_delta: outcome.points_delta,
                total_points: outcome.result.new_total_points,
            },
        );

        Ok(outcome)
    }

    pub fn pending(&self) -> Result<Vec<PendingSubmission>> {
        self.engine.list_pending_submissions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, RequirementType, Tile};
    use crate::config::MatchSettings;
    use crate::notify::{MemoryAccessGrants, RecordingNotifier};
    use crate::teams::TeamRoster;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        workflow: SubmissionWorkflow,
        notifier: Arc<RecordingNotifier>,
        journal: Arc<Journal>,
    }

    fn melon() -> TeamId {
        TeamId::new("melon")
    }

    fn board() -> Board {
        let mut board = Board::default();
        board.tiles.insert(
            "a1".into(),
            Tile::new("a1", 5, RequirementType::Single, vec!["Twisted bow".into()], 1),
        );
        board.tiles.insert(
            "b2".into(),
            Tile::new("b2", 10, RequirementType::MultipleSame, vec!["Dragon Bone".into()], 3),
        );
        board.tiles.insert(
            "c3".into(),
            Tile::new(
                "c3",
                8,
                RequirementType::AllDifferent,
                vec!["Rune Axe".into(), "Rune Pickaxe".into()],
                2,
            ),
        );
        board
    }

    fn approve_user(registry: &IdentityRegistry, username: &str, caller: &str) {
        registry.import_unprocessed(username, &melon(), "t").unwrap();
        registry.verify(username, caller, &MemoryAccessGrants::new()).unwrap();
        registry.approve(caller).unwrap();
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let roster = TeamRoster::default();
        let registry = Arc::new(IdentityRegistry::new(dir.path().join("users.json"), roster.clone()));
        let engine = Arc::new(BingoEngine::with_roster(dir.path(), roster, &MatchSettings::default()));
        engine.install_board(&melon(), &board()).unwrap();

        approve_user(&registry, "Zezima", "c1");
        approve_user(&registry, "Lynx Titan", "c2");

        let notifier = Arc::new(RecordingNotifier::new());
        let journal = Arc::new(Journal::in_memory().unwrap());
        let workflow = SubmissionWorkflow::new(registry, engine, notifier.clone(), journal.clone());

        Fixture {
            _dir: dir,
            workflow,
            notifier,
            journal,
        }
    }

    #[test]
    fn test_submission_id_shape() {
        let id = generate_submission_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "sub");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(id, generate_submission_id());
    }

    #[test]
    fn test_unknown_caller() {
        let fx = fixture();
        let result = fx.workflow.submit("stranger", "twisted bow", "shot.png");
        assert!(matches!(result, Err(BingoError::NotFound(_))));
    }

    #[test]
    fn test_exact_submit_and_approve() {
        let fx = fixture();
        let receipt = fx.workflow.submit("c1", "  TWISTED BOW ", "shot.png").unwrap();

        assert_eq!(receipt.coordinate, "a1");
        assert_eq!(receipt.submission.item_name, "Twisted bow");
        assert_eq!(receipt.submission.original_input, "TWISTED BOW");
        assert_eq!(receipt.submission.submitter_rsn, "Zezima");
        assert_eq!(receipt.confidence, MatchConfidence::Exact);
        assert!(!receipt.needs_review());

        let outcome = fx.workflow.approve(&receipt.submission.id, "admin").unwrap();
        assert_eq!(outcome.team, melon());
        assert!(outcome.result.tile_completed);
        assert_eq!(outcome.points_delta, 5);
        assert_eq!(outcome.result.new_total_points, 5);

        assert_eq!(
            fx.notifier.kinds(),
            vec!["submission_recorded", "submission_approved"]
        );
        assert_eq!(fx.journal.count(journal::TILE_COMPLETED).unwrap(), 1);
        assert_eq!(
            fx.journal.events_for("submission", &receipt.submission.id).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_fuzzy_match_needs_review() {
        let fx = fixture();
        let receipt = fx.workflow.submit("c1", "dragon bones", "shot.png").unwrap();

        assert_eq!(receipt.coordinate, "b2");
        assert_eq!(receipt.submission.item_name, "Dragon Bone");
        assert!(receipt.needs_review());
        assert!(matches!(
            fx.notifier.sent()[0],
            Notification::SubmissionRecorded { needs_review: true, .. }
        ));
    }

    #[test]
    fn test_no_match() {
        let fx = fixture();
        let result = fx.workflow.submit("c1", "cabbage", "shot.png");
        assert!(matches!(result, Err(BingoError::NoMatch { .. })));
        assert!(fx.workflow.pending().unwrap().is_empty());
    }

    #[test]
    fn test_same_caller_same_item_rejected() {
        let fx = fixture();
        fx.workflow.submit("c1", "Rune Axe", "1.png").unwrap();

        let again = fx.workflow.submit("c1", "rune axe", "2.png");
        assert!(matches!(again, Err(BingoError::ValidationFailed(ref m)) if m.contains("already submitted")));

        // another caller, or another item, is fine
        fx.workflow.submit("c2", "rune axe", "3.png").unwrap();
        fx.workflow.submit("c1", "rune pickaxe", "4.png").unwrap();
        assert_eq!(fx.workflow.pending().unwrap().len(), 3);
    }

    #[test]
    fn test_completed_tile_rejects_submissions() {
        let fx = fixture();
        let receipt = fx.workflow.submit("c1", "twisted bow", "1.png").unwrap();
        fx.workflow.approve(&receipt.submission.id, "admin").unwrap();

        let late = fx.workflow.submit("c2", "twisted bow", "2.png");
        assert!(matches!(late, Err(BingoError::ValidationFailed(ref m)) if m == "Tile already completed"));
    }

    #[test]
    fn test_all_different_needs_distinct_items() {
        let fx = fixture();
        let first = fx.workflow.submit("c1", "rune axe", "1.png").unwrap();
        let dup = fx.workflow.submit("c2", "Rune Axe", "2.png").unwrap();
        let other = fx.workflow.submit("c2", "rune pickaxe", "3.png").unwrap();

        let a = fx.workflow.approve(&first.submission.id, "admin").unwrap();
        let b = fx.workflow.approve(&dup.submission.id, "admin").unwrap();
        assert_eq!(a.result.progress.description, "1/2");
        assert_eq!(b.result.progress.description, "1/2");
        assert_eq!(b.points_delta, 0);

        let c = fx.workflow.approve(&other.submission.id, "admin").unwrap();
        assert!(c.result.tile_completed);
        assert_eq!(c.points_delta, 8);
    }

    #[test]
    fn test_approve_unknown_and_twice() {
        let fx = fixture();
        assert!(matches!(
            fx.workflow.approve("sub_missing", "admin"),
            Err(BingoError::NotFound(_))
        ));

        let receipt = fx.workflow.submit("c1", "dragon bone", "1.png").unwrap();
        fx.workflow.approve(&receipt.submission.id, "admin").unwrap();
        assert!(matches!(
            fx.workflow.approve(&receipt.submission.id, "admin"),
            Err(BingoError::AlreadyApproved(_))
        ));
    }
}
