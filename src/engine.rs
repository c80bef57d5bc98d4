// 🎲 Bingo Engine - persistent board operations, one writer per team
//
// Every mutation is lock → load → mutate → save under the team's mutex, so
// two interleaved approvals on the same board can't lose each other's
// writes. Boards are re-read from disk on every call.

use crate::board::{Board, BoardSummary, ObtainedItem, SearchHit, Submission, Tile, TileMatch, TileProgress};
use crate::config::{MatchSettings, Settings};
use crate::error::{BingoError, Result};
use crate::matcher::Matcher;
use crate::store::JsonDocument;
use crate::teams::{TeamId, TeamRoster};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

// ============================================================================
// INPUT / OUTPUT
// ============================================================================

/// Everything needed to append a submission to a tile
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub id: String,
    pub item_name: String,
    pub original_input: String,
    pub similarity: f64,
    pub submitted_by: String,
    pub submitter_rsn: String,
    pub attachment_ref: String,
    pub timestamp: DateTime<Utc>,
}

impl NewSubmission {
    fn into_submission(self) -> Submission {
        Submission {
            id: self.id,
            item_name: self.item_name,
            original_input: self.original_input,
            similarity: self.similarity,
            submitted_by: self.submitted_by,
            submitter_rsn: self.submitter_rsn,
            attachment_ref: self.attachment_ref,
            timestamp: self.timestamp,
            approved: false,
        }
    }
}

/// Result of the single score state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResult {
    pub submission: Submission,
    pub progress: TileProgress,
    /// True only on the approval that flipped the tile to completed
    pub tile_completed: bool,
    /// Points added to the board by this approval (0 or tile points)
    pub points_awarded: i64,
    pub new_total_points: i64,
}

/// One unapproved submission, with its location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSubmission {
    pub team: TeamId,
    pub coordinate: String,
    pub submission: Submission,
    pub tile: Tile,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct BingoEngine {
    data_dir: PathBuf,
    roster: TeamRoster,
    matcher: Matcher,
    search_threshold: f64,
    search_limit: usize,
    writers: HashMap<TeamId, Mutex<()>>,
}

impl BingoEngine {
    pub fn new(settings: &Settings) -> Self {
        Self::with_roster(&settings.data_dir, settings.roster(), &settings.matching)
    }

    pub fn with_roster(data_dir: &Path, roster: TeamRoster, matching: &MatchSettings) -> Self {
        let writers = roster
            .ids()
            .into_iter()
            .map(|team| (team, Mutex::new(())))
            .collect();

        BingoEngine {
            data_dir: data_dir.to_path_buf(),
            roster,
            matcher: Matcher::from_settings(matching),
            search_threshold: matching.search_threshold,
            search_limit: matching.search_limit,
            writers,
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn roster(&self) -> &TeamRoster {
        &self.roster
    }

    fn document(&self, team: &TeamId) -> Result<JsonDocument> {
        let settings = self
            .roster
            .settings(team)
            .ok_or_else(|| BingoError::InvalidTeam(team.to_string()))?;

        let file = settings.board_file();
        let path = Path::new(&file);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        };
        Ok(JsonDocument::new(path))
    }

    /// Board for a team; a missing board file is NotFound
    pub fn load_board(&self, team: &TeamId) -> Result<Board> {
        let document = self.document(team)?;
        document.load()?.ok_or_else(|| {
            BingoError::NotFound(format!(
                "board for team {} ({})",
                team,
                document.path().display()
            ))
        })
    }

    pub fn save_board(&self, team: &TeamId, board: &Board) -> Result<()> {
        self.document(team)?.save(board)
    }

    /// Serialized read-modify-write; the board is saved only when `f` succeeds
    pub fn update<R>(&self, team: &TeamId, f: impl FnOnce(&mut Board) -> Result<R>) -> Result<R> {
        let writer = self
            .writers
            .get(team)
            .ok_or_else(|| BingoError::InvalidTeam(team.to_string()))?;
        let _guard = writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut board = self.load_board(team)?;
        let out = f(&mut board)?;
        self.save_board(team, &board)?;
        Ok(out)
    }

    /// Append an unapproved submission; ledger and score are untouched
    pub fn record_submission(
        &self,
        team: &TeamId,
        coordinate: &str,
        submission: NewSubmission,
    ) -> Result<Submission> {
        self.update(team, |board| {
            let tile = board.tile_mut(coordinate)?;
            let submission = submission.into_submission();
            tile.submissions.push(submission.clone());
            Ok(submission)
        })
        .map(|submission| {
            tracing::info!(
                team = %team,
                coordinate,
                id = %submission.id,
                item = %submission.item_name,
                "submission recorded"
            );
            submission
        })
    }

    /// The single state-transition point for tile completion and score
    pub fn approve_submission(
        &self,
        team: &TeamId,
        coordinate: &str,
        submission_id: &str,
    ) -> Result<ApprovalResult> {
        let result = self.update(team, |board| {
            let tile = board.tile_mut(coordinate)?;

            let submission = tile
                .submissions
                .iter_mut()
                .find(|sub| sub.id == submission_id)
                .ok_or_else(|| BingoError::NotFound(format!("submission {}", submission_id)))?;
            if submission.approved {
                return Err(BingoError::AlreadyApproved(format!("submission {}", submission_id)));
            }
            submission.approved = true;
            let submission = submission.clone();

            // Duplicate canonical names collapse to one ledger entry
            if !tile.has_obtained(&submission.item_name) {
                tile.obtained_items.push(ObtainedItem {
                    item_name: submission.item_name.clone(),
                    submitted_by: submission.submitted_by.clone(),
                    submitter_rsn: submission.submitter_rsn.clone(),
                    timestamp: submission.timestamp,
                });
            }

            let progress = tile.progress();
            let tile_completed = progress.completed && !tile.completed;
            let points_awarded = if tile_completed {
                tile.completed = true;
                tile.points
            } else {
                0
            };
            board.total_points += points_awarded;

            Ok(ApprovalResult {
                submission,
                progress,
                tile_completed,
                points_awarded,
                new_total_points: board.total_points,
            })
        })?;

        tracing::info!(
            team = %team,
            coordinate,
            id = submission_id,
            progress = %result.progress.description,
            tile_completed = result.tile_completed,
            total_points = result.new_total_points,
            "submission approved"
        );
        Ok(result)
    }

    /// Unapproved submissions across every team with a board
    pub fn list_pending_submissions(&self) -> Result<Vec<PendingSubmission>> {
        let mut pending = Vec::new();

        for team in self.roster.ids() {
            let board = match self.load_board(&team) {
                Ok(board) => board,
                Err(BingoError::NotFound(what)) => {
                    tracing::debug!(%what, "skipping team without board");
                    continue;
                }
                Err(e) => return Err(e),
            };

            for (coordinate, tile) in &board.tiles {
                for submission in tile.pending_submissions() {
                    pending.push(PendingSubmission {
                        team: team.clone(),
                        coordinate: coordinate.clone(),
                        submission: submission.clone(),
                        tile: tile.clone(),
                    });
                }
            }
        }

        Ok(pending)
    }

    /// (team, coordinate) holding a submission id
    pub fn find_submission(&self, submission_id: &str) -> Result<Option<(TeamId, String)>> {
        for team in self.roster.ids() {
            let board = match self.load_board(&team) {
                Ok(board) => board,
                Err(BingoError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if let Some(coordinate) = board.locate_submission(submission_id) {
                return Ok(Some((team, coordinate.to_string())));
            }
        }
        Ok(None)
    }

    /// Validate and persist a board definition (admin provisioning).
    /// A board that already holds submissions or points is never replaced.
    pub fn install_board(&self, team: &TeamId, board: &Board) -> Result<()> {
        board.validate()?;
        let writer = self
            .writers
            .get(team)
            .ok_or_else(|| BingoError::InvalidTeam(team.to_string()))?;
        let _guard = writer.lock().unwrap_or_else(PoisonError::into_inner);

        match self.load_board(team) {
            Ok(existing) => {
                let submissions: usize = existing.tiles.values().map(|t| t.submissions.len()).sum();
                if submissions > 0 || existing.total_points > 0 {
                    return Err(BingoError::ValidationFailed(format!(
                        "team {} board is in play ({} submissions, {} points)",
                        team, submissions, existing.total_points
                    )));
                }
            }
            Err(BingoError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        self.save_board(team, board)?;
        tracing::info!(team = %team, tiles = board.tiles.len(), "board installed");
        Ok(())
    }

    pub fn board_summary(&self, team: &TeamId) -> Result<BoardSummary> {
        Ok(self.load_board(team)?.summary())
    }

    pub fn find_tile_for_item(&self, team: &TeamId, text: &str) -> Result<Option<TileMatch>> {
        Ok(self.load_board(team)?.find_tile_for_item(&self.matcher, text))
    }

    pub fn search(&self, team: &TeamId, text: &str) -> Result<Vec<SearchHit>> {
        Ok(self
            .load_board(team)?
            .search(text, self.search_threshold, self.search_limit))
    }
}

// ============================================================================
// TESTS
// ============================================================================
