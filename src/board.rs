// 🎯 Board / Tile model - per-team scored tiles
//
// A tile's `completed` flag flips false → true exactly once, and that flip is
// the only thing that adds to `total_points`.
//
// Persisted shape (one document per team):
//   { "tiles": { "<coordinate>": Tile }, "totalPoints": n }

use crate::error::{BingoError, Result};
use crate::matcher::{self, BestMatch, Matcher};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

// ============================================================================
// REQUIREMENT TYPE
// ============================================================================

/// How a tile's obtained items turn into completion
///
/// Unknown strings are kept verbatim so an unfamiliar board survives a
/// load/save cycle; they score like `multiple_same`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequirementType {
    /// One specific item
    Single,
    /// Any one of the listed items
    Any,
    /// `required_count` ledger entries
    MultipleSame,
    /// `required_count` distinct item names ("different" is accepted too)
    AllDifferent,
    /// `required_count` ledger entries from any of the listed items
    TotalAny,
    Unknown(String),
}

impl RequirementType {
    pub fn as_str(&self) -> &str {
        match self {
            RequirementType::Single => "single",
            RequirementType::Any => "any",
            RequirementType::MultipleSame => "multiple_same",
            RequirementType::AllDifferent => "all_different",
            RequirementType::TotalAny => "total_any",
            RequirementType::Unknown(other) => other,
        }
    }
}

impl From<String> for RequirementType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "single" => RequirementType::Single,
            "any" => RequirementType::Any,
            "multiple_same" => RequirementType::MultipleSame,
            "all_different" | "different" => RequirementType::AllDifferent,
            "total_any" => RequirementType::TotalAny,
            _ => RequirementType::Unknown(value),
        }
    }
}

impl From<RequirementType> for String {
    fn from(value: RequirementType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SUBMISSION / LEDGER
// ============================================================================

/// A caller's claim to have obtained an item; never deleted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,

    /// Canonical item name as defined on the tile
    pub item_name: String,

    /// What the caller actually typed
    pub original_input: String,

    #[serde(default = "exact_similarity")]
    pub similarity: f64,

    /// Caller identity (opaque external id)
    pub submitted_by: String,

    #[serde(rename = "submitterRSN")]
    pub submitter_rsn: String,

    /// Opaque screenshot reference, never inspected
    #[serde(alias = "attachmentUrl")]
    pub attachment_ref: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub approved: bool,
}

fn exact_similarity() -> f64 {
    1.0
}

/// Ledger entry, one per distinct canonical item name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObtainedItem {
    pub item_name: String,
    pub submitted_by: String,

    #[serde(rename = "submitterRSN")]
    pub submitter_rsn: String,

    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// TILE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub coordinate: String,
    pub points: i64,
    pub requirement_type: RequirementType,
    pub required_items: Vec<String>,

    #[serde(default = "one")]
    pub required_count: u32,

    #[serde(default)]
    pub submissions: Vec<Submission>,

    #[serde(default)]
    pub obtained_items: Vec<ObtainedItem>,

    #[serde(default)]
    pub completed: bool,
}

fn one() -> u32 {
    1
}

/// Progress toward a tile's completion rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileProgress {
    pub completed: bool,
    pub current: u32,
    pub required: u32,
    /// "n/m"
    pub description: String,
}

fn same_item(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl Tile {
    pub fn new(
        coordinate: &str,
        points: i64,
        requirement_type: RequirementType,
        required_items: Vec<String>,
        required_count: u32,
    ) -> Self {
        Tile {
            coordinate: coordinate.to_string(),
            points,
            requirement_type,
            required_items,
            required_count,
            submissions: Vec::new(),
            obtained_items: Vec::new(),
            completed: false,
        }
    }

    /// Compute progress from the obtained-items ledger
    pub fn progress(&self) -> TileProgress {
        let obtained = self.obtained_items.len() as u32;

        let (current, required) = match self.requirement_type {
            RequirementType::Single | RequirementType::Any => (obtained, 1),
            RequirementType::AllDifferent => {
                let distinct = self
                    .obtained_items
                    .iter()
                    .map(|item| item.item_name.trim().to_lowercase())
                    .collect::<HashSet<_>>()
                    .len() as u32;
                (distinct, self.required_count)
            }
            RequirementType::MultipleSame
            | RequirementType::TotalAny
            | RequirementType::Unknown(_) => (obtained, self.required_count),
        };

        TileProgress {
            completed: current >= required,
            current,
            required,
            description: format!("{}/{}", current, required),
        }
    }

    /// Check whether a caller may submit this canonical item here
    pub fn can_submit(&self, item_name: &str, submitted_by: &str) -> Result<()> {
        if self.completed {
            return Err(BingoError::ValidationFailed("Tile already completed".to_string()));
        }

        let duplicate = self
            .submissions
            .iter()
            .any(|sub| sub.submitted_by == submitted_by && same_item(&sub.item_name, item_name));
        if duplicate {
            return Err(BingoError::ValidationFailed(
                "You have already submitted this item for this tile".to_string(),
            ));
        }

        Ok(())
    }

    pub fn has_obtained(&self, item_name: &str) -> bool {
        self.obtained_items
            .iter()
            .any(|item| same_item(&item.item_name, item_name))
    }

    pub fn submission(&self, id: &str) -> Option<&Submission> {
        self.submissions.iter().find(|sub| sub.id == id)
    }

    pub fn pending_submissions(&self) -> impl Iterator<Item = &Submission> {
        self.submissions.iter().filter(|sub| !sub.approved)
    }

    /// Unique submitter display names in ledger order
    pub fn contributors(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for item in &self.obtained_items {
            if !seen.contains(&item.submitter_rsn) {
                seen.push(item.submitter_rsn.clone());
            }
        }
        seen
    }

    /// Short human description of what the tile needs
    pub fn describe(&self) -> String {
        let first = self.required_items.first().cloned().unwrap_or_default();
        match self.requirement_type {
            RequirementType::Single => first,
            RequirementType::Any => {
                let shown = self.required_items.iter().take(2).cloned().collect::<Vec<_>>();
                let more = if self.required_items.len() > 2 { "..." } else { "" };
                format!("Any: {}{}", shown.join(", "), more)
            }
            RequirementType::MultipleSame => format!("{}x {}", self.required_count, first),
            RequirementType::AllDifferent => format!("All: {}", self.required_items.join(", ")),
            RequirementType::TotalAny => format!(
                "{} of: {}",
                self.required_count,
                self.required_items.join(", ")
            ),
            RequirementType::Unknown(_) => self.required_items.join(", "),
        }
    }

    /// Requirement hint shown next to search results
    pub fn requirement_hint(&self) -> Option<String> {
        if self.required_items.len() <= 1 {
            return None;
        }
        match self.requirement_type {
            RequirementType::Single | RequirementType::Unknown(_) => None,
            RequirementType::Any => Some("need any 1".to_string()),
            RequirementType::AllDifferent => Some(format!("need {} different", self.required_count)),
            RequirementType::MultipleSame => Some(format!("need {}x", self.required_count)),
            RequirementType::TotalAny => Some(format!("need {} total", self.required_count)),
        }
    }

    /// Structural problems in a tile definition
    fn validate(&self, key: &str) -> Vec<String> {
        let mut problems = Vec::new();
        if self.coordinate != key {
            problems.push(format!(
                "{}: coordinate field is \"{}\"",
                key, self.coordinate
            ));
        }
        if self.required_items.iter().all(|item| item.trim().is_empty()) {
            problems.push(format!("{}: no required items", key));
        }
        if self.required_count == 0 {
            problems.push(format!("{}: requiredCount must be at least 1", key));
        }
        if self.points < 0 {
            problems.push(format!("{}: points must not be negative", key));
        }
        problems
    }
}

// ============================================================================
// BOARD
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(default)]
    pub tiles: BTreeMap<String, Tile>,

    /// Cached sum of completed tile points; only grows
    #[serde(default)]
    pub total_points: i64,
}

/// Board-wide fuzzy match result: best tile/item plus near misses
pub type TileMatch = BestMatch<String>;

/// One row of a board search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub coordinate: String,
    pub item: String,
    pub similarity: f64,
    pub points: i64,
    pub completed: bool,
    pub hint: Option<String>,
}

/// Completed / in-progress / remaining tiles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub completed: Vec<TileLine>,
    pub in_progress: Vec<TileLine>,
    pub remaining: Vec<TileLine>,
    pub earned_points: i64,
    pub available_points: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLine {
    pub coordinate: String,
    pub points: i64,
    pub description: String,
    pub progress: String,
    pub contributors: Vec<String>,
}

impl BoardSummary {
    pub fn tile_count(&self) -> usize {
        self.completed.len() + self.in_progress.len() + self.remaining.len()
    }

    /// Whole-number completion percentage
    pub fn percent_complete(&self) -> u32 {
        match self.tile_count() {
            0 => 0,
            n => ((self.completed.len() as f64 / n as f64) * 100.0).round() as u32,
        }
    }
}

impl Board {
    pub fn tile(&self, coordinate: &str) -> Result<&Tile> {
        self.tiles
            .get(coordinate)
            .ok_or_else(|| BingoError::NotFound(format!("tile {}", coordinate)))
    }

    pub fn tile_mut(&mut self, coordinate: &str) -> Result<&mut Tile> {
        self.tiles
            .get_mut(coordinate)
            .ok_or_else(|| BingoError::NotFound(format!("tile {}", coordinate)))
    }

    /// Coordinate of the tile holding a submission id
    pub fn locate_submission(&self, submission_id: &str) -> Option<&str> {
        self.tiles
            .iter()
            .find(|(_, tile)| tile.submission(submission_id).is_some())
            .map(|(coordinate, _)| coordinate.as_str())
    }

    /// Score every required item of every tile against free text
    pub fn find_tile_for_item(&self, matcher: &Matcher, text: &str) -> Option<TileMatch> {
        let candidates = self.tiles.iter().flat_map(|(coordinate, tile)| {
            tile.required_items
                .iter()
                .map(move |item| (coordinate.clone(), item.as_str()))
        });
        matcher.rank(text, candidates)
    }

    /// Loose item search: similarity ≥ threshold or containment either way
    pub fn search(&self, text: &str, threshold: f64, limit: usize) -> Vec<SearchHit> {
        let needle = matcher::normalize(text);
        let mut hits: Vec<SearchHit> = Vec::new();

        for (coordinate, tile) in &self.tiles {
            for item in &tile.required_items {
                let sim = matcher::similarity(&needle, item);
                let hay = matcher::normalize(item);
                if sim >= threshold || hay.contains(&needle) || needle.contains(&hay) {
                    hits.push(SearchHit {
                        coordinate: coordinate.clone(),
                        item: item.clone(),
                        similarity: sim,
                        points: tile.points,
                        completed: tile.completed,
                        hint: tile.requirement_hint(),
                    });
                }
            }
        }

        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(b.points.cmp(&a.points))
        });
        hits.truncate(limit);
        hits
    }

    pub fn summary(&self) -> BoardSummary {
        let mut summary = BoardSummary {
            total_points: self.total_points,
            ..BoardSummary::default()
        };

        for tile in self.tiles.values() {
            summary.available_points += tile.points;
            let line = TileLine {
                coordinate: tile.coordinate.clone(),
                points: tile.points,
                description: tile.describe(),
                progress: tile.progress().description,
                contributors: tile.contributors(),
            };

            if tile.completed {
                summary.earned_points += tile.points;
                summary.completed.push(line);
            } else if !tile.obtained_items.is_empty() {
                summary.in_progress.push(line);
            } else {
                summary.remaining.push(line);
            }
        }

        summary
    }

    /// Validate a board definition before it is installed
    pub fn validate(&self) -> Result<()> {
        let problems: Vec<String> = self
            .tiles
            .iter()
            .flat_map(|(key, tile)| tile.validate(key))
            .collect();

        if self.tiles.is_empty() {
            return Err(BingoError::ValidationFailed("board has no tiles".to_string()));
        }
        if !problems.is_empty() {
            return Err(BingoError::ValidationFailed(problems.join("; ")));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn obtained(name: &str, who: &str) -> ObtainedItem {
        ObtainedItem {
            item_name: name.to_string(),
            submitted_by: who.to_string(),
            submitter_rsn: who.to_uppercase(),
            timestamp: Utc::now(),
        }
    }

    fn submission(id: &str, item: &str, by: &str) -> Submission {
        Submission {
            id: id.to_string(),
            item_name: item.to_string(),
            original_input: item.to_lowercase(),
            similarity: 1.0,
            submitted_by: by.to_string(),
            submitter_rsn: by.to_uppercase(),
            attachment_ref: "https://cdn.example/shot.png".to_string(),
            timestamp: Utc::now(),
            approved: false,
        }
    }

    fn items(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_progress() {
        let mut tile = Tile::new("a1", 5, RequirementType::Single, items(&["Twisted bow"]), 1);
        assert_eq!(tile.progress().description, "0/1");
        assert!(!tile.progress().completed);

        tile.obtained_items.push(obtained("Twisted bow", "c1"));
        let progress = tile.progress();
        assert!(progress.completed);
        assert_eq!(progress.description, "1/1");
    }

    #[test]
    fn test_multiple_same_progress() {
        let mut tile = Tile::new("b2", 10, RequirementType::MultipleSame, items(&["Dragon Bone"]), 3);
        tile.obtained_items.push(obtained("Dragon Bone", "c1"));
        tile.obtained_items.push(obtained("Dragon Bone", "c2"));
        assert_eq!(tile.progress().description, "2/3");
        assert!(!tile.progress().completed);

        tile.obtained_items.push(obtained("Dragon Bone", "c3"));
        assert!(tile.progress().completed);
    }

    #[test]
    fn test_all_different_counts_distinct_names() {
        let mut tile = Tile::new(
            "c3",
            15,
            RequirementType::AllDifferent,
            items(&["Rune Axe", "Rune Pickaxe"]),
            2,
        );
        tile.obtained_items.push(obtained("Rune Axe", "c1"));
        tile.obtained_items.push(obtained("rune axe", "c2"));

        let progress = tile.progress();
        assert!(!progress.completed);
        assert_eq!(progress.description, "1/2");

        tile.obtained_items.push(obtained("Rune Pickaxe", "c2"));
        assert!(tile.progress().completed);
    }

    #[test]
    fn test_unknown_type_scores_like_multiple_same() {
        let json = r#"{
            "coordinate": "d4", "points": 3, "requirementType": "mystery",
            "requiredItems": ["Coal"], "requiredCount": 2
        }"#;
        let mut tile: Tile = serde_json::from_str(json).unwrap();
        assert_eq!(tile.requirement_type, RequirementType::Unknown("mystery".into()));

        tile.obtained_items.push(obtained("Coal", "c1"));
        assert_eq!(tile.progress().description, "1/2");

        let saved = serde_json::to_value(&tile).unwrap();
        assert_eq!(saved["requirementType"], "mystery");
    }

    #[test]
    fn test_different_alias() {
        assert_eq!(
            RequirementType::from("different".to_string()),
            RequirementType::AllDifferent
        );
    }

    #[test]
    fn test_can_submit_rules() {
        let mut tile = Tile::new("e5", 5, RequirementType::Any, items(&["Ancient relic"]), 1);
        assert!(tile.can_submit("Ancient relic", "c1").is_ok());

        tile.submissions.push(submission("sub_1", "Ancient Relic", "c1"));
        let err = tile.can_submit("ancient relic ", "c1").unwrap_err();
        assert!(err.to_string().contains("already submitted this item"));
        assert!(tile.can_submit("Ancient relic", "c2").is_ok());

        tile.completed = true;
        let err = tile.can_submit("Ancient relic", "c3").unwrap_err();
        assert_eq!(err.to_string(), "Tile already completed");
    }

    #[test]
    fn test_legacy_submission_fields() {
        let json = r#"{
            "id": "sub_1", "itemName": "Elder maul", "originalInput": "elder maul",
            "submittedBy": "42", "submitterRSN": "Zezima",
            "attachmentUrl": "https://cdn.example/1.png",
            "timestamp": "2025-10-01T12:00:00Z", "approved": false
        }"#;
        let sub: Submission = serde_json::from_str(json).unwrap();
        assert_eq!(sub.attachment_ref, "https://cdn.example/1.png");
        assert_eq!(sub.similarity, 1.0);
        assert_eq!(sub.submitter_rsn, "Zezima");
    }

    fn sample_board() -> Board {
        let mut board = Board::default();
        board.tiles.insert(
            "a1".into(),
            Tile::new("a1", 5, RequirementType::Single, items(&["Twisted bow"]), 1),
        );
        board.tiles.insert(
            "b2".into(),
            Tile::new("b2", 10, RequirementType::MultipleSame, items(&["Dragon Bone"]), 3),
        );
        board.tiles.insert(
            "c3".into(),
            Tile::new(
                "c3",
                8,
                RequirementType::AllDifferent,
                items(&["Bandos chestplate", "Bandos tassets", "Bandos boots"]),
                3,
            ),
        );
        board
    }

    #[test]
    fn test_find_tile_exact_and_fuzzy() {
        let board = sample_board();
        let matcher = Matcher::new();

        let exact = board.find_tile_for_item(&matcher, "TWISTED BOW").unwrap();
        assert!(exact.is_exact());
        assert_eq!(exact.best.key, "a1");

        let fuzzy = board.find_tile_for_item(&matcher, "dragon bones").unwrap();
        assert_eq!(fuzzy.best.key, "b2");
        assert_eq!(fuzzy.best.item, "Dragon Bone");
        assert_eq!(matcher.confidence(fuzzy.similarity()), crate::matcher::MatchConfidence::Fuzzy);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let board = sample_board();
        let hits = board.search("bandos", 0.5, 15);

        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.coordinate == "c3"));
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert_eq!(hits[0].hint.as_deref(), Some("need 3 different"));

        assert_eq!(board.search("bandos", 0.5, 1).len(), 1);
        assert!(board.search("zzzzqqqq", 0.5, 15).is_empty());
    }

    #[test]
    fn test_summary_buckets() {
        let mut board = sample_board();
        {
            let tile = board.tiles.get_mut("a1").unwrap();
            tile.obtained_items.push(obtained("Twisted bow", "c1"));
            tile.completed = true;
        }
        board.total_points = 5;
        board
            .tiles
            .get_mut("b2")
            .unwrap()
            .obtained_items
            .push(obtained("Dragon Bone", "c2"));

        let summary = board.summary();
        assert_eq!(summary.completed.len(), 1);
        assert_eq!(summary.in_progress.len(), 1);
        assert_eq!(summary.remaining.len(), 1);
        assert_eq!(summary.earned_points, 5);
        assert_eq!(summary.available_points, 23);
        assert_eq!(summary.completed[0].contributors, vec!["C1".to_string()]);
        assert_eq!(summary.percent_complete(), 33);
    }

    #[test]
    fn test_describe() {
        let board = sample_board();
        assert_eq!(board.tiles["a1"].describe(), "Twisted bow");
        assert_eq!(board.tiles["b2"].describe(), "3x Dragon Bone");
        assert!(board.tiles["c3"].describe().starts_with("All: Bandos chestplate"));
    }

    #[test]
    fn test_validate() {
        assert!(sample_board().validate().is_ok());
        assert!(Board::default().validate().is_err());

        let mut bad = sample_board();
        bad.tiles.get_mut("a1").unwrap().coordinate = "z9".into();
        bad.tiles.get_mut("b2").unwrap().required_count = 0;
        let err = bad.validate().unwrap_err().to_string();
        assert!(err.contains("a1"));
        assert!(err.contains("requiredCount"));
    }

    #[test]
    fn test_board_round_trips_document_shape() {
        let board = sample_board();
        let value = serde_json::to_value(&board).unwrap();
        assert!(value["tiles"]["a1"]["requiredItems"].is_array());
        assert_eq!(value["totalPoints"], 0);
        assert_eq!(value["tiles"]["b2"]["requirementType"], "multiple_same");
    }
}
