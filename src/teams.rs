// 🍉 Teams - the two competing groups
//
// A team partitions boards, registry, and scoring. The roster is built from
// settings so keywords and board files are data, not code.

use crate::error::{BingoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// TEAM ID
// ============================================================================

/// Lowercase team identifier, also the registry document key
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    pub fn new(id: &str) -> Self {
        TeamId(id.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// "melon" → "Melon"
    pub fn title(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ROSTER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSettings {
    pub id: String,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Substrings that identify this team in free-text signup answers
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Board document, relative to the data directory
    #[serde(default)]
    pub board_file: Option<String>,
}

impl TeamSettings {
    pub fn new(id: &str) -> Self {
        TeamSettings {
            id: id.to_string(),
            display_name: None,
            keywords: vec![id.to_string()],
            board_file: None,
        }
    }

    /// Keywords, falling back to the id itself
    pub fn keywords(&self) -> Vec<String> {
        if self.keywords.is_empty() {
            vec![self.id.clone()]
        } else {
            self.keywords.clone()
        }
    }

    pub fn board_file(&self) -> String {
        self.board_file
            .clone()
            .unwrap_or_else(|| format!("bingo-board-{}.json", TeamId::new(&self.id)))
    }
}

/// Known teams, in configuration order
#[derive(Debug, Clone)]
pub struct TeamRoster {
    teams: Vec<TeamSettings>,
}

impl TeamRoster {
    pub fn new(teams: Vec<TeamSettings>) -> Self {
        TeamRoster { teams }
    }

    pub fn ids(&self) -> Vec<TeamId> {
        self.teams.iter().map(|t| TeamId::new(&t.id)).collect()
    }

    pub fn contains(&self, team: &TeamId) -> bool {
        self.teams.iter().any(|t| TeamId::new(&t.id) == *team)
    }

    pub fn settings(&self, team: &TeamId) -> Option<&TeamSettings> {
        self.teams.iter().find(|t| TeamId::new(&t.id) == *team)
    }

    pub fn display_name(&self, team: &TeamId) -> String {
        self.settings(team)
            .and_then(|t| t.display_name.clone())
            .unwrap_or_else(|| team.title())
    }

    /// Exact id or display-name match (case-insensitive)
    pub fn parse(&self, token: &str) -> Result<TeamId> {
        let wanted = token.trim().to_lowercase();
        self.teams
            .iter()
            .find(|t| {
                t.id.to_lowercase() == wanted
                    || t.display_name
                        .as_deref()
                        .map(|d| d.to_lowercase() == wanted)
                        .unwrap_or(false)
            })
            .map(|t| TeamId::new(&t.id))
            .ok_or_else(|| BingoError::InvalidTeam(token.to_string()))
    }

    /// First team whose keyword appears anywhere in the text
    ///
    /// Example: "I'm in Melon (main clan)" → melon
    pub fn detect(&self, free_text: &str) -> Option<TeamId> {
        let lower = free_text.to_lowercase();
        self.teams
            .iter()
            .find(|t| {
                t.keywords()
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .any(|k| lower.contains(&k.trim().to_lowercase()))
            })
            .map(|t| TeamId::new(&t.id))
    }
}

impl Default for TeamRoster {
    fn default() -> Self {
        TeamRoster::new(vec![TeamSettings::new("melon"), TeamSettings::new("weenor")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_id_is_lowercase() {
        assert_eq!(TeamId::new(" Melon ").as_str(), "melon");
        assert_eq!(TeamId::new("melon").title(), "Melon");
    }

    #[test]
    fn test_detect_by_keyword() {
        let roster = TeamRoster::default();
        assert_eq!(roster.detect("melon bingo"), Some(TeamId::new("melon")));
        assert_eq!(roster.detect("Team WEENOR!"), Some(TeamId::new("weenor")));
        assert_eq!(roster.detect("guest"), None);
    }

    #[test]
    fn test_parse_rejects_unknown_team() {
        let roster = TeamRoster::default();
        assert_eq!(roster.parse("Weenor").unwrap(), TeamId::new("weenor"));
        assert!(matches!(
            roster.parse("banana"),
            Err(BingoError::InvalidTeam(_))
        ));
    }

    #[test]
    fn test_default_board_file() {
        assert_eq!(TeamSettings::new("melon").board_file(), "bingo-board-melon.json");
    }
}
