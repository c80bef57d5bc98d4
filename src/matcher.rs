// 🔍 Fuzzy Matcher - map free-text item names to canonical required items
//
// Four strategies, tried in order:
// 1. Exact match after case/whitespace normalization → 1.0
// 2. Containment (either direction) → shorter/longer × 0.95
// 3. Token overlap (≥ 70% of the shorter token list) → fraction × 0.9, capped at 0.95
// 4. Normalized edit distance → (maxLen - distance) / maxLen

use crate::config::MatchSettings;
use crate::error::{BingoError, Result};
use serde::{Deserialize, Serialize};

/// Minimum fraction of the shorter token list that must match
const TOKEN_MATCH_FRACTION: f64 = 0.7;

/// Tokens shorter than this never count as matched
const MIN_TOKEN_LEN: usize = 3;

// ============================================================================
// MATCH STRATEGY / CONFIDENCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    Exact,
    Containment,
    TokenOverlap,
    EditDistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// similarity == 1
    Exact,
    /// ≥ confident threshold, trusted without review
    Confident,
    /// ≥ accept threshold, must be confirmed by a human
    Fuzzy,
    /// below accept threshold, not resolvable
    Weak,
}

impl MatchConfidence {
    pub fn needs_review(&self) -> bool {
        matches!(self, MatchConfidence::Fuzzy)
    }

    pub fn is_resolvable(&self) -> bool {
        !matches!(self, MatchConfidence::Weak)
    }
}

// ============================================================================
// SIMILARITY
// ============================================================================

/// Lowercase, trim, and collapse internal whitespace
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Symmetric similarity in [0, 1]; 1 only for normalized-equal strings
pub fn similarity(a: &str, b: &str) -> f64 {
    score(a, b).0
}

/// Similarity plus the strategy that produced it
pub fn score(a: &str, b: &str) -> (f64, MatchStrategy) {
    let s1 = normalize(a);
    let s2 = normalize(b);

    if s1 == s2 {
        return (1.0, MatchStrategy::Exact);
    }

    let len1 = s1.chars().count();
    let len2 = s2.chars().count();

    if s1.contains(&s2) || s2.contains(&s1) {
        let (shorter, longer) = (len1.min(len2), len1.max(len2));
        return (shorter as f64 / longer as f64 * 0.95, MatchStrategy::Containment);
    }

    if let Some(fraction) = token_overlap(&s1, &s2) {
        if fraction >= TOKEN_MATCH_FRACTION {
            return ((fraction * 0.9).min(0.95), MatchStrategy::TokenOverlap);
        }
    }

    let max_len = len1.max(len2);
    let distance = levenshtein(&s1, &s2);
    (
        (max_len - distance) as f64 / max_len as f64,
        MatchStrategy::EditDistance,
    )
}

/// Fraction of the shorter token list found in the longer one
///
/// With equal token counts both directions are scored and the higher kept,
/// so the result does not depend on argument order.
fn token_overlap(s1: &str, s2: &str) -> Option<f64> {
    let words1: Vec<&str> = s1.split_whitespace().collect();
    let words2: Vec<&str> = s2.split_whitespace().collect();

    if words1.is_empty() || words2.is_empty() {
        return None;
    }

    let fraction = |shorter: &[&str], longer: &[&str]| {
        let matched = shorter
            .iter()
            .filter(|word| word.chars().count() >= MIN_TOKEN_LEN)
            .filter(|word| longer.iter().any(|other| tokens_match(word, other)))
            .count();
        matched as f64 / shorter.len() as f64
    };

    let result = match words1.len().cmp(&words2.len()) {
        std::cmp::Ordering::Less => fraction(&words1, &words2),
        std::cmp::Ordering::Greater => fraction(&words2, &words1),
        std::cmp::Ordering::Equal => fraction(&words1, &words2).max(fraction(&words2, &words1)),
    };
    Some(result)
}

fn tokens_match(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a) || levenshtein(a, b) <= 1
}

/// Classic unit-cost edit distance over chars
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

// ============================================================================
// RANKING
// ============================================================================

/// One scored candidate; `key` identifies where the item came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem<K> {
    pub key: K,
    pub item: String,
    pub similarity: f64,
}

/// Best candidate plus near misses for human disambiguation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMatch<K> {
    pub best: ScoredItem<K>,
    pub alternates: Vec<ScoredItem<K>>,
}

impl<K> BestMatch<K> {
    pub fn similarity(&self) -> f64 {
        self.best.similarity
    }

    pub fn is_exact(&self) -> bool {
        self.best.similarity >= 1.0
    }
}

/// Matcher with the acceptance policy thresholds
#[derive(Debug, Clone)]
pub struct Matcher {
    /// Minimum similarity for a resolvable match (default: 0.70)
    pub accept_threshold: f64,

    /// Minimum similarity for a trusted match (default: 0.90)
    pub confident_threshold: f64,

    /// Near-miss alternates kept (default: 3)
    pub max_alternates: usize,
}

impl Matcher {
    pub fn new() -> Self {
        Self::from_settings(&MatchSettings::default())
    }

    pub fn from_settings(settings: &MatchSettings) -> Self {
        Matcher {
            accept_threshold: settings.accept_threshold,
            confident_threshold: settings.confident_threshold,
            max_alternates: settings.max_alternates,
        }
    }

    pub fn confidence(&self, similarity: f64) -> MatchConfidence {
        if similarity >= 1.0 {
            MatchConfidence::Exact
        } else if similarity >= self.confident_threshold {
            MatchConfidence::Confident
        } else if similarity >= self.accept_threshold {
            MatchConfidence::Fuzzy
        } else {
            MatchConfidence::Weak
        }
    }

    /// Score every candidate and keep the best
    ///
    /// An exact hit returns immediately. Otherwise every candidate is scored;
    /// the first candidate with the highest similarity wins, and alternates are
    /// the other distinct items with similarity in [accept, best).
    pub fn rank<K, I, S>(&self, candidate: &str, items: I) -> Option<BestMatch<K>>
    where
        I: IntoIterator<Item = (K, S)>,
        S: AsRef<str>,
    {
        let mut best: Option<ScoredItem<K>> = None;
        let mut near: Vec<ScoredItem<K>> = Vec::new();

        for (key, item) in items {
            let item = item.as_ref();
            let sim = similarity(candidate, item);
            let scored = ScoredItem {
                key,
                item: item.to_string(),
                similarity: sim,
            };

            if sim >= 1.0 {
                return Some(BestMatch {
                    best: scored,
                    alternates: Vec::new(),
                });
            }

            let is_better = best.as_ref().map_or(true, |b| sim > b.similarity);
            if is_better {
                if let Some(previous) = best.replace(scored) {
                    near.push(previous);
                }
            } else {
                near.push(scored);
            }
        }

        let best = best?;
        let best_name = normalize(&best.item);

        let mut alternates: Vec<ScoredItem<K>> = near
            .into_iter()
            .filter(|s| s.similarity >= self.accept_threshold && s.similarity < best.similarity)
            .filter(|s| normalize(&s.item) != best_name)
            .collect();
        alternates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        alternates.truncate(self.max_alternates);

        Some(BestMatch { best, alternates })
    }

    /// Best match among plain item names, keyed by index
    pub fn find_best_match<S: AsRef<str>>(&self, candidate: &str, items: &[S]) -> Option<BestMatch<usize>> {
        self.rank(candidate, items.iter().enumerate().map(|(i, s)| (i, s.as_ref())))
    }

    /// Apply the acceptance threshold: below it the match is NoMatch
    pub fn accept<K>(&self, candidate: &str, found: Option<BestMatch<K>>) -> Result<BestMatch<K>> {
        match found {
            Some(m) if m.similarity() >= self.accept_threshold => Ok(m),
            _ => Err(BingoError::NoMatch {
                input: candidate.trim().to_string(),
            }),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
