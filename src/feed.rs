// 📋 Signup Feed - read-only rows from the external signup form
//
// Headers differ between exports of the same form, so each field is looked up
// through a declarative alias table. Processed marks live in a local ledger of
// row fingerprints; the source itself is never written.

use crate::error::{BingoError, Result};
use crate::store::JsonDocument;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

// ============================================================================
// ROW + COLUMN ALIASES
// ============================================================================

/// One typed form response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignupRow {
    /// Zero-based position in the feed
    pub row_index: usize,
    pub timestamp: String,
    /// Free text containing a team keyword
    pub team_text: String,
    pub username: String,
    /// Free-text payment status, e.g. "Paid $10"
    pub paid: String,
    pub email: Option<String>,
    pub processed: bool,
}

impl SignupRow {
    pub fn is_paid(&self, marker: &str) -> bool {
        self.paid.to_lowercase().contains(&marker.to_lowercase())
    }

    /// Stable identity across re-exports: timestamp, username, team text
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}\u{1f}{}\u{1f}{}",
            self.timestamp.trim(),
            self.username.trim().to_lowercase(),
            self.team_text.trim().to_lowercase()
        ));
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignupField {
    Timestamp,
    Team,
    Username,
    Paid,
    Email,
    Processed,
}

/// Accepted headers per field, highest priority first
pub const COLUMN_ALIASES: &[(SignupField, &[&str])] = &[
    (SignupField::Timestamp, &["Timestamp", "Column 1"]),
    (
        SignupField::Team,
        &[
            "Which clan are you in? *Note: you MUST be an ACTUAL member in either Weenor or Melon (not a guest) to play in this bingo",
            "Team",
            "Clan",
            "Column 2",
        ],
    ),
    (
        SignupField::Username,
        &[
            "What is the Runescape Username of the account that will be playing in the bingo? SPELL CORRECTLY PLEASE",
            "Username",
            "RSN",
            "Column 3",
        ],
    ),
    (SignupField::Paid, &["PAID (and how much)", "Paid", "Column 4"]),
    (SignupField::Email, &["Email", "Email Address"]),
    (SignupField::Processed, &["Processed"]),
];

/// Header positions resolved once per read
struct ColumnMap {
    positions: HashMap<SignupField, Vec<usize>>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        let positions = COLUMN_ALIASES
            .iter()
            .map(|(field, aliases)| {
                let found = aliases
                    .iter()
                    .filter_map(|alias| {
                        let alias = alias.to_lowercase();
                        normalized.iter().position(|h| *h == alias)
                    })
                    .collect();
                (*field, found)
            })
            .collect();

        ColumnMap { positions }
    }

    /// First aliased column with a non-empty value
    fn get(&self, record: &csv::StringRecord, field: SignupField) -> Option<String> {
        self.positions.get(&field)?.iter().find_map(|&i| {
            record
                .get(i)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    }

    fn row(&self, row_index: usize, record: &csv::StringRecord) -> SignupRow {
        let processed = self
            .get(record, SignupField::Processed)
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        SignupRow {
            row_index,
            timestamp: self.get(record, SignupField::Timestamp).unwrap_or_default(),
            team_text: self.get(record, SignupField::Team).unwrap_or_default(),
            username: self.get(record, SignupField::Username).unwrap_or_default(),
            paid: self.get(record, SignupField::Paid).unwrap_or_default(),
            email: self.get(record, SignupField::Email),
            processed,
        }
    }
}

// ============================================================================
// FEED TRAIT
// ============================================================================

pub trait SignupFeed: Send + Sync {
    fn form_responses(&self) -> Result<Vec<SignupRow>>;
    fn mark_processed(&self, row_index: usize) -> Result<()>;
}

// ============================================================================
// CSV FEED
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProcessedLedger {
    #[serde(default)]
    processed: BTreeSet<String>,
}

/// CSV export of the signup form plus a local processed ledger
pub struct CsvSignupFeed {
    csv_path: PathBuf,
    ledger: JsonDocument,
    writer: Mutex<()>,
}

impl CsvSignupFeed {
    pub fn new(csv_path: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Self {
        CsvSignupFeed {
            csv_path: csv_path.into(),
            ledger: JsonDocument::new(ledger_path),
            writer: Mutex::new(()),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    fn read_rows(&self) -> Result<Vec<SignupRow>> {
        let csv_err = |e: csv::Error| BingoError::io(&self.csv_path, e.into());

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.csv_path)
            .map_err(csv_err)?;
        let columns = ColumnMap::from_headers(reader.headers().map_err(csv_err)?);

        let mut rows = Vec::new();
        for (row_index, record) in reader.records().enumerate() {
            rows.push(columns.row(row_index, &record.map_err(csv_err)?));
        }
        Ok(rows)
    }
}

impl SignupFeed for CsvSignupFeed {
    fn form_responses(&self) -> Result<Vec<SignupRow>> {
        let ledger: ProcessedLedger = self.ledger.load_or_default()?;
        let mut rows = self.read_rows()?;
        for row in rows.iter_mut() {
            row.processed = row.processed || ledger.processed.contains(&row.fingerprint());
        }
        tracing::debug!(rows = rows.len(), path = %self.csv_path.display(), "signup feed read");
        Ok(rows)
    }

    fn mark_processed(&self, row_index: usize) -> Result<()> {
        let row = self
            .read_rows()?
            .into_iter()
            .nth(row_index)
            .ok_or_else(|| BingoError::NotFound(format!("signup row {}", row_index)))?;

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ledger: ProcessedLedger = self.ledger.load_or_default()?;
        if ledger.processed.insert(row.fingerprint()) {
            self.ledger.save(&ledger)?;
        }
        Ok(())
    }
}

// ============================================================================
// MEMORY FEED
// ============================================================================

/// Fixed rows held in memory (tests, one-off imports)
#[derive(Debug, Default)]
pub struct MemorySignupFeed {
    rows: Mutex<Vec<SignupRow>>,
}

impl MemorySignupFeed {
    pub fn new(rows: Vec<SignupRow>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(row_index, row)| SignupRow { row_index, ..row })
            .collect();
        MemorySignupFeed {
            rows: Mutex::new(rows),
        }
    }
}

impl SignupFeed for MemorySignupFeed {
    fn form_responses(&self) -> Result<Vec<SignupRow>> {
        Ok(self.rows.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn mark_processed(&self, row_index: usize) -> Result<()> {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let row = rows
            .get_mut(row_index)
            .ok_or_else(|| BingoError::NotFound(format!("signup row {}", row_index)))?;
        row.processed = true;
        Ok(())
    }
}
