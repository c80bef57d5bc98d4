// Bingo Registry - Core Library
// Signup lifecycle, fuzzy item matching, and team bingo boards.
// Exposes all modules for use in the CLI, API server, and tests.

pub mod error;
pub mod config;
pub mod teams;
pub mod store;
pub mod matcher;    // Fuzzy item matching
pub mod registry;   // Identity Registry: unprocessed → pending → approved
pub mod board;      // Board / Tile / Submission model
pub mod engine;     // Persistent board operations
pub mod feed;       // Signup form feed
pub mod signup;     // Feed sync + verification glue
pub mod workflow;   // Submission workflow
pub mod notify;     // Access grant + notification collaborators
pub mod journal;    // Audit trail
pub mod services;   // Wiring for front ends

// Re-export commonly used types
pub use error::{BingoError, Result};
pub use config::{MatchSettings, ServerSettings, Settings, SignupSettings};
pub use teams::{TeamId, TeamRoster, TeamSettings};
pub use store::JsonDocument;
pub use matcher::{
    similarity, levenshtein, normalize,
    BestMatch, MatchConfidence, MatchStrategy, Matcher, ScoredItem,
};
pub use registry::{
    IdentityRegistry, PendingEntry, RegistryBreakdown, RegistryDocument,
    TeamBreakdown, UnprocessedEntry, UserRecord, Verification,
};
pub use board::{
    Board, BoardSummary, ObtainedItem, RequirementType, SearchHit,
    Submission, Tile, TileLine, TileMatch, TileProgress,
};
pub use engine::{ApprovalResult, BingoEngine, NewSubmission, PendingSubmission};
pub use feed::{CsvSignupFeed, MemorySignupFeed, SignupFeed, SignupField, SignupRow, COLUMN_ALIASES};
pub use signup::{NewSignup, SignupService, SyncReport};
pub use workflow::{generate_submission_id, ApprovalOutcome, SubmissionReceipt, SubmissionWorkflow};
pub use notify::{
    AccessGrants, LogNotifier, MemoryAccessGrants, Notification, Notifier,
    NotifyError, RecordingNotifier,
};
pub use journal::{Event, Journal};
pub use services::Services;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
