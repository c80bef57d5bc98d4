// 📜 Audit Journal - every state transition is an event
//
// Append-only SQLite table. The JSON documents stay the source of truth;
// the journal answers "who did what, when". A failed append is logged and
// never fails the transition that produced it.

use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

pub const SIGNUP_IMPORTED: &str = "signup_imported";
pub const VERIFICATION_PENDING: &str = "verification_pending";
pub const REAPPROVAL_NEEDED: &str = "reapproval_needed";
pub const USER_APPROVED: &str = "user_approved";
pub const USER_REJECTED: &str = "user_rejected";
pub const SUBMISSION_RECORDED: &str = "submission_recorded";
pub const SUBMISSION_APPROVED: &str = "submission_approved";
pub const TILE_COMPLETED: &str = "tile_completed";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub struct Journal {
    conn: Mutex<Connection>,
}

impl Journal {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| crate::error::BingoError::io(dir, e))?;
            }
        }
        let conn = Connection::open(path)?;
        // WAL for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::setup(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::setup(Connection::open_in_memory()?)
    }

    fn setup(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT UNIQUE NOT NULL,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                data TEXT NOT NULL,
                actor TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_type ON events(event_type)",
            [],
        )?;

        Ok(Journal {
            conn: Mutex::new(conn),
        })
    }

    pub fn record(&self, event: &Event) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO events (
                event_id, timestamp, event_type, entity_type, entity_id, data, actor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.event_id,
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.entity_type,
                event.entity_id,
                event.data.to_string(),
                event.actor,
            ],
        )?;
        Ok(())
    }

    /// Record, logging instead of returning a failure
    pub fn append(&self, event: Event) {
        if let Err(e) = self.record(&event) {
            tracing::warn!(
                event_type = %event.event_type,
                entity_id = %event.entity_id,
                error = %e,
                "journal append failed"
            );
        }
    }

    /// Events for one entity, oldest first
    pub fn events_for(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        self.query(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY id ASC",
            params![entity_type, entity_id],
        )
    }

    /// Most recent events, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<Event>> {
        self.query(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             ORDER BY id DESC
             LIMIT ?1",
            params![limit as i64],
        )
    }

    pub fn count(&self, event_type: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let count = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE event_type = ?1",
            params![event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn query(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(sql)?;

        let events = stmt
            .query_map(args, |row| {
                let timestamp: String = row.get(1)?;
                let data: String = row.get(5)?;

                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?
                        .with_timezone(&Utc),
                    event_type: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    data: serde_json::from_str(&data)
                        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
                    actor: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_event_log() {
        let journal = Journal::in_memory().unwrap();

        journal.append(Event::new(
            SUBMISSION_RECORDED,
            "submission",
            "sub_1",
            serde_json::json!({"coordinate": "b2", "item": "Dragon Bone"}),
            "c1",
        ));
        journal.append(Event::new(
            SUBMISSION_APPROVED,
            "submission",
            "sub_1",
            serde_json::json!({"points": 0}),
            "admin",
        ));
        journal.append(Event::new(USER_APPROVED, "user", "zezima", serde_json::json!({}), "admin"));

        let events = journal.events_for("submission", "sub_1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, SUBMISSION_RECORDED);
        assert_eq!(events[0].data["coordinate"], "b2");
        assert_eq!(events[1].actor, "admin");

        assert_eq!(journal.count(USER_APPROVED).unwrap(), 1);
        assert_eq!(journal.recent(1).unwrap()[0].event_type, USER_APPROVED);
    }

    #[test]
    fn test_duplicate_event_id_rejected() {
        let journal = Journal::in_memory().unwrap();
        let event = Event::new(TILE_COMPLETED, "tile", "melon/a1", serde_json::json!({}), "admin");

        journal.record(&event).unwrap();
        assert!(journal.record(&event).is_err());
        journal.append(event);
        assert_eq!(journal.count(TILE_COMPLETED).unwrap(), 1);
    }

    #[test]
    fn test_file_journal_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/journal.db");
        {
            let journal = Journal::open(&path).unwrap();
            journal.append(Event::new(SIGNUP_IMPORTED, "user", "zezima", serde_json::json!({}), "sync"));
        }

        let journal = Journal::open(&path).unwrap();
        assert_eq!(journal.events_for("user", "zezima").unwrap().len(), 1);
    }
}
