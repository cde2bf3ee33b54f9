use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{Mode, Role};

/// SQLite `CURRENT_TIMESTAMP` layout; lexical order matches time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type StoreResult<T> = std::result::Result<T, StoreError>;

// ============ History Interface ============

/// One line of family history as the agent sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sender_role: String,
    pub caption: Option<String>,
    pub created_at: String,
}

/// Read side of the storage collaborator. Implementations may block.
pub trait HistoryStore: Send + Sync {
    /// Agent-routed messages for the family in the last 24 hours.
    fn recent_conflict_count(&self, family_id: &str) -> StoreResult<i64>;

    /// Feedback rated 2 or lower by the user in the last 7 days.
    fn negative_feedback_count(&self, user_id: &str) -> StoreResult<i64>;

    /// Messages for the family in the last hour.
    fn conversation_depth(&self, family_id: &str) -> StoreResult<i64>;

    /// Newest first.
    fn recent_messages(&self, family_id: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>>;
}

// ============ Records ============

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub family_id: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub family_id: String,
    pub sender_id: String,
    pub image_path: Option<String>,
    pub caption: Option<String>,
    pub ai_response: Option<String>,
    pub ai_mode: Option<String>,
    pub created_at: String,
}

/// A message about to be written. `created_at` defaults to now.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub family_id: String,
    pub sender_id: String,
    pub image_path: Option<String>,
    pub caption: Option<String>,
    pub ai_response: Option<String>,
    pub ai_mode: Option<Mode>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub message_id: String,
    pub user_id: String,
    /// 1..=5
    pub rating: i64,
    pub used_suggestion: bool,
    pub created_at: Option<DateTime<Utc>>,
}

// ============ SQLite Store ============

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    StoreError::Unavailable(format!("cannot create {}: {e}", dir.display()))
                })?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_connection<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&conn)?)
    }

    // ============ Families & Users ============

    pub fn create_family(&self, id: &str, name: Option<&str>) -> StoreResult<()> {
        let now = format_timestamp(Utc::now());
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO families (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![id, name, now],
            )?;
            Ok(())
        })
    }

    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        role: Role,
        family_id: &str,
        avatar_url: Option<&str>,
    ) -> StoreResult<()> {
        let now = format_timestamp(Utc::now());
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, role, family_id, avatar_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, name, role.as_str(), family_id, avatar_url, now],
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let row = self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, name, role, family_id, avatar_url, created_at FROM users WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
        })?;

        row.map(|(id, name, role, family_id, avatar_url, created_at)| -> StoreResult<User> {
            let role = Role::from_str(&role)
                .ok_or_else(|| StoreError::Invalid(format!("user {id} has role '{role}'")))?;
            Ok(User {
                id,
                name,
                role,
                family_id,
                avatar_url,
                created_at,
            })
        })
        .transpose()
    }

    // ============ Messages ============

    /// Persist a message together with the AI suggestion it received.
    pub fn save_message(&self, message: &NewMessage) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let created_at = format_timestamp(message.created_at.unwrap_or_else(Utc::now));
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO messages (id, family_id, sender_id, image_path, caption, ai_response, ai_mode, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    message.family_id,
                    message.sender_id,
                    message.image_path,
                    message.caption,
                    message.ai_response,
                    message.ai_mode.map(|m| m.as_str()),
                    created_at,
                ],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    pub fn get_message(&self, id: &str) -> StoreResult<Option<StoredMessage>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, family_id, sender_id, image_path, caption, ai_response, ai_mode, created_at
                 FROM messages WHERE id = ?1",
                [id],
                |row| {
                    Ok(StoredMessage {
                        id: row.get(0)?,
                        family_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        image_path: row.get(3)?,
                        caption: row.get(4)?,
                        ai_response: row.get(5)?,
                        ai_mode: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()
        })
    }

    // ============ Feedback ============

    pub fn save_feedback(&self, feedback: &NewFeedback) -> StoreResult<String> {
        if !(1..=5).contains(&feedback.rating) {
            return Err(StoreError::Invalid(format!(
                "rating must be 1-5, got {}",
                feedback.rating
            )));
        }
        let id = Uuid::new_v4().to_string();
        let created_at = format_timestamp(feedback.created_at.unwrap_or_else(Utc::now));
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO feedback (id, message_id, user_id, rating, used_suggestion, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    feedback.message_id,
                    feedback.user_id,
                    feedback.rating,
                    feedback.used_suggestion,
                    created_at,
                ],
            )?;
            Ok(())
        })?;
        Ok(id)
    }
}

impl HistoryStore for SqliteStore {
    fn recent_conflict_count(&self, family_id: &str) -> StoreResult<i64> {
        let cutoff = cutoff(Duration::hours(24));
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE family_id = ?1
                 AND ai_mode IN ('agent', 'agent-mock')
                 AND created_at > ?2",
                params![family_id, cutoff],
                |row| row.get(0),
            )
        })
    }

    fn negative_feedback_count(&self, user_id: &str) -> StoreResult<i64> {
        let cutoff = cutoff(Duration::days(7));
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM feedback
                 WHERE user_id = ?1 AND rating <= 2
                 AND created_at > ?2",
                params![user_id, cutoff],
                |row| row.get(0),
            )
        })
    }

    fn conversation_depth(&self, family_id: &str) -> StoreResult<i64> {
        let cutoff = cutoff(Duration::hours(1));
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE family_id = ?1
                 AND created_at > ?2",
                params![family_id, cutoff],
                |row| row.get(0),
            )
        })
    }

    fn recent_messages(&self, family_id: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.role, m.caption, m.created_at
                 FROM messages m
                 JOIN users u ON m.sender_id = u.id
                 WHERE m.family_id = ?1
                 ORDER BY m.created_at DESC
                 LIMIT ?2",
            )?;

            let entries = stmt.query_map(params![family_id, limit as i64], |row| {
                Ok(HistoryEntry {
                    sender_role: row.get(0)?,
                    caption: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?;

            entries.collect()
        })
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS families (
            id TEXT PRIMARY KEY,
            name TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            role TEXT CHECK(role IN ('daughter', 'mother')) NOT NULL,
            family_id TEXT NOT NULL,
            avatar_url TEXT,
            created_at TEXT NOT NULL
        );

        -- Shared photos/captions and the suggestion each one received
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            family_id TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            image_path TEXT,
            caption TEXT,
            ai_response TEXT,
            ai_mode TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (family_id) REFERENCES families(id),
            FOREIGN KEY (sender_id) REFERENCES users(id)
        );

        -- Ratings of AI suggestions
        CREATE TABLE IF NOT EXISTS feedback (
            id TEXT PRIMARY KEY,
            message_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            rating INTEGER CHECK(rating BETWEEN 1 AND 5),
            used_suggestion INTEGER DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (message_id) REFERENCES messages(id)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_family_time ON messages(family_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_feedback_user_time ON feedback(user_id, created_at);
        ",
    )
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn cutoff(window: Duration) -> String {
    format_timestamp(Utc::now() - window)
}
