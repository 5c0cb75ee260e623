//! Persistent memory: per-user profiles and append-only message history.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::facts::PROFILE_FIELDS;

/// Structured facts about one user, built up incrementally across turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub favorite_color: Option<String>,
    pub favorite_sport: Option<String>,
    pub favorite_anime: Option<String>,
    pub favorite_food: Option<String>,
    pub summary: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl UserProfile {
    /// Non-empty text fields in declaration order, for prompt construction.
    pub fn known_fields(&self) -> Vec<(&'static str, &str)> {
        let candidates: [(&'static str, Option<&str>); 7] = [
            ("name", self.name.as_deref()),
            ("location", self.location.as_deref()),
            ("favorite_color", self.favorite_color.as_deref()),
            ("favorite_sport", self.favorite_sport.as_deref()),
            ("favorite_anime", self.favorite_anime.as_deref()),
            ("favorite_food", self.favorite_food.as_deref()),
            ("summary", self.summary.as_deref()),
        ];
        candidates
            .into_iter()
            .filter_map(|(key, value)| match value {
                Some(v) if !v.is_empty() => Some((key, v)),
                _ => None,
            })
            .collect()
    }
}

/// One turn half. Immutable once created; `id` is the insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub user_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub struct MemoryStore {
    conn: Mutex<Connection>,
}

impl MemoryStore {
    /// Helper to lock the connection
    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))
    }

    /// Create or open the database
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create the database schema
    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT,
                location TEXT,
                favorite_color TEXT,
                favorite_sport TEXT,
                favorite_anime TEXT,
                favorite_food TEXT,
                summary TEXT,
                last_seen TEXT NOT NULL
            )"#,
            [],
        )?;

        conn.execute(
            r#"CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )"#,
            [],
        )?;

        // Index for the recent-history lookup
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_user_created ON messages(user_id, created_at DESC)",
            [],
        )?;

        Ok(())
    }

    /// Fetch the profile for `user_id`, creating an empty one if absent.
    /// Idempotent.
    pub fn get_or_create_user(&self, user_id: &str) -> Result<UserProfile> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (id, last_seen) VALUES (?1, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        let profile = conn.query_row(
            "SELECT id, name, location, favorite_color, favorite_sport, favorite_anime,
                    favorite_food, summary, last_seen
             FROM users WHERE id = ?1",
            params![user_id],
            map_profile_row,
        )?;
        Ok(profile)
    }

    /// Apply a partial profile update. Only allowlisted fields are written,
    /// and an absent or empty value never clears a stored one.
    pub fn update_profile(&self, user_id: &str, updates: &HashMap<&str, String>) -> Result<()> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO users (id, last_seen) VALUES (?1, ?2)",
            params![user_id, now],
        )?;
        for field in PROFILE_FIELDS {
            let Some(value) = updates.get(field) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            // Column name comes from the const allowlist, never from input
            conn.execute(
                &format!("UPDATE users SET {} = ?1 WHERE id = ?2", field),
                params![value, user_id],
            )?;
        }
        conn.execute(
            "UPDATE users SET last_seen = ?1 WHERE id = ?2",
            params![now, user_id],
        )?;
        Ok(())
    }

    /// Append one message to the user's history. Returns the insertion id.
    pub fn add_message(&self, user_id: &str, role: &str, content: &str) -> Result<i64> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO messages (user_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, role, content, now],
        )?;
        let id = conn.last_insert_rowid();
        conn.execute(
            "UPDATE users SET last_seen = ?1 WHERE id = ?2",
            params![now, user_id],
        )?;
        Ok(id)
    }

    /// The most recent `limit` messages for one user, chronological order,
    /// insertion id breaking timestamp ties.
    pub fn get_recent_messages(&self, user_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, role, content, created_at FROM messages
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;

        let messages = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(StoredMessage {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    created_at: parse_timestamp(row, 4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Reverse to get chronological order
        Ok(messages.into_iter().rev().collect())
    }

    /// Profile snapshot without creating the user.
    pub fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, location, favorite_color, favorite_sport, favorite_anime,
                    favorite_food, summary, last_seen
             FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![user_id], map_profile_row)?;
        match rows.next() {
            Some(profile) => Ok(Some(profile?)),
            None => Ok(None),
        }
    }

    /// Replace the stored rolling summary. The caller pre-truncates.
    pub fn set_summary(&self, user_id: &str, summary: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE users SET summary = ?1 WHERE id = ?2",
            params![summary, user_id],
        )?;
        Ok(())
    }
}

fn map_profile_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        favorite_color: row.get(3)?,
        favorite_sport: row.get(4)?,
        favorite_anime: row.get(5)?,
        favorite_food: row.get(6)?,
        summary: row.get(7)?,
        last_seen: parse_timestamp(row, 8)?,
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    row.get::<_, String>(idx)?.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, MemoryStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MemoryStore::new(dir.path().join("memory.db")).expect("store init");
        (dir, store)
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let (_dir, store) = temp_store();
        let first = store.get_or_create_user("u1").expect("create");
        let second = store.get_or_create_user("u1").expect("fetch");
        assert_eq!(first.id, "u1");
        assert_eq!(second.id, "u1");
        assert!(second.name.is_none());
        assert!(store.get_profile("nobody").expect("lookup").is_none());
    }

    #[test]
    fn test_profile_updates_are_additive_only() {
        let (_dir, store) = temp_store();
        store
            .update_profile("u1", &HashMap::from([("name", "Alice".to_string())]))
            .expect("set name");

        // Empty value and absent field must not clear the stored name
        store
            .update_profile(
                "u1",
                &HashMap::from([
                    ("name", "   ".to_string()),
                    ("favorite_color", "green".to_string()),
                ]),
            )
            .expect("second update");

        let profile = store.get_profile("u1").expect("lookup").expect("exists");
        assert_eq!(profile.name.as_deref(), Some("Alice"));
        assert_eq!(profile.favorite_color.as_deref(), Some("green"));
        assert!(profile.location.is_none());
    }

    #[test]
    fn test_update_profile_ignores_unknown_fields() {
        let (_dir, store) = temp_store();
        store
            .update_profile("u1", &HashMap::from([("shoe_size", "44".to_string())]))
            .expect("update");
        let profile = store.get_profile("u1").expect("lookup").expect("exists");
        assert!(profile.known_fields().is_empty());
    }

    #[test]
    fn test_recent_messages_are_scoped_ordered_and_capped() {
        let (_dir, store) = temp_store();
        store.add_message("u1", "user", "one").expect("msg");
        store.add_message("u2", "user", "other user").expect("msg");
        store.add_message("u1", "assistant", "two").expect("msg");
        store.add_message("u1", "user", "three").expect("msg");

        let recent = store.get_recent_messages("u1", 2).expect("history");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "two");
        assert_eq!(recent[1].content, "three");
        assert!(recent.iter().all(|m| m.user_id == "u1"));
        assert!(recent[0].id < recent[1].id);
    }

    #[test]
    fn test_message_ids_follow_insertion_order() {
        let (_dir, store) = temp_store();
        let a = store.add_message("u1", "user", "a").expect("msg");
        let b = store.add_message("u1", "assistant", "b").expect("msg");
        assert!(a < b);
    }

    #[test]
    fn test_set_summary_roundtrip() {
        let (_dir, store) = temp_store();
        store.get_or_create_user("u1").expect("create");
        store
            .set_summary("u1", "User: hi\nAssistant: hello")
            .expect("set");
        let profile = store.get_profile("u1").expect("lookup").expect("exists");
        assert_eq!(
            profile.summary.as_deref(),
            Some("User: hi\nAssistant: hello")
        );
    }

    #[test]
    fn test_known_fields_keeps_declaration_order() {
        let (_dir, store) = temp_store();
        store
            .update_profile(
                "u1",
                &HashMap::from([
                    ("favorite_food", "ramen".to_string()),
                    ("name", "Alice".to_string()),
                ]),
            )
            .expect("update");
        let profile = store.get_profile("u1").expect("lookup").expect("exists");
        let keys: Vec<&str> = profile.known_fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["name", "favorite_food"]);
    }
}
