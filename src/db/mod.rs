use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User not found")]
    NotFound,
    #[error("User already exists")]
    Conflict,
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A persisted user profile, as stored and as serialized on the wire.
/// `past_illnesses` goes out camelCase for historical API compatibility.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub clerk_id: String,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub gender: String,
    #[serde(rename = "pastIllnesses")]
    pub past_illnesses: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub clerk_id: String,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub gender: String,
    pub past_illnesses: Option<String>,
}

/// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub past_illnesses: Option<String>,
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;

        // Users table
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                clerk_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                age INTEGER NOT NULL,
                gender TEXT NOT NULL,
                past_illnesses TEXT,
                created_at TEXT NOT NULL
            );
            ",
        )?;

        // Chat history table (append-only)
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                message TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS chat_history_user_id ON chat_history(user_id);
            ",
        )?;

        info!("Database initialized: {path}");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // --- Profiles ---

    pub fn create_user(&self, new: &NewProfile) -> Result<UserProfile, StoreError> {
        let conn = self.conn.lock().unwrap();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE clerk_id = ?1",
                params![new.clerk_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::Conflict);
        }

        conn.execute(
            "INSERT INTO users (clerk_id, name, email, age, gender, past_illnesses, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.clerk_id,
                new.name,
                new.email,
                new.age,
                new.gender,
                new.past_illnesses,
                Utc::now(),
            ],
        )
        .map_err(|e| match e {
            // Duplicate email trips the UNIQUE constraint
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict
            }
            e => StoreError::Sqlite(e),
        })?;

        let id = conn.last_insert_rowid();
        info!("Created user profile #{id} (clerk_id: {})", new.clerk_id);

        conn.query_row(
            "SELECT id, clerk_id, name, email, age, gender, past_illnesses, created_at
             FROM users WHERE id = ?1",
            params![id],
            profile_from_row,
        )
        .map_err(StoreError::Sqlite)
    }

    pub fn get_user(&self, clerk_id: &str) -> Result<UserProfile, StoreError> {
        let conn = self.conn.lock().unwrap();
        get_user_on(&conn, clerk_id)
    }

    pub fn update_user(
        &self,
        clerk_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(name) = &update.name {
            sets.push("name = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(age) = update.age {
            sets.push("age = ?");
            values.push(Box::new(age));
        }
        if let Some(gender) = &update.gender {
            sets.push("gender = ?");
            values.push(Box::new(gender.clone()));
        }
        if let Some(past_illnesses) = &update.past_illnesses {
            sets.push("past_illnesses = ?");
            values.push(Box::new(past_illnesses.clone()));
        }

        if !sets.is_empty() {
            let sql = format!("UPDATE users SET {} WHERE clerk_id = ?", sets.join(", "));
            values.push(Box::new(clerk_id.to_string()));
            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(|b| b.as_ref()).collect();
            let affected = conn.execute(&sql, params_refs.as_slice())?;
            if affected == 0 {
                return Err(StoreError::NotFound);
            }
        }

        // Empty update still has to distinguish "unchanged" from "missing"
        get_user_on(&conn, clerk_id)
    }

    // --- Chat history ---

    /// Append one message/response exchange to the log. Append-only;
    /// nothing in this service ever updates or deletes these rows.
    pub fn append_chat(
        &self,
        user_id: i64,
        message: &str,
        response: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_history (user_id, message, response, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, message, response, Utc::now()],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn chat_log(&self, user_id: i64) -> Vec<(String, String)> {
        let conn = self.conn.lock().unwrap();
        conn.prepare(
            "SELECT message, response FROM chat_history WHERE user_id = ?1 ORDER BY id",
        )
        .and_then(|mut stmt| {
            let rows = stmt.query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn chat_log_len(&self) -> i64 {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM chat_history", [], |row| row.get(0))
            .unwrap_or(0)
    }
}

fn get_user_on(conn: &Connection, clerk_id: &str) -> Result<UserProfile, StoreError> {
    conn.query_row(
        "SELECT id, clerk_id, name, email, age, gender, past_illnesses, created_at
         FROM users WHERE clerk_id = ?1",
        params![clerk_id],
        profile_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        e => StoreError::Sqlite(e),
    })
}

fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        clerk_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        age: row.get(4)?,
        gender: row.get(5)?,
        past_illnesses: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        Database::open(path.to_str().unwrap()).unwrap()
    }

    fn ann() -> NewProfile {
        NewProfile {
            clerk_id: "u1".into(),
            name: "Ann".into(),
            email: "a@x.com".into(),
            age: 30,
            gender: "F".into(),
            past_illnesses: None,
        }
    }

    #[test]
    fn create_echoes_input_with_generated_fields() {
        let db = test_db();
        let profile = db.create_user(&ann()).unwrap();

        assert!(profile.id > 0);
        assert_eq!(profile.clerk_id, "u1");
        assert_eq!(profile.name, "Ann");
        assert_eq!(profile.email, "a@x.com");
        assert_eq!(profile.age, 30);
        assert_eq!(profile.gender, "F");
        assert_eq!(profile.past_illnesses, None);
        assert!(profile.created_at <= Utc::now());
    }

    #[test]
    fn duplicate_clerk_id_conflicts_and_leaves_original() {
        let db = test_db();
        db.create_user(&ann()).unwrap();

        let mut dup = ann();
        dup.name = "Other".into();
        dup.email = "other@x.com".into();
        assert!(matches!(db.create_user(&dup), Err(StoreError::Conflict)));

        let stored = db.get_user("u1").unwrap();
        assert_eq!(stored.name, "Ann");
        assert_eq!(stored.email, "a@x.com");
    }

    #[test]
    fn duplicate_email_conflicts() {
        let db = test_db();
        db.create_user(&ann()).unwrap();

        let mut dup = ann();
        dup.clerk_id = "u2".into();
        assert!(matches!(db.create_user(&dup), Err(StoreError::Conflict)));
    }

    #[test]
    fn get_missing_is_not_found() {
        let db = test_db();
        assert!(matches!(db.get_user("ghost"), Err(StoreError::NotFound)));
    }

    #[test]
    fn update_missing_is_not_found() {
        let db = test_db();
        let update = ProfileUpdate {
            age: Some(31),
            ..Default::default()
        };
        assert!(matches!(
            db.update_user("ghost", &update),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn partial_update_changes_only_given_fields() {
        let db = test_db();
        let created = db.create_user(&ann()).unwrap();

        let update = ProfileUpdate {
            age: Some(31),
            past_illnesses: Some("asthma".into()),
            ..Default::default()
        };
        let updated = db.update_user("u1", &update).unwrap();

        assert_eq!(updated.age, 31);
        assert_eq!(updated.past_illnesses.as_deref(), Some("asthma"));
        assert_eq!(updated.name, "Ann");
        assert_eq!(updated.gender, "F");
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn empty_update_leaves_everything_unchanged() {
        let db = test_db();
        let created = db.create_user(&ann()).unwrap();

        let updated = db.update_user("u1", &ProfileUpdate::default()).unwrap();

        assert_eq!(updated.name, created.name);
        assert_eq!(updated.age, created.age);
        assert_eq!(updated.gender, created.gender);
        assert_eq!(updated.past_illnesses, created.past_illnesses);
    }

    #[test]
    fn append_chat_is_append_only() {
        let db = test_db();
        let profile = db.create_user(&ann()).unwrap();

        db.append_chat(profile.id, "What causes a fever?", "Many things.")
            .unwrap();
        db.append_chat(profile.id, "And chills?", "Often the same.")
            .unwrap();

        let log = db.chat_log(profile.id);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "What causes a fever?");
        assert_eq!(log[0].1, "Many things.");
        assert_eq!(log[1].0, "And chills?");
    }

    #[test]
    fn open_bootstrap_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::open(path).unwrap();
            db.create_user(&ann()).unwrap();
        }

        // Reopening must not clobber existing rows
        let db = Database::open(path).unwrap();
        assert_eq!(db.get_user("u1").unwrap().name, "Ann");
    }
}
