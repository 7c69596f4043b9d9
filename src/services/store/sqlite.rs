use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info};

use super::{apply_analysis_update, apply_dataset_update, apply_user_update, newest_first, Store};
use crate::error::{AppError, AppResult};
use crate::models::{
    Analysis, AnalysisUpdate, ChatMessage, Dataset, DatasetUpdate, User, UserUpdate,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        body TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS datasets (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        body TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS datasets_user ON datasets (user_id);
    CREATE TABLE IF NOT EXISTS analyses (
        id TEXT PRIMARY KEY,
        dataset_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        body TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS analyses_dataset ON analyses (dataset_id);
    CREATE INDEX IF NOT EXISTS analyses_user ON analyses (user_id);
    CREATE TABLE IF NOT EXISTS files (
        path TEXT PRIMARY KEY,
        content TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS chat_messages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        body TEXT NOT NULL
    );
";

/// Store backed by a single SQLite connection. Records are kept as JSON
/// bodies next to the columns used for lookups.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> AppResult<Self> {
        info!("Opening SQLite store at {}", path);
        let conn = Connection::open(path).map_err(|e| {
            error!("Failed to open database {}: {}", path, e);
            AppError::DatabaseError(e.to_string())
        })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)?;
        debug!("SQLite schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn fetch_one<T: DeserializeOwned>(&self, sql: &str, key: &str) -> AppResult<Option<T>> {
        let conn = self.conn.lock();
        let body: Option<String> = conn
            .query_row(sql, [key], |row| row.get(0))
            .optional()?;
        body.map(|b| decode(&b)).transpose()
    }

    fn fetch_all<T: DeserializeOwned>(&self, sql: &str, key: &str) -> AppResult<Vec<T>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let bodies = stmt
            .query_map([key], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies.iter().map(|b| decode(b)).collect()
    }

    fn delete_dataset_rows(conn: &Connection, id: &str) -> AppResult<bool> {
        let body: Option<String> = conn
            .query_row("SELECT body FROM datasets WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        let Some(body) = body else {
            return Ok(false);
        };
        let dataset: Dataset = decode(&body)?;

        conn.execute("DELETE FROM files WHERE path = ?1", [&dataset.storage_path])?;
        conn.execute("DELETE FROM analyses WHERE dataset_id = ?1", [id])?;
        conn.execute("DELETE FROM datasets WHERE id = ?1", [id])?;
        Ok(true)
    }
}

fn encode<T: Serialize>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: DeserializeOwned>(body: &str) -> AppResult<T> {
    serde_json::from_str(body)
        .map_err(|e| AppError::DatabaseError(format!("Corrupt record: {}", e)))
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let body = encode(&user)?;
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (id, email, body) VALUES (?1, ?2, ?3)",
            params![user.id, user.email.to_lowercase(), body],
        )?;
        if inserted == 0 {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        self.fetch_one("SELECT body FROM users WHERE id = ?1", id)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.fetch_one(
            "SELECT body FROM users WHERE email = ?1",
            &email.to_lowercase(),
        )
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> AppResult<Option<User>> {
        let Some(mut user) = self.get_user(id).await? else {
            return Ok(None);
        };
        apply_user_update(&mut user, update);
        let body = encode(&user)?;
        self.conn
            .lock()
            .execute("UPDATE users SET body = ?2 WHERE id = ?1", params![id, body])?;
        Ok(Some(user))
    }

    async fn delete_user(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let dataset_ids: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM datasets WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };
        for dataset_id in &dataset_ids {
            Self::delete_dataset_rows(&tx, dataset_id)?;
        }
        tx.execute("DELETE FROM chat_messages WHERE user_id = ?1", [id])?;
        let removed = tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
        tx.commit()?;

        Ok(removed > 0)
    }

    async fn create_dataset(&self, dataset: Dataset) -> AppResult<Dataset> {
        let body = encode(&dataset)?;
        self.conn.lock().execute(
            "INSERT INTO datasets (id, user_id, body) VALUES (?1, ?2, ?3)",
            params![dataset.id, dataset.user_id, body],
        )?;
        Ok(dataset)
    }

    async fn get_dataset(&self, id: &str) -> AppResult<Option<Dataset>> {
        self.fetch_one("SELECT body FROM datasets WHERE id = ?1", id)
    }

    async fn list_datasets_by_user(&self, user_id: &str) -> AppResult<Vec<Dataset>> {
        let mut datasets: Vec<Dataset> =
            self.fetch_all("SELECT body FROM datasets WHERE user_id = ?1", user_id)?;
        newest_first(&mut datasets, |d| d.created_at);
        Ok(datasets)
    }

    async fn update_dataset(&self, id: &str, update: DatasetUpdate) -> AppResult<Option<Dataset>> {
        let Some(mut dataset) = self.get_dataset(id).await? else {
            return Ok(None);
        };
        apply_dataset_update(&mut dataset, update);
        let body = encode(&dataset)?;
        self.conn
            .lock()
            .execute("UPDATE datasets SET body = ?2 WHERE id = ?1", params![id, body])?;
        Ok(Some(dataset))
    }

    async fn delete_dataset(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = Self::delete_dataset_rows(&tx, id)?;
        tx.commit()?;
        Ok(removed)
    }

    async fn create_analysis(&self, analysis: Analysis) -> AppResult<Analysis> {
        let body = encode(&analysis)?;
        self.conn.lock().execute(
            "INSERT INTO analyses (id, dataset_id, user_id, body) VALUES (?1, ?2, ?3, ?4)",
            params![analysis.id, analysis.dataset_id, analysis.user_id, body],
        )?;
        Ok(analysis)
    }

    async fn get_analysis(&self, id: &str) -> AppResult<Option<Analysis>> {
        self.fetch_one("SELECT body FROM analyses WHERE id = ?1", id)
    }

    async fn list_analyses_by_dataset(&self, dataset_id: &str) -> AppResult<Vec<Analysis>> {
        let mut analyses: Vec<Analysis> =
            self.fetch_all("SELECT body FROM analyses WHERE dataset_id = ?1", dataset_id)?;
        newest_first(&mut analyses, |a| a.created_at);
        Ok(analyses)
    }

    async fn list_analyses_by_user(&self, user_id: &str) -> AppResult<Vec<Analysis>> {
        let mut analyses: Vec<Analysis> =
            self.fetch_all("SELECT body FROM analyses WHERE user_id = ?1", user_id)?;
        newest_first(&mut analyses, |a| a.created_at);
        Ok(analyses)
    }

    async fn update_analysis(&self, id: &str, update: AnalysisUpdate) -> AppResult<Option<Analysis>> {
        let Some(mut analysis) = self.get_analysis(id).await? else {
            return Ok(None);
        };
        apply_analysis_update(&mut analysis, update);
        let body = encode(&analysis)?;
        self.conn
            .lock()
            .execute("UPDATE analyses SET body = ?2 WHERE id = ?1", params![id, body])?;
        Ok(Some(analysis))
    }

    async fn delete_analysis(&self, id: &str) -> AppResult<bool> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM analyses WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    async fn store_file(&self, path: &str, content: String) -> AppResult<()> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO files (path, content) VALUES (?1, ?2)",
            params![path, content],
        )?;
        Ok(())
    }

    async fn get_file(&self, path: &str) -> AppResult<Option<String>> {
        let conn = self.conn.lock();
        let content = conn
            .query_row("SELECT content FROM files WHERE path = ?1", [path], |row| row.get(0))
            .optional()?;
        Ok(content)
    }

    async fn delete_file(&self, path: &str) -> AppResult<bool> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM files WHERE path = ?1", [path])?;
        Ok(removed > 0)
    }

    async fn add_chat_message(&self, message: ChatMessage) -> AppResult<ChatMessage> {
        let body = encode(&message)?;
        self.conn.lock().execute(
            "INSERT INTO chat_messages (user_id, body) VALUES (?1, ?2)",
            params![message.user_id, body],
        )?;
        Ok(message)
    }

    async fn chat_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT body FROM (
                SELECT seq, body FROM chat_messages WHERE user_id = ?1
                ORDER BY seq DESC LIMIT ?2
            ) ORDER BY seq ASC",
        )?;
        let bodies = stmt
            .query_map(params![user_id, limit as i64], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies.iter().map(|b| decode(b)).collect()
    }

    async fn clear_chat_history(&self, user_id: &str) -> AppResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM chat_messages WHERE user_id = ?1", [user_id])?;
        Ok(())
    }
}
