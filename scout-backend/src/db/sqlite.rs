//! SQLite database - schema definitions and connection management
//!
//! This file contains:
//! - Database struct definition
//! - Connection management (new, init)
//! - Schema creation and migrations
//! - Timestamp helpers shared by the table modules
//!
//! All database operations are in the tables/ subdirectory.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use std::str::FromStr;

/// Main database wrapper; a single connection serialized by a Mutex
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Create a new database connection and initialize schema
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    log::warn!("Failed to create database directory {:?}: {}", parent, e);
                }
            }
        }

        let conn = Connection::open(database_url)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Cheap round trip used by the health check
    pub fn ping(&self) -> SqliteResult<()> {
        let conn = self.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Initialize all database tables and run migrations
    fn init(&self) -> SqliteResult<()> {
        let conn = self.lock();

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Users table (email + salted password hash)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // Auth sessions table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS auth_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT UNIQUE NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Chats table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY NOT NULL,
                created_at TEXT NOT NULL,
                title TEXT NOT NULL,
                user_id TEXT NOT NULL,
                visibility TEXT NOT NULL DEFAULT 'private' CHECK (visibility IN ('public', 'private')),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Chat messages; content is a JSON document (string or array of parts)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY NOT NULL,
                chat_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS votes (
                chat_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                is_upvoted INTEGER NOT NULL,
                PRIMARY KEY (chat_id, message_id),
                FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE,
                FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Documents are versioned: one row per (id, created_at)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT,
                kind TEXT NOT NULL DEFAULT 'text' CHECK (kind IN ('text', 'code', 'spreadsheet')),
                user_id TEXT NOT NULL,
                PRIMARY KEY (id, created_at),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS suggestions (
                id TEXT PRIMARY KEY NOT NULL,
                document_id TEXT NOT NULL,
                document_created_at TEXT NOT NULL,
                original_text TEXT NOT NULL,
                suggested_text TEXT NOT NULL,
                description TEXT,
                is_resolved INTEGER NOT NULL DEFAULT 0,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (document_id, document_created_at) REFERENCES documents(id, created_at) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // The signed-in user's own company profile
        conn.execute(
            "CREATE TABLE IF NOT EXISTS companies (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                use_case TEXT NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                instructions TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                search_type TEXT NOT NULL DEFAULT 'web-search',
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                website TEXT NOT NULL,
                industry TEXT,
                description TEXT,
                logo TEXT,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_runs (
                id TEXT PRIMARY KEY NOT NULL,
                agent_id TEXT NOT NULL,
                account_id TEXT NOT NULL,
                chat_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                search_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(id) ON DELETE CASCADE,
                FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE,
                FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // Model-generated company summaries, cached per website
        conn.execute(
            "CREATE TABLE IF NOT EXISTS company_info (
                id TEXT PRIMARY KEY NOT NULL,
                website TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                industry TEXT NOT NULL,
                products TEXT NOT NULL,
                unique_features TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Migration: Add visibility column to chats if it doesn't exist (for old DBs)
        if !column_exists(&conn, "chats", "visibility") {
            conn.execute(
                "ALTER TABLE chats ADD COLUMN visibility TEXT NOT NULL DEFAULT 'private'",
                [],
            )?;
        }

        // Migration: Add search_type column to agents if it doesn't exist (for old DBs)
        if !column_exists(&conn, "agents", "search_type") {
            conn.execute(
                "ALTER TABLE agents ADD COLUMN search_type TEXT NOT NULL DEFAULT 'web-search'",
                [],
            )?;
        }

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_agents_user_id ON agents(user_id);
             CREATE INDEX IF NOT EXISTS idx_accounts_user_id ON accounts(user_id);
             CREATE INDEX IF NOT EXISTS idx_accounts_name ON accounts(name);
             CREATE INDEX IF NOT EXISTS idx_accounts_website ON accounts(website);
             CREATE INDEX IF NOT EXISTS idx_agent_runs_agent_id ON agent_runs(agent_id);
             CREATE INDEX IF NOT EXISTS idx_agent_runs_account_id ON agent_runs(account_id);
             CREATE INDEX IF NOT EXISTS idx_agent_runs_chat_id ON agent_runs(chat_id);
             CREATE INDEX IF NOT EXISTS idx_agent_runs_user_id ON agent_runs(user_id);
             CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id, created_at);
             CREATE INDEX IF NOT EXISTS idx_company_info_website ON company_info(website);",
        )?;

        Ok(())
    }
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get::<_, i64>(0),
    )
    .map(|c| c > 0)
    .unwrap_or(false)
}

/// Canonical text form for stored timestamps. Fixed precision and a `Z`
/// suffix keep lexicographic order equal to chronological order.
pub(crate) fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time truncated to the stored precision, with its text form
pub(crate) fn now_timestamp() -> (DateTime<Utc>, String) {
    let now = Utc::now().trunc_subsecs(6);
    let text = format_timestamp(&now);
    (now, text)
}

/// Parse a stored timestamp column, reporting the column index on failure
pub(crate) fn parse_timestamp(idx: usize, value: &str) -> SqliteResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse a stored string-enum column, reporting the column index on failure
pub(crate) fn parse_enum<T>(idx: usize, value: &str) -> SqliteResult<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
