//! Document version and suggestion database operations

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::super::{Database, format_timestamp, new_id, now_timestamp, parse_enum, parse_timestamp};
use crate::models::{Document, DocumentKind, NewSuggestion, Suggestion};

const DOCUMENT_COLUMNS: &str = "id, created_at, title, content, kind, user_id";
const SUGGESTION_COLUMNS: &str = "id, document_id, document_created_at, original_text, suggested_text,
     description, is_resolved, user_id, created_at";

impl Database {
    fn row_to_document(row: &Row) -> SqliteResult<Document> {
        let created_at: String = row.get(1)?;
        let kind: String = row.get(4)?;
        Ok(Document {
            id: row.get(0)?,
            created_at: parse_timestamp(1, &created_at)?,
            title: row.get(2)?,
            content: row.get(3)?,
            kind: parse_enum(4, &kind)?,
            user_id: row.get(5)?,
        })
    }

    fn row_to_suggestion(row: &Row) -> SqliteResult<Suggestion> {
        let document_created_at: String = row.get(2)?;
        let created_at: String = row.get(8)?;
        Ok(Suggestion {
            id: row.get(0)?,
            document_id: row.get(1)?,
            document_created_at: parse_timestamp(2, &document_created_at)?,
            original_text: row.get(3)?,
            suggested_text: row.get(4)?,
            description: row.get(5)?,
            is_resolved: row.get(6)?,
            user_id: row.get(7)?,
            created_at: parse_timestamp(8, &created_at)?,
        })
    }

    /// Save a new version of a document. Versions are keyed by timestamp, so
    /// a new one always lands strictly after the latest.
    pub fn save_document(
        &self,
        id: &str,
        title: &str,
        kind: DocumentKind,
        content: Option<&str>,
        user_id: &str,
    ) -> SqliteResult<Document> {
        let (now, _) = now_timestamp();
        let conn = self.lock();
        let latest: Option<String> =
            conn.query_row("SELECT MAX(created_at) FROM documents WHERE id = ?1", [id], |row| row.get(0))?;
        let created_at = match latest {
            Some(latest) => now.max(parse_timestamp(0, &latest)? + Duration::microseconds(1)),
            None => now,
        };
        let created_at_text = format_timestamp(&created_at);
        conn.execute(
            "INSERT INTO documents (id, created_at, title, content, kind, user_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![id, created_at_text, title, content, kind.as_ref(), user_id],
        )?;

        Ok(Document {
            id: id.to_string(),
            created_at,
            title: title.to_string(),
            content: content.map(str::to_string),
            kind,
            user_id: user_id.to_string(),
        })
    }

    /// All versions of a document, oldest first
    pub fn get_document_versions(&self, id: &str) -> SqliteResult<Vec<Document>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE id = ?1 ORDER BY created_at ASC",
            DOCUMENT_COLUMNS
        ))?;
        let documents = stmt
            .query_map([id], Self::row_to_document)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(documents)
    }

    pub fn get_latest_document(&self, id: &str) -> SqliteResult<Option<Document>> {
        let conn = self.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM documents WHERE id = ?1 ORDER BY created_at DESC LIMIT 1",
                DOCUMENT_COLUMNS
            ),
            [id],
            Self::row_to_document,
        )
        .optional()
    }

    /// Delete document versions created strictly after `timestamp`, together
    /// with the suggestions made against them. Returns the number of versions removed.
    pub fn delete_document_versions_after(&self, id: &str, timestamp: &DateTime<Utc>) -> SqliteResult<usize> {
        let cutoff = format_timestamp(timestamp);
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM suggestions WHERE document_id = ?1 AND document_created_at > ?2",
            rusqlite::params![id, cutoff],
        )?;
        let removed = tx.execute(
            "DELETE FROM documents WHERE id = ?1 AND created_at > ?2",
            rusqlite::params![id, cutoff],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    /// Attach suggestions to one document version
    pub fn save_suggestions(
        &self,
        document: &Document,
        suggestions: &[NewSuggestion],
        user_id: &str,
    ) -> SqliteResult<Vec<Suggestion>> {
        let (created_at, created_at_text) = now_timestamp();
        let document_created_at = format_timestamp(&document.created_at);
        let mut saved = Vec::with_capacity(suggestions.len());

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO suggestions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)",
                SUGGESTION_COLUMNS
            ))?;
            for suggestion in suggestions {
                let id = new_id();
                stmt.execute(rusqlite::params![
                    id,
                    document.id,
                    document_created_at,
                    suggestion.original_text,
                    suggestion.suggested_text,
                    suggestion.description,
                    user_id,
                    created_at_text,
                ])?;
                saved.push(Suggestion {
                    id,
                    document_id: document.id.clone(),
                    document_created_at: document.created_at,
                    original_text: suggestion.original_text.clone(),
                    suggested_text: suggestion.suggested_text.clone(),
                    description: suggestion.description.clone(),
                    is_resolved: false,
                    user_id: user_id.to_string(),
                    created_at,
                });
            }
        }
        tx.commit()?;
        Ok(saved)
    }

    pub fn get_suggestions_for_document(&self, document_id: &str) -> SqliteResult<Vec<Suggestion>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM suggestions WHERE document_id = ?1 ORDER BY created_at ASC",
            SUGGESTION_COLUMNS
        ))?;
        let suggestions = stmt
            .query_map([document_id], Self::row_to_suggestion)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(suggestions)
    }
}
