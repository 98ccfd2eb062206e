//! Chat, message and vote database operations

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};
use serde_json::Value;

use super::super::{Database, format_timestamp, now_timestamp, parse_enum, parse_timestamp};
use crate::models::{Chat, ChatMessage, Visibility, Vote};

impl Database {
    // ============================================
    // Chat methods
    // ============================================

    fn row_to_chat(row: &Row) -> SqliteResult<Chat> {
        let created_at: String = row.get(1)?;
        let visibility: String = row.get(4)?;
        Ok(Chat {
            id: row.get(0)?,
            created_at: parse_timestamp(1, &created_at)?,
            title: row.get(2)?,
            user_id: row.get(3)?,
            visibility: parse_enum(4, &visibility)?,
        })
    }

    pub fn save_chat(&self, id: &str, user_id: &str, title: &str) -> SqliteResult<Chat> {
        let (_, now) = now_timestamp();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO chats (id, created_at, title, user_id, visibility) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, now, title, user_id, Visibility::Private.as_ref()],
        )?;
        drop(conn);

        self.get_chat(id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_chat(&self, id: &str) -> SqliteResult<Option<Chat>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, created_at, title, user_id, visibility FROM chats WHERE id = ?1",
            [id],
            Self::row_to_chat,
        )
        .optional()
    }

    /// List a user's chats, newest first
    pub fn list_chats_for_user(&self, user_id: &str) -> SqliteResult<Vec<Chat>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, created_at, title, user_id, visibility FROM chats
             WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let chats = stmt
            .query_map([user_id], Self::row_to_chat)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(chats)
    }

    /// Delete a chat together with its votes and messages
    pub fn delete_chat(&self, id: &str) -> SqliteResult<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM votes WHERE chat_id = ?1", [id])?;
        tx.execute("DELETE FROM messages WHERE chat_id = ?1", [id])?;
        let rows_affected = tx.execute("DELETE FROM chats WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(rows_affected > 0)
    }

    pub fn update_chat_visibility(&self, id: &str, visibility: Visibility) -> SqliteResult<bool> {
        let conn = self.lock();
        let rows_affected = conn.execute(
            "UPDATE chats SET visibility = ?1 WHERE id = ?2",
            rusqlite::params![visibility.as_ref(), id],
        )?;
        Ok(rows_affected > 0)
    }

    // ============================================
    // Message methods
    // ============================================

    fn row_to_message(row: &Row) -> SqliteResult<ChatMessage> {
        let content: String = row.get(3)?;
        let created_at: String = row.get(4)?;
        Ok(ChatMessage {
            id: row.get(0)?,
            chat_id: row.get(1)?,
            role: row.get(2)?,
            // Content written by older clients may not be JSON; keep it as text
            content: serde_json::from_str(&content).unwrap_or(Value::String(content)),
            created_at: parse_timestamp(4, &created_at)?,
        })
    }

    /// Insert messages in one transaction
    pub fn save_messages(&self, messages: &[ChatMessage]) -> SqliteResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO messages (id, chat_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for message in messages {
                stmt.execute(rusqlite::params![
                    message.id,
                    message.chat_id,
                    message.role,
                    message.content.to_string(),
                    format_timestamp(&message.created_at),
                ])?;
            }
        }
        tx.commit()
    }

    /// Messages of a chat, oldest first
    pub fn get_messages_for_chat(&self, chat_id: &str) -> SqliteResult<Vec<ChatMessage>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, role, content, created_at FROM messages
             WHERE chat_id = ?1 ORDER BY created_at ASC",
        )?;
        let messages = stmt
            .query_map([chat_id], Self::row_to_message)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(messages)
    }

    pub fn get_message(&self, id: &str) -> SqliteResult<Option<ChatMessage>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, chat_id, role, content, created_at FROM messages WHERE id = ?1",
            [id],
            Self::row_to_message,
        )
        .optional()
    }

    /// Delete every message of a chat created at or after `timestamp`
    pub fn delete_messages_after(&self, chat_id: &str, timestamp: &DateTime<Utc>) -> SqliteResult<usize> {
        let conn = self.lock();
        conn.execute(
            "DELETE FROM messages WHERE chat_id = ?1 AND created_at >= ?2",
            rusqlite::params![chat_id, format_timestamp(timestamp)],
        )
    }

    // ============================================
    // Vote methods
    // ============================================

    /// Record an up/down vote, replacing any earlier vote on the message
    pub fn vote_message(&self, chat_id: &str, message_id: &str, is_upvoted: bool) -> SqliteResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO votes (chat_id, message_id, is_upvoted) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id, message_id) DO UPDATE SET is_upvoted = excluded.is_upvoted",
            rusqlite::params![chat_id, message_id, is_upvoted],
        )?;
        Ok(())
    }

    pub fn get_votes_for_chat(&self, chat_id: &str) -> SqliteResult<Vec<Vote>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT chat_id, message_id, is_upvoted FROM votes WHERE chat_id = ?1",
        )?;
        let votes = stmt
            .query_map([chat_id], |row| {
                Ok(Vote {
                    chat_id: row.get(0)?,
                    message_id: row.get(1)?,
                    is_upvoted: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(votes)
    }
}
