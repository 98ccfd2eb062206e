//! Auth session database operations

use chrono::{Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use rusqlite::{OptionalExtension, Result as SqliteResult};

use super::super::{Database, format_timestamp, now_timestamp, parse_timestamp};
use crate::models::{Session, User};

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Database {
    /// Create a new login session for a user
    pub fn create_session(&self, user_id: &str, ttl_hours: i64) -> SqliteResult<Session> {
        let token = generate_token();
        let (created_at, _) = now_timestamp();
        let expires_at = Duration::try_hours(ttl_hours)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                rusqlite::Error::ToSqlConversionFailure(
                    format!("session lifetime of {} hours is out of range", ttl_hours).into(),
                )
            })?;

        let conn = self.lock();
        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                token,
                user_id,
                format_timestamp(&created_at),
                format_timestamp(&expires_at)
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Session {
            id,
            token,
            user_id: user_id.to_string(),
            created_at,
            expires_at,
        })
    }

    /// Resolve a session token to its user. Expired sessions are deleted and
    /// treated as absent.
    pub fn validate_session(&self, token: &str) -> SqliteResult<Option<User>> {
        let conn = self.lock();

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT user_id, expires_at FROM auth_sessions WHERE token = ?1",
                [token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((user_id, expires_at)) = row else {
            return Ok(None);
        };

        if parse_timestamp(1, &expires_at)? <= Utc::now() {
            conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [token])?;
            return Ok(None);
        }
        drop(conn);

        self.get_user(&user_id)
    }

    pub fn delete_session(&self, token: &str) -> SqliteResult<bool> {
        let conn = self.lock();
        let rows_affected = conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [token])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let db = Database::new(":memory:").unwrap();
        let user = db.create_user("ada@example.com", "secret1").unwrap();

        let session = db.create_session(&user.id, 1).unwrap();
        assert_eq!(session.token.len(), 64);

        let resolved = db.validate_session(&session.token).unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));

        assert!(db.delete_session(&session.token).unwrap());
        assert!(db.validate_session(&session.token).unwrap().is_none());
        assert!(!db.delete_session(&session.token).unwrap());
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let db = Database::new(":memory:").unwrap();
        let user = db.create_user("ada@example.com", "secret1").unwrap();
        let session = db.create_session(&user.id, -1).unwrap();

        assert!(db.validate_session(&session.token).unwrap().is_none());
        // Expired row was cleaned up
        assert!(!db.delete_session(&session.token).unwrap());
    }

    #[test]
    fn test_out_of_range_ttl_is_an_error() {
        let db = Database::new(":memory:").unwrap();
        let user = db.create_user("ada@example.com", "secret1").unwrap();

        assert!(db.create_session(&user.id, 10_000_000_000_000).is_err());
        assert!(db.create_session(&user.id, i64::MAX).is_err());
    }

    #[test]
    fn test_unknown_token() {
        let db = Database::new(":memory:").unwrap();
        assert!(db.validate_session("nope").unwrap().is_none());
    }
}
