//! User database operations (registration and password checks)

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};
use sha2::Sha256;

use super::super::{Database, new_id, now_timestamp, parse_timestamp};
use crate::models::User;

#[cfg(not(test))]
const PBKDF2_ITERATIONS: u32 = 100_000;
#[cfg(test)]
const PBKDF2_ITERATIONS: u32 = 1_000;
const SALT_SIZE: usize = 16;
const HASH_SIZE: usize = 32;

/// Hash a password as `hex(salt)$hex(derived_key)`
fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let derived = derive_key(password, &salt);
    format!("{}${}", hex::encode(salt), hex::encode(derived))
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; HASH_SIZE] {
    let mut derived = [0u8; HASH_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut derived);
    derived
}

fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return false;
    };
    let derived = derive_key(password, &salt);
    if expected.len() != derived.len() {
        return false;
    }
    // Constant-time comparison
    expected
        .iter()
        .zip(derived.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

impl Database {
    fn row_to_user(row: &Row) -> SqliteResult<User> {
        let created_at: String = row.get(3)?;
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password: row.get(2)?,
            created_at: parse_timestamp(3, &created_at)?,
        })
    }

    /// Create a user with a hashed password
    pub fn create_user(&self, email: &str, password: &str) -> SqliteResult<User> {
        let id = new_id();
        let (_, now) = now_timestamp();
        let hash = hash_password(password);

        let conn = self.lock();
        conn.execute(
            "INSERT INTO users (id, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, email, hash, now],
        )?;
        drop(conn);

        self.get_user(&id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_user(&self, id: &str) -> SqliteResult<Option<User>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, email, password, created_at FROM users WHERE id = ?1",
            [id],
            Self::row_to_user,
        )
        .optional()
    }

    /// Emails are matched case-insensitively
    pub fn get_user_by_email(&self, email: &str) -> SqliteResult<Option<User>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, email, password, created_at FROM users WHERE lower(email) = lower(?1)",
            [email],
            Self::row_to_user,
        )
        .optional()
    }

    /// Return the user if the email exists and the password matches
    pub fn verify_user_password(&self, email: &str, password: &str) -> SqliteResult<Option<User>> {
        let user = self.get_user_by_email(email)?;
        Ok(user.filter(|u| {
            u.password
                .as_deref()
                .map(|stored| verify_password(password, stored))
                .unwrap_or(false)
        }))
    }
}
