//! Account database operations

use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::super::{Database, new_id, now_timestamp, parse_timestamp};
use crate::models::{Account, AccountUpdate, NewAccount};

const ACCOUNT_COLUMNS: &str =
    "id, name, website, industry, description, logo, user_id, created_at, updated_at";
const SEARCH_LIMIT: i64 = 10;

/// Escape LIKE wildcards so the query matches literally (used with `ESCAPE '\'`)
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Database {
    fn row_to_account(row: &Row) -> SqliteResult<Account> {
        let created_at: String = row.get(7)?;
        let updated_at: String = row.get(8)?;
        Ok(Account {
            id: row.get(0)?,
            name: row.get(1)?,
            website: row.get(2)?,
            industry: row.get(3)?,
            description: row.get(4)?,
            logo: row.get(5)?,
            user_id: row.get(6)?,
            created_at: parse_timestamp(7, &created_at)?,
            updated_at: parse_timestamp(8, &updated_at)?,
        })
    }

    pub fn create_account(&self, user_id: &str, account: &NewAccount) -> SqliteResult<Account> {
        let id = new_id();
        let (_, now) = now_timestamp();
        let conn = self.lock();
        conn.execute(
            &format!(
                "INSERT INTO accounts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                ACCOUNT_COLUMNS
            ),
            rusqlite::params![
                id,
                account.name,
                account.website,
                account.industry,
                account.description,
                account.logo,
                user_id,
                now,
            ],
        )?;
        drop(conn);

        self.get_account(&id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// List a user's accounts, newest first
    pub fn list_accounts_for_user(&self, user_id: &str) -> SqliteResult<Vec<Account>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE user_id = ?1 ORDER BY created_at DESC",
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map([user_id], Self::row_to_account)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(accounts)
    }

    pub fn get_account(&self, id: &str) -> SqliteResult<Option<Account>> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
            [id],
            Self::row_to_account,
        )
        .optional()
    }

    /// Apply a partial update and bump `updated_at`. An empty website is
    /// ignored so the column never ends up blank.
    pub fn update_account(&self, id: &str, update: &AccountUpdate) -> SqliteResult<Option<Account>> {
        let website = update.website.as_deref().filter(|w| !w.trim().is_empty());
        let (_, now) = now_timestamp();
        let conn = self.lock();
        let rows_affected = conn.execute(
            "UPDATE accounts SET
                name = COALESCE(?1, name),
                website = COALESCE(?2, website),
                industry = COALESCE(?3, industry),
                description = COALESCE(?4, description),
                logo = COALESCE(?5, logo),
                updated_at = ?6
             WHERE id = ?7",
            rusqlite::params![
                update.name,
                website,
                update.industry,
                update.description,
                update.logo,
                now,
                id,
            ],
        )?;
        drop(conn);

        if rows_affected == 0 {
            return Ok(None);
        }
        self.get_account(id)
    }

    pub fn delete_account(&self, id: &str) -> SqliteResult<bool> {
        let conn = self.lock();
        let rows_affected = conn.execute("DELETE FROM accounts WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }

    /// Case-insensitive name search over a user's accounts, newest first
    pub fn search_accounts(&self, query: &str, user_id: &str) -> SqliteResult<Vec<Account>> {
        let pattern = format!("%{}%", escape_like(query));
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts
             WHERE user_id = ?1 AND name LIKE ?2 ESCAPE '\\'
             ORDER BY created_at DESC LIMIT ?3",
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map(rusqlite::params![user_id, pattern, SEARCH_LIMIT], Self::row_to_account)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(accounts)
    }
}
