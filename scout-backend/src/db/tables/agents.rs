//! Agent database operations

use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::super::{Database, new_id, now_timestamp, parse_timestamp};
use crate::models::{Agent, AgentUpdate, NewAgent};

const AGENT_COLUMNS: &str =
    "id, name, description, instructions, is_active, search_type, user_id, created_at, updated_at";

impl Database {
    fn row_to_agent(row: &Row) -> SqliteResult<Agent> {
        let created_at: String = row.get(7)?;
        let updated_at: String = row.get(8)?;
        Ok(Agent {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            instructions: row.get(3)?,
            is_active: row.get(4)?,
            search_type: row.get(5)?,
            user_id: row.get(6)?,
            created_at: parse_timestamp(7, &created_at)?,
            updated_at: parse_timestamp(8, &updated_at)?,
        })
    }

    pub fn create_agent(&self, user_id: &str, agent: &NewAgent) -> SqliteResult<Agent> {
        let id = new_id();
        let (_, now) = now_timestamp();
        let conn = self.lock();
        conn.execute(
            &format!(
                "INSERT INTO agents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                AGENT_COLUMNS
            ),
            rusqlite::params![
                id,
                agent.name,
                agent.description,
                agent.instructions,
                agent.is_active,
                agent.search_type,
                user_id,
                now,
            ],
        )?;
        drop(conn);

        self.get_agent(&id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// List a user's agents, newest first
    pub fn list_agents_for_user(&self, user_id: &str) -> SqliteResult<Vec<Agent>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agents WHERE user_id = ?1 ORDER BY created_at DESC",
            AGENT_COLUMNS
        ))?;
        let agents = stmt
            .query_map([user_id], Self::row_to_agent)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(agents)
    }

    pub fn get_agent(&self, id: &str) -> SqliteResult<Option<Agent>> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
            [id],
            Self::row_to_agent,
        )
        .optional()
    }

    /// Apply a partial update and bump `updated_at`. Returns `None` if the agent doesn't exist.
    pub fn update_agent(&self, id: &str, update: &AgentUpdate) -> SqliteResult<Option<Agent>> {
        let (_, now) = now_timestamp();
        let conn = self.lock();
        let rows_affected = conn.execute(
            "UPDATE agents SET
                name = COALESCE(?1, name),
                description = COALESCE(?2, description),
                instructions = COALESCE(?3, instructions),
                is_active = COALESCE(?4, is_active),
                search_type = COALESCE(?5, search_type),
                updated_at = ?6
             WHERE id = ?7",
            rusqlite::params![
                update.name,
                update.description,
                update.instructions,
                update.is_active,
                update.search_type,
                now,
                id,
            ],
        )?;
        drop(conn);

        if rows_affected == 0 {
            return Ok(None);
        }
        self.get_agent(id)
    }

    pub fn delete_agent(&self, id: &str) -> SqliteResult<bool> {
        let conn = self.lock();
        let rows_affected = conn.execute("DELETE FROM agents WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }
}
