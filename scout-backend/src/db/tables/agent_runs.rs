//! Agent run database operations

use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::super::{Database, new_id, now_timestamp, parse_enum, parse_timestamp};
use crate::models::{AgentRun, AgentRunStatus, NewAgentRun};

const AGENT_RUN_COLUMNS: &str =
    "id, agent_id, account_id, chat_id, user_id, search_type, status, created_at, updated_at";

impl Database {
    fn row_to_agent_run(row: &Row) -> SqliteResult<AgentRun> {
        let status: String = row.get(6)?;
        let created_at: String = row.get(7)?;
        let updated_at: String = row.get(8)?;
        Ok(AgentRun {
            id: row.get(0)?,
            agent_id: row.get(1)?,
            account_id: row.get(2)?,
            chat_id: row.get(3)?,
            user_id: row.get(4)?,
            search_type: row.get(5)?,
            status: parse_enum(6, &status)?,
            created_at: parse_timestamp(7, &created_at)?,
            updated_at: parse_timestamp(8, &updated_at)?,
        })
    }

    /// Record a new run; it starts out `active`
    pub fn create_agent_run(&self, user_id: &str, run: &NewAgentRun) -> SqliteResult<AgentRun> {
        let id = new_id();
        let (_, now) = now_timestamp();
        let conn = self.lock();
        conn.execute(
            &format!(
                "INSERT INTO agent_runs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                AGENT_RUN_COLUMNS
            ),
            rusqlite::params![
                id,
                run.agent_id,
                run.account_id,
                run.chat_id,
                user_id,
                run.search_type,
                AgentRunStatus::Active.as_ref(),
                now,
            ],
        )?;
        drop(conn);

        self.get_agent_run(&id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_agent_run(&self, id: &str) -> SqliteResult<Option<AgentRun>> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {} FROM agent_runs WHERE id = ?1", AGENT_RUN_COLUMNS),
            [id],
            Self::row_to_agent_run,
        )
        .optional()
    }

    fn list_agent_runs_where(&self, column: &str, value: &str) -> SqliteResult<Vec<AgentRun>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agent_runs WHERE {} = ?1 ORDER BY created_at DESC",
            AGENT_RUN_COLUMNS, column
        ))?;
        let runs = stmt
            .query_map([value], Self::row_to_agent_run)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(runs)
    }

    pub fn list_agent_runs_for_chat(&self, chat_id: &str) -> SqliteResult<Vec<AgentRun>> {
        self.list_agent_runs_where("chat_id", chat_id)
    }

    /// Runs against an account, newest first
    pub fn list_agent_runs_for_account(&self, account_id: &str) -> SqliteResult<Vec<AgentRun>> {
        self.list_agent_runs_where("account_id", account_id)
    }

    /// Runs of an agent, newest first
    pub fn list_agent_runs_for_agent(&self, agent_id: &str) -> SqliteResult<Vec<AgentRun>> {
        self.list_agent_runs_where("agent_id", agent_id)
    }

    pub fn update_agent_run_status(&self, id: &str, status: AgentRunStatus) -> SqliteResult<Option<AgentRun>> {
        let (_, now) = now_timestamp();
        let conn = self.lock();
        let rows_affected = conn.execute(
            "UPDATE agent_runs SET status = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![status.as_ref(), now, id],
        )?;
        drop(conn);

        if rows_affected == 0 {
            return Ok(None);
        }
        self.get_agent_run(id)
    }
}
