use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentRunStatus {
    #[default]
    Active,
    Completed,
    Failed,
}

/// Links one agent invocation against an account to the chat it produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRun {
    pub id: String,
    pub agent_id: String,
    pub account_id: String,
    pub chat_id: String,
    pub user_id: String,
    pub search_type: String,
    pub status: AgentRunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAgentRun {
    pub agent_id: String,
    pub account_id: String,
    pub chat_id: String,
    pub search_type: String,
}
