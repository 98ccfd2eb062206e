use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_SEARCH_TYPE: &str = "web-search";

/// How an agent's chat gathers information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    WebSearch,
    DeepResearch,
}

impl SearchMode {
    /// Anything other than `deep-research` runs as a plain web search
    pub fn from_search_type(search_type: &str) -> Self {
        if search_type == "deep-research" {
            SearchMode::DeepResearch
        } else {
            SearchMode::WebSearch
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::WebSearch => "web-search",
            SearchMode::DeepResearch => "deep-research",
        }
    }

    /// Tool names the chat client activates for this mode
    pub fn active_tools(&self) -> &'static [&'static str] {
        match self {
            SearchMode::WebSearch => &["search"],
            SearchMode::DeepResearch => &["deepResearch"],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub instructions: String,
    pub is_active: bool,
    pub search_type: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAgent {
    pub name: String,
    pub description: Option<String>,
    pub instructions: String,
    pub is_active: bool,
    pub search_type: String,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub is_active: Option<bool>,
    pub search_type: Option<String>,
}
