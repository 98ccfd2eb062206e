use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login session backing the `session` cookie / bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
