use chrono::{DateTime, Utc};
use serde::Serialize;

/// A customer/company record owned by a user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub website: String,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub website: String,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
}
