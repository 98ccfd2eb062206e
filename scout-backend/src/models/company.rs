use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in user's own company profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub description: String,
    pub use_case: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary of a website's company, generated once by the language model and cached
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub id: String,
    pub website: String,
    pub name: String,
    pub description: String,
    pub industry: String,
    pub products: String,
    pub unique_features: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields the model is asked to produce for a website. All are required;
/// a reply missing any of them is treated as unparseable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfoFields {
    pub name: String,
    pub description: String,
    pub industry: String,
    pub products: String,
    pub unique_features: String,
}
