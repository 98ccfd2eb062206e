pub mod accounts;
pub mod agent_runs;
pub mod agents;
pub mod auth;
pub mod chat;
pub mod company;
pub mod company_info;
pub mod documents;
pub mod health;
pub mod models;
pub mod vote;

use actix_web::{http::StatusCode, HttpResponse};
use rusqlite::Result as SqliteResult;

use crate::models::{Owned, User};

/// `{"error": message}` with the given status
pub(crate) fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "error": message }))
}

pub(crate) fn forbidden() -> HttpResponse {
    error_response(StatusCode::FORBIDDEN, "Forbidden")
}

/// Log a failed database call and return the generic 500 for `action`
pub(crate) fn db_error(action: &str, e: rusqlite::Error) -> HttpResponse {
    log::error!("Failed to {}: {}", action, e);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &format!("Failed to {}", action),
    )
}

/// Unwrap a row lookup that must exist and belong to `user`
pub(crate) fn require_owned<T: Owned>(
    found: SqliteResult<Option<T>>,
    user: &User,
    not_found: &str,
    action: &str,
) -> Result<T, HttpResponse> {
    match found {
        Ok(Some(row)) if row.owner_id() == user.id => Ok(row),
        Ok(Some(_)) => Err(forbidden()),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, not_found)),
        Err(e) => Err(db_error(action, e)),
    }
}
