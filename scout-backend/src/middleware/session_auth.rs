// Session authentication helpers
// Protected controllers call `require_user` at the top of each handler and
// return the error response as-is when it fails.

use actix_web::{HttpRequest, HttpResponse};

use crate::db::Database;
use crate::models::User;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Read the session token from `Authorization: Bearer` or the session cookie
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|s| !s.is_empty())
    })
}

pub fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "error": "Unauthorized"
    }))
}

/// Resolve the request's session to its user
pub fn require_user(db: &Database, req: &HttpRequest) -> Result<User, HttpResponse> {
    let token = extract_token(req).ok_or_else(unauthorized)?;

    match db.validate_session(&token) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(unauthorized()),
        Err(e) => {
            log::error!("Session validation error: {}", e);
            Err(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            })))
        }
    }
}
