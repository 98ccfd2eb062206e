use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::controllers::{db_error, error_response, require_owned};
use crate::middleware::session_auth::require_user;
use crate::validation::{self, FieldErrors};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotesQuery {
    chat_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    chat_id: Option<String>,
    message_id: Option<String>,
    #[serde(rename = "type")]
    vote_type: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/vote")
            .route(web::get().to(get_votes))
            .route(web::patch().to(vote)),
    );
}

async fn get_votes(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<VotesQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let chat_id = match query.chat_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return error_response(StatusCode::BAD_REQUEST, "Missing required parameter: chatId"),
    };

    if let Err(resp) = require_owned(state.db.get_chat(chat_id), &user, "Chat not found", "get votes") {
        return resp;
    }

    match state.db.get_votes_for_chat(chat_id) {
        Ok(votes) => HttpResponse::Ok().json(votes),
        Err(e) => db_error("get votes", e),
    }
}

async fn vote(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<VoteRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let mut errors = FieldErrors::new();
    let chat_id = validation::required(&mut errors, "chatId", body.chat_id.as_deref(), "Chat ID is required");
    let message_id =
        validation::required(&mut errors, "messageId", body.message_id.as_deref(), "Message ID is required");
    match body.vote_type.as_deref() {
        Some("up") | Some("down") => {}
        _ => errors.add("type", "Invalid enum value. Expected 'up' | 'down'"),
    }
    if let Err(resp) = errors.into_result(&["chatId", "messageId", "type"]) {
        return resp;
    }
    let (Some(chat_id), Some(message_id)) = (chat_id, message_id) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing required fields");
    };
    let is_upvoted = body.vote_type.as_deref() == Some("up");

    if let Err(resp) = require_owned(state.db.get_chat(&chat_id), &user, "Chat not found", "vote") {
        return resp;
    }

    match state.db.get_message(&message_id) {
        Ok(Some(message)) if message.chat_id == chat_id => {}
        Ok(_) => return error_response(StatusCode::NOT_FOUND, "Message not found"),
        Err(e) => return db_error("vote", e),
    }

    match state.db.vote_message(&chat_id, &message_id, is_upvoted) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => db_error("vote", e),
    }
}
