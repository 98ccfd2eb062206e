use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::{prompts, CompletionRequest, Message, MessageRole};
use crate::controllers::models::{selected_model, selected_reasoning_model};
use crate::controllers::{db_error, error_response, forbidden, require_owned};
use crate::db::{new_id, now_timestamp};
use crate::middleware::session_auth::require_user;
use crate::models::{Chat, ChatMessage, SearchMode, User, Visibility, DEFAULT_SEARCH_TYPE};
use crate::render::render_message;
use crate::validation::{self, FieldErrors};
use crate::AppState;

const MAX_TITLE_CHARS: usize = 80;
const DEFAULT_TITLE: &str = "New Chat";

#[derive(Deserialize)]
pub struct IncomingMessage {
    id: Option<String>,
    role: Option<String>,
    content: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    id: Option<String>,
    messages: Option<Vec<IncomingMessage>>,
    model_id: Option<String>,
    reasoning_model_id: Option<String>,
    search_mode: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    id: String,
    message: ChatMessage,
    model: &'static str,
    search_mode: &'static str,
    /// Tools the client should enable for follow-up turns
    active_tools: &'static [&'static str],
}

#[derive(Deserialize)]
pub struct SaveHistoryRequest {
    id: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatIdQuery {
    chat_id: Option<String>,
}

#[derive(Deserialize)]
pub struct IdQuery {
    id: Option<String>,
}

#[derive(Deserialize)]
pub struct TrailingRequest {
    id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    chat_id: Option<String>,
    visibility: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/chat")
            .route("", web::post().to(chat))
            .route("", web::delete().to(delete_chat))
            .route("/history", web::post().to(save_history))
            .route("/messages", web::get().to(get_messages))
            .route("/messages/display", web::get().to(get_display_messages))
            .route("/messages/trailing", web::post().to(delete_trailing_messages))
            .route("/visibility", web::patch().to(update_visibility)),
    );
    cfg.service(web::resource("/api/history").route(web::get().to(list_history)));
}

/// Plain text of a message: strings as-is, text parts of an array joined by newlines
fn message_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// First line of the first user message, capped at `MAX_TITLE_CHARS`
fn title_from_messages(messages: &[IncomingMessage]) -> String {
    let first_user = messages
        .iter()
        .find(|m| m.role.as_deref() == Some("user"))
        .and_then(|m| m.content.as_ref())
        .map(message_text)
        .unwrap_or_default();
    let title: String = first_user
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

/// The conversation as sent to the model, behind the mode's system prompt
fn prompt_messages(mode: SearchMode, messages: &[IncomingMessage]) -> Vec<Message> {
    let mut prompt = vec![Message::system(prompts::system_prompt(mode))];
    for message in messages {
        let role = match message.role.as_deref().map(str::parse::<MessageRole>) {
            Some(Ok(role @ (MessageRole::User | MessageRole::Assistant))) => role,
            _ => continue,
        };
        let content = message.content.as_ref().map(message_text).unwrap_or_default();
        prompt.push(Message { role, content });
    }
    prompt
}

/// Load a chat the caller may read: their own, or any public chat
fn load_readable_chat(state: &AppState, user: &User, chat_id: &str) -> Result<Chat, HttpResponse> {
    match state.db.get_chat(chat_id) {
        Ok(Some(chat)) if chat.readable_by(&user.id) => Ok(chat),
        Ok(Some(_)) => Err(forbidden()),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, "Chat not found")),
        Err(e) => Err(db_error("get chat", e)),
    }
}

/// Use the caller's chat, creating it on first use
fn ensure_chat(state: &AppState, user: &User, chat_id: &str, title: impl FnOnce() -> String) -> Result<Chat, HttpResponse> {
    match state.db.get_chat(chat_id) {
        Ok(Some(chat)) if chat.user_id == user.id => Ok(chat),
        Ok(Some(_)) => Err(forbidden()),
        Ok(None) => state
            .db
            .save_chat(chat_id, &user.id, &title())
            .map_err(|e| db_error("save chat", e)),
        Err(e) => Err(db_error("get chat", e)),
    }
}

fn required_chat_id(value: Option<&str>) -> Result<&str, HttpResponse> {
    value
        .filter(|id| !id.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Missing required parameter: chatId"))
}

async fn chat(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ChatRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let Some(model) = state.chat_model.clone() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Language model is not configured");
    };

    let body = body.into_inner();
    let mut errors = FieldErrors::new();
    let chat_id = validation::required(&mut errors, "id", body.id.as_deref(), "Chat ID is required")
        .and_then(|id| validation::uuid(&mut errors, "id", Some(&id), "Invalid chat ID"));
    let messages = body.messages.unwrap_or_default();
    if messages.is_empty() {
        errors.add("messages", "Messages are required");
    } else if messages.last().and_then(|m| m.role.as_deref()) != Some("user") {
        errors.add("messages", "Last message must be from the user");
    }
    if let Err(resp) = errors.into_result(&["id", "messages"]) {
        return resp;
    }
    let (Some(chat_id), Some(last)) = (chat_id, messages.last()) else {
        return error_response(StatusCode::BAD_REQUEST, "Chat ID is required");
    };

    let mode = SearchMode::from_search_type(body.search_mode.as_deref().unwrap_or(DEFAULT_SEARCH_TYPE));
    let selected = match mode {
        SearchMode::DeepResearch => selected_reasoning_model(&req, body.reasoning_model_id.as_deref()),
        SearchMode::WebSearch => selected_model(&req, body.model_id.as_deref()),
    };

    if let Err(resp) = ensure_chat(&state, &user, &chat_id, || title_from_messages(&messages)) {
        return resp;
    }

    // Resent messages keep their stored row; the new turn gets a fresh id
    let user_message_id = match last.id.as_deref().filter(|id| validation::is_uuid(id)) {
        Some(id) => match state.db.get_message(id) {
            Ok(None) => id.to_string(),
            Ok(Some(_)) => new_id(),
            Err(e) => return db_error("save message", e),
        },
        None => new_id(),
    };
    let (user_at, _) = now_timestamp();
    let user_message = ChatMessage {
        id: user_message_id,
        chat_id: chat_id.clone(),
        role: MessageRole::User.to_string(),
        content: last.content.clone().unwrap_or(Value::String(String::new())),
        created_at: user_at,
    };
    if let Err(e) = state.db.save_messages(std::slice::from_ref(&user_message)) {
        return db_error("save message", e);
    }

    let request = CompletionRequest::new(selected.api_identifier, prompt_messages(mode, &messages));
    let reply = match model.generate_text(request).await {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("Chat completion failed for chat {}: {}", chat_id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate response");
        }
    };

    // The reply must sort after the turn it answers
    let (now, _) = now_timestamp();
    let assistant_message = ChatMessage {
        id: new_id(),
        chat_id: chat_id.clone(),
        role: MessageRole::Assistant.to_string(),
        content: Value::String(reply),
        created_at: now.max(user_at + Duration::microseconds(1)),
    };
    if let Err(e) = state.db.save_messages(std::slice::from_ref(&assistant_message)) {
        return db_error("save message", e);
    }

    HttpResponse::Ok().json(ChatResponse {
        id: chat_id,
        message: assistant_message,
        model: selected.id,
        search_mode: mode.as_str(),
        active_tools: mode.active_tools(),
    })
}

async fn save_history(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SaveHistoryRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());
    let (Some(id), Some(title)) = (non_empty(&body.id), non_empty(&body.title)) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing required fields: id and title");
    };
    if !validation::is_uuid(&id) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid chat ID");
    }

    match ensure_chat(&state, &user, &id, || title.clone()) {
        Ok(chat) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "id": chat.id,
            "title": chat.title,
        })),
        Err(resp) => resp,
    }
}

async fn list_history(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.db.list_chats_for_user(&user.id) {
        Ok(chats) => HttpResponse::Ok().json(chats),
        Err(e) => db_error("get chat history", e),
    }
}

async fn get_messages(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ChatIdQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let chat = match required_chat_id(query.chat_id.as_deref())
        .and_then(|chat_id| load_readable_chat(&state, &user, chat_id))
    {
        Ok(chat) => chat,
        Err(resp) => return resp,
    };

    match state.db.get_messages_for_chat(&chat.id) {
        Ok(messages) => HttpResponse::Ok().json(messages),
        Err(e) => db_error("get messages", e),
    }
}

async fn get_display_messages(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ChatIdQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let chat = match required_chat_id(query.chat_id.as_deref())
        .and_then(|chat_id| load_readable_chat(&state, &user, chat_id))
    {
        Ok(chat) => chat,
        Err(resp) => return resp,
    };

    match state.db.get_messages_for_chat(&chat.id) {
        Ok(messages) => {
            let rendered: Vec<_> = messages.iter().map(render_message).collect();
            HttpResponse::Ok().json(rendered)
        }
        Err(e) => db_error("get messages", e),
    }
}

async fn delete_trailing_messages(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<TrailingRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let id = match body.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return error_response(StatusCode::BAD_REQUEST, "Message ID is required"),
    };

    let message = match state.db.get_message(id) {
        Ok(Some(message)) => message,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Message not found"),
        Err(e) => return db_error("delete messages", e),
    };

    if let Err(resp) = require_owned(state.db.get_chat(&message.chat_id), &user, "Chat not found", "delete messages") {
        return resp;
    }

    match state.db.delete_messages_after(&message.chat_id, &message.created_at) {
        Ok(deleted) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "deleted": deleted })),
        Err(e) => db_error("delete messages", e),
    }
}

async fn delete_chat(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<IdQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let id = match query.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return error_response(StatusCode::BAD_REQUEST, "Chat ID is required"),
    };

    if let Err(resp) = require_owned(state.db.get_chat(id), &user, "Chat not found", "delete chat") {
        return resp;
    }

    match state.db.delete_chat(id) {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => db_error("delete chat", e),
    }
}

async fn update_visibility(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<VisibilityRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let mut errors = FieldErrors::new();
    let chat_id = validation::required(&mut errors, "chatId", body.chat_id.as_deref(), "Chat ID is required");
    let visibility: Option<Visibility> =
        validation::one_of(&mut errors, "visibility", body.visibility.as_deref(), &["public", "private"]);
    if let Err(resp) = errors.into_result(&["chatId", "visibility"]) {
        return resp;
    }
    let (Some(chat_id), Some(visibility)) = (chat_id, visibility) else {
        return error_response(StatusCode::BAD_REQUEST, "Chat ID is required");
    };

    if let Err(resp) = require_owned(state.db.get_chat(&chat_id), &user, "Chat not found", "update chat visibility") {
        return resp;
    }

    match state.db.update_chat_visibility(&chat_id, visibility) {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "visibility": visibility })),
        Err(e) => db_error("update chat visibility", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::models::{DEFAULT_MODEL_NAME, REASONING_MODEL_COOKIE};
    use crate::ai::testing::FakeChatModel;
    use crate::ai::ChatModel;
    use crate::controllers::test_support;
    use actix_web::cookie::Cookie;
    use actix_web::{test, App};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;

    fn stored(chat_id: &str, role: &str, content: Value, second: u32) -> ChatMessage {
        ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            role: role.to_string(),
            content,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, second).unwrap(),
        }
    }

    #[actix_web::test]
    async fn test_chat_creates_chat_and_stores_both_turns() {
        let fake = Arc::new(FakeChatModel::replying("Acme makes anvils."));
        let model: Arc<dyn ChatModel> = fake.clone();
        let state = test_support::state(Some(model));
        let (_, auth) = test_support::sign_in(&state, "ada@example.com");
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(validation::json_config())
                .configure(config),
        )
        .await;
        let chat_id = uuid::Uuid::new_v4().to_string();

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .insert_header(auth.clone())
            .set_json(json!({
                "id": chat_id,
                "messages": [{"role": "user", "content": "Tell me about Acme\nThey sell anvils"}]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["model"], DEFAULT_MODEL_NAME);
        assert_eq!(body["message"]["content"], "Acme makes anvils.");

        {
            let requests = fake.requests.lock();
            assert_eq!(requests[0].model, "gpt-4o");
            assert_eq!(requests[0].messages[0].role, MessageRole::System);
            assert_eq!(requests[0].messages[1].content, "Tell me about Acme\nThey sell anvils");
        }

        let req = test::TestRequest::get()
            .uri("/api/history")
            .insert_header(auth.clone())
            .to_request();
        let chats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(chats[0]["title"], "Tell me about Acme");

        let req = test::TestRequest::get()
            .uri(&format!("/api/chat/messages?chatId={}", chat_id))
            .insert_header(auth)
            .to_request();
        let messages: Value = test::call_and_read_body_json(&app, req).await;
        let roles: Vec<&str> = messages
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "assistant"]);
    }

    #[actix_web::test]
    async fn test_deep_research_uses_reasoning_model() {
        let fake = Arc::new(FakeChatModel::replying("Report"));
        let model: Arc<dyn ChatModel> = fake.clone();
        let state = test_support::state(Some(model));
        let (_, auth) = test_support::sign_in(&state, "ada@example.com");
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .insert_header(auth)
            .cookie(Cookie::new(REASONING_MODEL_COOKIE, "o1"))
            .set_json(json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "searchMode": "deep-research",
                "messages": [{"role": "user", "content": [{"type": "text", "text": "Research Acme"}]}]
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["model"], "o1");
        assert_eq!(body["searchMode"], "deep-research");
        assert_eq!(body["activeTools"], json!(["deepResearch"]));

        let requests = fake.requests.lock();
        assert_eq!(requests[0].model, "o1");
        assert_eq!(
            requests[0].messages[0].content,
            prompts::system_prompt(SearchMode::DeepResearch)
        );
        assert_eq!(requests[0].messages[1].content, "Research Acme");
    }

    #[actix_web::test]
    async fn test_chat_rejects_bad_requests() {
        let state = test_support::state(None);
        let (_, auth) = test_support::sign_in(&state, "ada@example.com");
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(validation::json_config())
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .insert_header(auth)
            .set_json(json!({"id": "c1", "messages": [{"role": "user", "content": "hi"}]}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let model: Arc<dyn ChatModel> = Arc::new(FakeChatModel::replying("ok"));
        let state = test_support::state(Some(model));
        let (_, auth) = test_support::sign_in(&state, "ada@example.com");
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(validation::json_config())
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .insert_header(auth.clone())
            .set_json(json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "messages": [{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Last message must be from the user");

        // Chat ids must be UUIDs so agent runs can reference them
        let req = test::TestRequest::post()
            .uri("/api/chat")
            .insert_header(auth)
            .set_json(json!({"id": "c1", "messages": [{"role": "user", "content": "hi"}]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid chat ID");
        assert!(state.db.get_chat("c1").unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_model_failure_keeps_user_turn() {
        let model: Arc<dyn ChatModel> = Arc::new(FakeChatModel::failing("upstream timeout"));
        let state = test_support::state(Some(model));
        let (_, auth) = test_support::sign_in(&state, "ada@example.com");
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let chat_id = uuid::Uuid::new_v4().to_string();

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .insert_header(auth)
            .set_json(json!({"id": chat_id, "messages": [{"role": "user", "content": "hi"}]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Failed to generate response");

        let messages = state.db.get_messages_for_chat(&chat_id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[actix_web::test]
    async fn test_history_is_idempotent_for_owner() {
        let state = test_support::state(None);
        let (_, owner) = test_support::sign_in(&state, "ada@example.com");
        let (_, intruder) = test_support::sign_in(&state, "eve@example.com");
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let chat_id = uuid::Uuid::new_v4().to_string();

        for title in ["First", "Second"] {
            let req = test::TestRequest::post()
                .uri("/api/chat/history")
                .insert_header(owner.clone())
                .set_json(json!({"id": chat_id, "title": title}))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["title"], "First");
        }

        let req = test::TestRequest::post()
            .uri("/api/chat/history")
            .insert_header(intruder.clone())
            .set_json(json!({"id": chat_id, "title": "Mine"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/chat/history")
            .insert_header(intruder.clone())
            .set_json(json!({"id": "c1", "title": "Mine"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "Invalid chat ID");

        let req = test::TestRequest::post()
            .uri("/api/chat/history")
            .insert_header(intruder)
            .set_json(json!({"id": "c2"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "Missing required fields: id and title");
    }

    #[actix_web::test]
    async fn test_private_chat_visibility() {
        let state = test_support::state(None);
        let (owner_id, owner) = test_support::sign_in(&state, "ada@example.com");
        let (_, reader) = test_support::sign_in(&state, "eve@example.com");
        state.db.save_chat("c1", &owner_id, "Acme").unwrap();
        state
            .db
            .save_messages(&[stored(
                "c1",
                "assistant",
                json!("Anvils.\n```sources\n[{\"url\":\"https://acme.test\",\"title\":\"Acme\"}]\n```"),
                0,
            )])
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(validation::json_config())
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/chat/messages?chatId=c1")
            .insert_header(reader.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::patch()
            .uri("/api/chat/visibility")
            .insert_header(owner)
            .set_json(json!({"chatId": "c1", "visibility": "public"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/chat/messages/display?chatId=c1")
            .insert_header(reader.clone())
            .to_request();
        let rendered: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rendered[0]["content"], "Anvils.");
        assert_eq!(rendered[0]["sources"][0]["url"], "https://acme.test");
        assert_eq!(rendered[0]["showReferences"], true);

        let req = test::TestRequest::get()
            .uri("/api/chat/messages")
            .insert_header(reader)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "Missing required parameter: chatId");
    }

    #[actix_web::test]
    async fn test_trailing_messages_and_delete() {
        let state = test_support::state(None);
        let (user_id, auth) = test_support::sign_in(&state, "ada@example.com");
        state.db.save_chat("c1", &user_id, "Acme").unwrap();
        let messages = vec![
            stored("c1", "user", json!("one"), 0),
            stored("c1", "assistant", json!("two"), 1),
            stored("c1", "user", json!("three"), 2),
        ];
        state.db.save_messages(&messages).unwrap();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/chat/messages/trailing")
            .insert_header(auth.clone())
            .set_json(json!({"id": messages[1].id}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["deleted"], 2);
        assert_eq!(state.db.get_messages_for_chat("c1").unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri("/api/chat?id=c1")
            .insert_header(auth.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri("/api/chat?id=c1")
            .insert_header(auth)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
