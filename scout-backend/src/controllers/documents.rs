use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::controllers::{db_error, error_response, forbidden, require_owned};
use crate::middleware::session_auth::require_user;
use crate::models::{DocumentKind, NewSuggestion, User};
use crate::validation::{self, FieldErrors};
use crate::AppState;

const KINDS: &[&str] = &["text", "code", "spreadsheet"];

#[derive(Deserialize)]
pub struct DocumentQuery {
    id: Option<String>,
}

#[derive(Deserialize)]
pub struct SaveDocumentRequest {
    title: Option<String>,
    content: Option<String>,
    kind: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteVersionsRequest {
    timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsQuery {
    document_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionInput {
    original_text: Option<String>,
    suggested_text: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
pub struct SaveSuggestionsRequest {
    suggestions: Option<Vec<SuggestionInput>>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/document")
            .route(web::get().to(get_document))
            .route(web::post().to(save_document))
            .route(web::patch().to(delete_versions_after)),
    );
    cfg.service(
        web::resource("/api/suggestions")
            .route(web::get().to(get_suggestions))
            .route(web::post().to(save_suggestions)),
    );
}

fn required_id<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, HttpResponse> {
    value
        .filter(|id| !id.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, message))
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

async fn get_document(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<DocumentQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let id = match required_id(query.id.as_deref(), "Missing required parameter: id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let versions = match state.db.get_document_versions(id) {
        Ok(versions) => versions,
        Err(e) => return db_error("get document", e),
    };
    match versions.first() {
        None => error_response(StatusCode::NOT_FOUND, "Document not found"),
        Some(first) if first.user_id != user.id => forbidden(),
        Some(_) => HttpResponse::Ok().json(versions),
    }
}

/// Only the owner of an existing document may add versions to it
fn check_document_owner(state: &AppState, user: &User, id: &str) -> Result<(), HttpResponse> {
    match state.db.get_latest_document(id) {
        Ok(Some(document)) if document.user_id != user.id => Err(forbidden()),
        Ok(_) => Ok(()),
        Err(e) => Err(db_error("save document", e)),
    }
}

async fn save_document(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<DocumentQuery>,
    body: web::Json<SaveDocumentRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let id = match required_id(query.id.as_deref(), "Missing required parameter: id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut errors = FieldErrors::new();
    let title = validation::required(&mut errors, "title", body.title.as_deref(), "Title is required");
    let kind = match body.kind.as_deref() {
        None => Some(DocumentKind::default()),
        kind => validation::one_of::<DocumentKind>(&mut errors, "kind", kind, KINDS),
    };
    if let Err(resp) = errors.into_result(&["title", "kind"]) {
        return resp;
    }
    let (Some(title), Some(kind)) = (title, kind) else {
        return error_response(StatusCode::BAD_REQUEST, "Title is required");
    };

    if let Err(resp) = check_document_owner(&state, &user, id) {
        return resp;
    }

    match state.db.save_document(id, &title, kind, body.content.as_deref(), &user.id) {
        Ok(document) => HttpResponse::Ok().json(document),
        Err(e) => db_error("save document", e),
    }
}

async fn delete_versions_after(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<DocumentQuery>,
    body: web::Json<DeleteVersionsRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let id = match required_id(query.id.as_deref(), "Missing required parameter: id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(timestamp) = parse_timestamp(body.timestamp.as_deref()) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid timestamp");
    };

    if let Err(resp) = require_owned(state.db.get_latest_document(id), &user, "Document not found", "delete document versions") {
        return resp;
    }

    match state.db.delete_document_versions_after(id, &timestamp) {
        Ok(deleted) => HttpResponse::Ok().json(serde_json::json!({ "success": true, "deleted": deleted })),
        Err(e) => db_error("delete document versions", e),
    }
}

async fn get_suggestions(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<SuggestionsQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let document_id = match required_id(query.document_id.as_deref(), "Missing required parameter: documentId") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_owned(state.db.get_latest_document(document_id), &user, "Document not found", "get suggestions") {
        return resp;
    }

    match state.db.get_suggestions_for_document(document_id) {
        Ok(suggestions) => HttpResponse::Ok().json(suggestions),
        Err(e) => db_error("get suggestions", e),
    }
}

fn validate_suggestions(body: SaveSuggestionsRequest) -> Result<Vec<NewSuggestion>, HttpResponse> {
    let inputs = body.suggestions.unwrap_or_default();
    let mut errors = FieldErrors::new();
    if inputs.is_empty() {
        errors.add("suggestions", "Suggestions are required");
    }
    let mut suggestions = Vec::with_capacity(inputs.len());
    for input in inputs {
        let original_text = validation::required(
            &mut errors,
            "suggestions",
            input.original_text.as_deref(),
            "Original text is required",
        );
        let suggested_text = validation::required(
            &mut errors,
            "suggestions",
            input.suggested_text.as_deref(),
            "Suggested text is required",
        );
        if let (Some(original_text), Some(suggested_text)) = (original_text, suggested_text) {
            suggestions.push(NewSuggestion {
                original_text,
                suggested_text,
                description: input.description,
            });
        }
    }
    errors.into_result(&["suggestions"])?;
    Ok(suggestions)
}

async fn save_suggestions(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<SuggestionsQuery>,
    body: web::Json<SaveSuggestionsRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let document_id = match required_id(query.document_id.as_deref(), "Missing required parameter: documentId") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let suggestions = match validate_suggestions(body.into_inner()) {
        Ok(suggestions) => suggestions,
        Err(resp) => return resp,
    };

    // Suggestions attach to the newest version
    let document = match require_owned(state.db.get_latest_document(document_id), &user, "Document not found", "save suggestions") {
        Ok(document) => document,
        Err(resp) => return resp,
    };

    match state.db.save_suggestions(&document, &suggestions, &user.id) {
        Ok(saved) => HttpResponse::Created().json(saved),
        Err(e) => db_error("save suggestions", e),
    }
}
