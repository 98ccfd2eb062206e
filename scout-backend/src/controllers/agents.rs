use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::controllers::{db_error, error_response, require_owned};
use crate::middleware::session_auth::require_user;
use crate::models::{AgentUpdate, NewAgent, DEFAULT_SEARCH_TYPE};
use crate::validation::{self, FieldErrors};
use crate::AppState;

#[derive(Deserialize)]
pub struct AgentIdQuery {
    id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    name: Option<String>,
    description: Option<String>,
    instructions: Option<String>,
    is_active: Option<bool>,
    search_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgentRequest {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    instructions: Option<String>,
    is_active: Option<bool>,
    search_type: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/agents")
            .route("", web::get().to(list_agents))
            .route("", web::post().to(create_agent))
            .route("", web::put().to(update_agent))
            .route("", web::delete().to(delete_agent))
            .route("/{id}", web::get().to(get_agent)),
    );
}

fn validate_create(body: CreateAgentRequest) -> Result<NewAgent, HttpResponse> {
    let mut errors = FieldErrors::new();
    let name = validation::required(&mut errors, "name", body.name.as_deref(), "Name is required");
    let instructions = validation::required(
        &mut errors,
        "instructions",
        body.instructions.as_deref(),
        "Instructions are required",
    );
    errors.into_result(&["name", "instructions"])?;

    match (name, instructions) {
        (Some(name), Some(instructions)) => Ok(NewAgent {
            name,
            description: body.description,
            instructions,
            is_active: body.is_active.unwrap_or(true),
            search_type: body
                .search_type
                .unwrap_or_else(|| DEFAULT_SEARCH_TYPE.to_string()),
        }),
        _ => Err(error_response(StatusCode::BAD_REQUEST, "Validation failed")),
    }
}

fn validate_update(body: UpdateAgentRequest) -> Result<(String, AgentUpdate), HttpResponse> {
    let mut errors = FieldErrors::new();
    let id = validation::uuid(&mut errors, "id", body.id.as_deref(), "Invalid agent ID");
    let name = validation::non_blank_if_present(&mut errors, "name", body.name.as_deref(), "Name is required");
    let instructions = validation::non_blank_if_present(
        &mut errors,
        "instructions",
        body.instructions.as_deref(),
        "Instructions are required",
    );
    errors.into_result(&["id", "name", "instructions"])?;

    let id = id.ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Invalid agent ID"))?;
    Ok((
        id,
        AgentUpdate {
            name,
            description: body.description,
            instructions,
            is_active: body.is_active,
            search_type: body.search_type,
        },
    ))
}

async fn list_agents(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.db.list_agents_for_user(&user.id) {
        Ok(agents) => HttpResponse::Ok().json(agents),
        Err(e) => db_error("get agents", e),
    }
}

async fn create_agent(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateAgentRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let agent = match validate_create(body.into_inner()) {
        Ok(agent) => agent,
        Err(resp) => return resp,
    };

    match state.db.create_agent(&user.id, &agent) {
        Ok(agent) => HttpResponse::Created().json(agent),
        Err(e) => db_error("create agent", e),
    }
}

async fn update_agent(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateAgentRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let (id, update) = match validate_update(body.into_inner()) {
        Ok(parsed) => parsed,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_owned(state.db.get_agent(&id), &user, "Agent not found", "update agent") {
        return resp;
    }

    match state.db.update_agent(&id, &update) {
        Ok(Some(agent)) => HttpResponse::Ok().json(agent),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Agent not found"),
        Err(e) => db_error("update agent", e),
    }
}

async fn delete_agent(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<AgentIdQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let id = match query.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return error_response(StatusCode::BAD_REQUEST, "Agent ID is required"),
    };

    if let Err(resp) = require_owned(state.db.get_agent(id), &user, "Agent not found", "delete agent") {
        return resp;
    }

    match state.db.delete_agent(id) {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Agent not found"),
        Err(e) => db_error("delete agent", e),
    }
}

async fn get_agent(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match require_owned(state.db.get_agent(&path), &user, "Agent not found", "get agent") {
        Ok(agent) => HttpResponse::Ok().json(agent),
        Err(resp) => resp,
    }
}
