use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::controllers::{db_error, error_response, require_owned};
use crate::middleware::session_auth::require_user;
use crate::models::{AgentRunStatus, NewAgentRun, User};
use crate::validation::{self, FieldErrors};
use crate::AppState;

const STATUSES: &[&str] = &["active", "completed", "failed"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunsQuery {
    account_id: Option<String>,
    agent_id: Option<String>,
    chat_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRunRequest {
    agent_id: Option<String>,
    account_id: Option<String>,
    chat_id: Option<String>,
    search_type: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    status: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/agent-runs")
            .route("", web::get().to(list_agent_runs))
            .route("", web::post().to(create_agent_run))
            .route("/{id}", web::patch().to(update_status)),
    );
}

fn validate_create(body: CreateAgentRunRequest) -> Result<NewAgentRun, HttpResponse> {
    let mut errors = FieldErrors::new();
    let agent_id = validation::uuid(&mut errors, "agentId", body.agent_id.as_deref(), "Invalid agent ID");
    let account_id = validation::uuid(&mut errors, "accountId", body.account_id.as_deref(), "Invalid account ID");
    let chat_id = validation::uuid(&mut errors, "chatId", body.chat_id.as_deref(), "Invalid chat ID");
    let search_type = validation::required(
        &mut errors,
        "searchType",
        body.search_type.as_deref(),
        "Search type is required",
    );
    errors.into_result(&["agentId", "accountId", "chatId", "searchType"])?;

    match (agent_id, account_id, chat_id, search_type) {
        (Some(agent_id), Some(account_id), Some(chat_id), Some(search_type)) => Ok(NewAgentRun {
            agent_id,
            account_id,
            chat_id,
            search_type,
        }),
        _ => Err(error_response(StatusCode::BAD_REQUEST, "Validation failed")),
    }
}

/// Every row a new run points at must exist and belong to `user`
fn check_references(state: &AppState, user: &User, run: &NewAgentRun) -> Result<(), HttpResponse> {
    require_owned(state.db.get_agent(&run.agent_id), user, "Agent not found", "create agent run")?;
    require_owned(state.db.get_account(&run.account_id), user, "Account not found", "create agent run")?;
    require_owned(state.db.get_chat(&run.chat_id), user, "Chat not found", "create agent run")?;
    Ok(())
}

async fn list_agent_runs(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<AgentRunsQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

    let result = if let Some(account_id) = non_empty(&query.account_id) {
        if let Err(resp) = require_owned(state.db.get_account(&account_id), &user, "Account not found", "get agent runs") {
            return resp;
        }
        state.db.list_agent_runs_for_account(&account_id)
    } else if let Some(agent_id) = non_empty(&query.agent_id) {
        if let Err(resp) = require_owned(state.db.get_agent(&agent_id), &user, "Agent not found", "get agent runs") {
            return resp;
        }
        state.db.list_agent_runs_for_agent(&agent_id)
    } else if let Some(chat_id) = non_empty(&query.chat_id) {
        if let Err(resp) = require_owned(state.db.get_chat(&chat_id), &user, "Chat not found", "get agent runs") {
            return resp;
        }
        state.db.list_agent_runs_for_chat(&chat_id)
    } else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Either accountId, agentId or chatId is required",
        );
    };

    match result {
        Ok(runs) => HttpResponse::Ok().json(runs),
        Err(e) => db_error("get agent runs", e),
    }
}

async fn create_agent_run(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateAgentRunRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let run = match validate_create(body.into_inner()) {
        Ok(run) => run,
        Err(resp) => return resp,
    };

    if let Err(resp) = check_references(&state, &user, &run) {
        return resp;
    }

    match state.db.create_agent_run(&user.id, &run) {
        Ok(run) => {
            log::info!("Started agent run {} for agent {}", run.id, run.agent_id);
            HttpResponse::Created().json(run)
        }
        Err(e) => db_error("create agent run", e),
    }
}

async fn update_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let mut errors = FieldErrors::new();
    let status: Option<AgentRunStatus> = validation::one_of(&mut errors, "status", body.status.as_deref(), STATUSES);
    if let Err(resp) = errors.into_result(&["status"]) {
        return resp;
    }
    let Some(status) = status else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid status");
    };

    if let Err(resp) = require_owned(state.db.get_agent_run(&path), &user, "Agent run not found", "update agent run") {
        return resp;
    }

    match state.db.update_agent_run_status(&path, status) {
        Ok(Some(run)) => HttpResponse::Ok().json(run),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Agent run not found"),
        Err(e) => db_error("update agent run", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support;
    use crate::models::{NewAccount, NewAgent, DEFAULT_SEARCH_TYPE};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    struct Fixture {
        agent_id: String,
        account_id: String,
        chat_id: String,
    }

    fn fixture(state: &web::Data<AppState>, user_id: &str) -> Fixture {
        let agent = state
            .db
            .create_agent(
                user_id,
                &NewAgent {
                    name: "Scout".to_string(),
                    description: None,
                    instructions: "Dig".to_string(),
                    is_active: true,
                    search_type: DEFAULT_SEARCH_TYPE.to_string(),
                },
            )
            .unwrap();
        let account = state
            .db
            .create_account(
                user_id,
                &NewAccount {
                    name: "Acme".to_string(),
                    website: "https://acme.test".to_string(),
                    industry: None,
                    description: None,
                    logo: None,
                },
            )
            .unwrap();
        let chat_id = uuid::Uuid::new_v4().to_string();
        state.db.save_chat(&chat_id, user_id, "Acme research").unwrap();
        Fixture {
            agent_id: agent.id,
            account_id: account.id,
            chat_id,
        }
    }

    #[actix_web::test]
    async fn test_run_lifecycle() {
        let state = test_support::state(None);
        let (user_id, auth) = test_support::sign_in(&state, "ada@example.com");
        let f = fixture(&state, &user_id);
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(validation::json_config())
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/agent-runs")
            .insert_header(auth.clone())
            .set_json(json!({
                "agentId": f.agent_id,
                "accountId": f.account_id,
                "chatId": f.chat_id,
                "searchType": "deep-research"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let run: Value = test::read_body_json(resp).await;
        assert_eq!(run["status"], "active");

        let req = test::TestRequest::get()
            .uri(&format!("/api/agent-runs?accountId={}", f.account_id))
            .insert_header(auth.clone())
            .to_request();
        let runs: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(runs.as_array().unwrap().len(), 1);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/agent-runs/{}", run["id"].as_str().unwrap()))
            .insert_header(auth.clone())
            .set_json(json!({"status": "completed"}))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["status"], "completed");

        let req = test::TestRequest::get()
            .uri("/api/agent-runs")
            .insert_header(auth)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_status_outside_enum_is_rejected() {
        let state = test_support::state(None);
        let (user_id, auth) = test_support::sign_in(&state, "ada@example.com");
        let f = fixture(&state, &user_id);
        let run = state
            .db
            .create_agent_run(
                &user_id,
                &NewAgentRun {
                    agent_id: f.agent_id,
                    account_id: f.account_id,
                    chat_id: f.chat_id,
                    search_type: DEFAULT_SEARCH_TYPE.to_string(),
                },
            )
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(validation::json_config())
                .configure(config),
        )
        .await;

        let req = test::TestRequest::patch()
            .uri(&format!("/api/agent-runs/{}", run.id))
            .insert_header(auth)
            .set_json(json!({"status": "paused"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["error"],
            "Invalid enum value. Expected 'active' | 'completed' | 'failed'"
        );
    }

    #[actix_web::test]
    async fn test_create_checks_referenced_rows() {
        let state = test_support::state(None);
        let (owner_id, _) = test_support::sign_in(&state, "ada@example.com");
        let (intruder_id, intruder) = test_support::sign_in(&state, "eve@example.com");
        let theirs = fixture(&state, &owner_id);
        let mine = fixture(&state, &intruder_id);
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(validation::json_config())
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/agent-runs")
            .insert_header(intruder.clone())
            .set_json(json!({
                "agentId": mine.agent_id,
                "accountId": theirs.account_id,
                "chatId": mine.chat_id,
                "searchType": "web-search"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/agent-runs")
            .insert_header(intruder.clone())
            .set_json(json!({
                "agentId": uuid::Uuid::new_v4().to_string(),
                "accountId": mine.account_id,
                "chatId": mine.chat_id,
                "searchType": "web-search"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Agent not found");

        let req = test::TestRequest::post()
            .uri("/api/agent-runs")
            .insert_header(intruder)
            .set_json(json!({"agentId": "nope", "accountId": mine.account_id, "chatId": mine.chat_id}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "Invalid agent ID");
    }
}
