use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::ai::models::{
    self, ModelInfo, MODELS, MODEL_COOKIE, REASONING_MODELS, REASONING_MODEL_COOKIE,
};
use crate::controllers::error_response;
use crate::middleware::session_auth::require_user;
use crate::AppState;

/// Preference cookies outlive sessions
const PREFERENCE_COOKIE_DAYS: i64 = 365;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    models: &'static [ModelInfo],
    reasoning_models: &'static [ModelInfo],
    selected_model_id: &'static str,
    selected_reasoning_model_id: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    model_id: Option<String>,
    reasoning_model_id: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/models")
            .route("", web::get().to(list_models))
            .route("/selection", web::post().to(save_selection)),
    );
}

fn cookie_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.cookie(name).map(|c| c.value().to_string())
}

/// Chat model named in the request, else the cookie selection, else the default
pub(crate) fn selected_model(req: &HttpRequest, requested: Option<&str>) -> &'static ModelInfo {
    let cookie = cookie_value(req, MODEL_COOKIE);
    models::resolve_model([requested, cookie.as_deref()])
}

/// Reasoning model named in the request, else the cookie selection, else the default
pub(crate) fn selected_reasoning_model(req: &HttpRequest, requested: Option<&str>) -> &'static ModelInfo {
    let cookie = cookie_value(req, REASONING_MODEL_COOKIE);
    models::resolve_reasoning_model([requested, cookie.as_deref()])
}

fn preference_cookie(name: &'static str, value: &'static str) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(PREFERENCE_COOKIE_DAYS))
        .finish()
}

async fn list_models(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Err(resp) = require_user(&state.db, &req) {
        return resp;
    }

    HttpResponse::Ok().json(ModelsResponse {
        models: MODELS,
        reasoning_models: REASONING_MODELS,
        selected_model_id: selected_model(&req, None).id,
        selected_reasoning_model_id: selected_reasoning_model(&req, None).id,
    })
}

async fn save_selection(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SelectionRequest>,
) -> impl Responder {
    if let Err(resp) = require_user(&state.db, &req) {
        return resp;
    }

    let mut cookies = Vec::new();
    if let Some(id) = body.model_id.as_deref() {
        match models::find_model(id) {
            Some(model) => cookies.push(preference_cookie(MODEL_COOKIE, model.id)),
            None => return error_response(StatusCode::BAD_REQUEST, "Unknown model"),
        }
    }
    if let Some(id) = body.reasoning_model_id.as_deref() {
        match models::find_reasoning_model(id) {
            Some(model) => cookies.push(preference_cookie(REASONING_MODEL_COOKIE, model.id)),
            None => return error_response(StatusCode::BAD_REQUEST, "Unknown reasoning model"),
        }
    }
    if cookies.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "modelId or reasoningModelId is required");
    }

    let mut response = HttpResponse::Ok();
    for cookie in cookies {
        response.cookie(cookie);
    }
    response.json(serde_json::json!({
        "success": true,
        "selectedModelId": body.model_id,
        "selectedReasoningModelId": body.reasoning_model_id,
    }))
}
