use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::controllers::{db_error, error_response, forbidden, require_owned};
use crate::middleware::session_auth::require_user;
use crate::validation::{self, FieldErrors};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyQuery {
    user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCompanyRequest {
    name: Option<String>,
    description: Option<String>,
    use_case: Option<String>,
    user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyRequest {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    use_case: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/company")
            .route(web::get().to(get_company))
            .route(web::post().to(save_company))
            .route(web::put().to(update_company)),
    );
}

/// A `userId` naming someone other than the caller is refused
fn foreign_user(requested: Option<&str>, caller_id: &str) -> bool {
    matches!(requested, Some(id) if !id.is_empty() && id != caller_id)
}

async fn get_company(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<CompanyQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    if foreign_user(query.user_id.as_deref(), &user.id) {
        return forbidden();
    }

    match state.db.get_company_for_user(&user.id) {
        Ok(company) => HttpResponse::Ok().json(company),
        Err(e) => db_error("get company", e),
    }
}

async fn save_company(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SaveCompanyRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    if foreign_user(body.user_id.as_deref(), &user.id) {
        return forbidden();
    }

    let mut errors = FieldErrors::new();
    let name = validation::required(&mut errors, "name", body.name.as_deref(), "Company name is required");
    if let Err(resp) = errors.into_result(&["name"]) {
        return resp;
    }
    let Some(name) = name else {
        return error_response(StatusCode::BAD_REQUEST, "Company name is required");
    };

    match state.db.save_company(
        &user.id,
        &name,
        body.description.as_deref().unwrap_or_default(),
        body.use_case.as_deref().unwrap_or_default(),
    ) {
        Ok(company) => HttpResponse::Ok().json(company),
        Err(e) => db_error("save company", e),
    }
}

async fn update_company(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateCompanyRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let id = match body.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return error_response(StatusCode::BAD_REQUEST, "Company ID is required"),
    };

    let existing = match require_owned(state.db.get_company(id), &user, "Company not found", "update company") {
        Ok(company) => company,
        Err(resp) => return resp,
    };

    let name = body
        .name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(&existing.name);
    let description = body.description.as_deref().unwrap_or(&existing.description);
    let use_case = body.use_case.as_deref().unwrap_or(&existing.use_case);

    match state.db.update_company(id, name, description, use_case) {
        Ok(Some(company)) => HttpResponse::Ok().json(company),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Company not found"),
        Err(e) => db_error("update company", e),
    }
}
