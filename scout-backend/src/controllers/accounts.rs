use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::controllers::{db_error, error_response, require_owned};
use crate::middleware::session_auth::require_user;
use crate::models::{AccountUpdate, NewAccount};
use crate::validation::{self, FieldErrors};
use crate::AppState;

#[derive(Deserialize)]
pub struct AccountsQuery {
    query: Option<String>,
    id: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateAccountRequest {
    name: Option<String>,
    website: Option<String>,
    industry: Option<String>,
    description: Option<String>,
    logo: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAccountRequest {
    id: Option<String>,
    name: Option<String>,
    website: Option<String>,
    industry: Option<String>,
    description: Option<String>,
    logo: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/accounts")
            .route("", web::get().to(list_accounts))
            .route("", web::post().to(create_account))
            .route("", web::put().to(update_account))
            .route("", web::delete().to(delete_account))
            .route("/{id}", web::get().to(get_account)),
    );
}

fn validate_create(body: CreateAccountRequest) -> Result<NewAccount, HttpResponse> {
    let mut errors = FieldErrors::new();
    let name = validation::required(&mut errors, "name", body.name.as_deref(), "Name is required");
    let website = validation::website(&mut errors, "website", body.website.as_deref());
    errors.into_result(&["website", "name"])?;

    match (name, website) {
        (Some(name), Some(website)) => Ok(NewAccount {
            name,
            website,
            industry: body.industry,
            description: body.description,
            logo: body.logo,
        }),
        _ => Err(error_response(StatusCode::BAD_REQUEST, "Validation failed")),
    }
}

fn validate_update(body: UpdateAccountRequest) -> Result<(String, AccountUpdate), HttpResponse> {
    let mut errors = FieldErrors::new();
    let id = validation::uuid(&mut errors, "id", body.id.as_deref(), "Invalid account ID");
    let name = validation::non_blank_if_present(&mut errors, "name", body.name.as_deref(), "Name is required");
    let website = match body.website.as_deref() {
        Some(website) => validation::website(&mut errors, "website", Some(website)),
        None => None,
    };
    errors.into_result(&["website", "name", "id"])?;

    let id = id.ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Invalid account ID"))?;
    Ok((
        id,
        AccountUpdate {
            name,
            website,
            industry: body.industry,
            description: body.description,
            logo: body.logo,
        },
    ))
}

async fn list_accounts(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<AccountsQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let result = match query.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => state.db.search_accounts(q, &user.id),
        None => state.db.list_accounts_for_user(&user.id),
    };

    match result {
        Ok(accounts) => HttpResponse::Ok().json(accounts),
        Err(e) => db_error("get accounts", e),
    }
}

async fn create_account(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateAccountRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let account = match validate_create(body.into_inner()) {
        Ok(account) => account,
        Err(resp) => return resp,
    };

    match state.db.create_account(&user.id, &account) {
        Ok(account) => HttpResponse::Created().json(account),
        Err(e) => db_error("create account", e),
    }
}

async fn update_account(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateAccountRequest>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let (id, update) = match validate_update(body.into_inner()) {
        Ok(parsed) => parsed,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_owned(state.db.get_account(&id), &user, "Account not found", "update account") {
        return resp;
    }

    match state.db.update_account(&id, &update) {
        Ok(Some(account)) => HttpResponse::Ok().json(account),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Account not found"),
        Err(e) => db_error("update account", e),
    }
}

async fn delete_account(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<AccountsQuery>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let id = match query.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return error_response(StatusCode::BAD_REQUEST, "Account ID is required"),
    };

    if let Err(resp) = require_owned(state.db.get_account(id), &user, "Account not found", "delete account") {
        return resp;
    }

    match state.db.delete_account(id) {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Account not found"),
        Err(e) => db_error("delete account", e),
    }
}

async fn get_account(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> impl Responder {
    let user = match require_user(&state.db, &req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match require_owned(state.db.get_account(&path), &user, "Account not found", "get account") {
        Ok(account) => HttpResponse::Ok().json(account),
        Err(resp) => resp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_account_lifecycle() {
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
            .uri("/api/accounts")
            .insert_header(auth.clone())
            .set_json(json!({"name": "Acme", "website": "https://acme.test"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let account: Value = test::read_body_json(resp).await;
        let id = account["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::put()
            .uri("/api/accounts")
            .insert_header(auth.clone())
            .set_json(json!({"id": id, "industry": "Aerospace"}))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["industry"], "Aerospace");
        assert_eq!(updated["website"], "https://acme.test");

        let req = test::TestRequest::get()
            .uri("/api/accounts?query=acm")
            .insert_header(auth.clone())
            .to_request();
        let found: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(found.as_array().unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/accounts?id={}", id))
            .insert_header(auth.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/accounts/{}", id))
            .insert_header(auth)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_website_must_be_http_url() {
        let state = test_support::state(None);
        let (_, auth) = test_support::sign_in(&state, "ada@example.com");
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(validation::json_config())
                .configure(config),
        )
        .await;

        for (website, message) in [
            ("ftp://acme.test", "URL must start with http:// or https://"),
            ("acme.test", "Invalid URL format"),
            ("", "Website URL is required"),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/accounts")
                .insert_header(auth.clone())
                .set_json(json!({"name": "Acme", "website": website}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], message);
        }

        let req = test::TestRequest::post()
            .uri("/api/accounts")
            .insert_header(auth)
            .set_json(json!({"website": "https://acme.test"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "Name is required");
    }

    #[actix_web::test]
    async fn test_other_users_account_is_forbidden() {
        let state = test_support::state(None);
        let (_, owner) = test_support::sign_in(&state, "ada@example.com");
        let (_, intruder) = test_support::sign_in(&state, "eve@example.com");
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(validation::json_config())
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/accounts")
            .insert_header(owner)
            .set_json(json!({"name": "Acme", "website": "https://acme.test"}))
            .to_request();
        let account: Value = test::call_and_read_body_json(&app, req).await;
        let id = account["id"].as_str().unwrap();

        let req = test::TestRequest::get()
            .uri(&format!("/api/accounts/{}", id))
            .insert_header(intruder.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri("/api/accounts")
            .insert_header(intruder.clone())
            .set_json(json!({"id": id, "name": "Mine now"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/accounts?id={}", id))
            .insert_header(intruder)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_requires_session() {
        let state = test_support::state(None);
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/accounts").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Unauthorized");

        let req = test::TestRequest::delete()
            .uri("/api/accounts")
            .insert_header(("Authorization", "Bearer bogus"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
