use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::ai::models::DEFAULT_MODEL_NAME;
use crate::ai::{prompts, CompletionRequest, Message};
use crate::controllers::{db_error, error_response};
use crate::middleware::session_auth::require_user;
use crate::validation::{self, FieldErrors};
use crate::AppState;

const COMPANY_INFO_TEMPERATURE: f32 = 0.7;
const COMPANY_INFO_MAX_TOKENS: u32 = 1000;

#[derive(Deserialize)]
pub struct CompanyInfoRequest {
    website: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/company-info").route(web::post().to(fetch_company_info)));
}

async fn fetch_company_info(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CompanyInfoRequest>,
) -> impl Responder {
    if let Err(resp) = require_user(&state.db, &req) {
        return resp;
    }

    let mut errors = FieldErrors::new();
    let website = validation::url(&mut errors, "website", body.website.as_deref(), "Invalid website URL");
    if let Err(resp) = errors.into_result(&["website"]) {
        return resp;
    }
    let Some(website) = website else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid website URL");
    };

    match state.db.get_company_info_by_website(&website) {
        Ok(Some(info)) => return HttpResponse::Ok().json(info),
        Ok(None) => {}
        Err(e) => return db_error("fetch company information", e),
    }

    let Some(model) = state.chat_model.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Language model is not configured");
    };

    let mut request = CompletionRequest::new(
        DEFAULT_MODEL_NAME,
        vec![Message::user(prompts::company_info_prompt(&website))],
    );
    request.temperature = Some(COMPANY_INFO_TEMPERATURE);
    request.max_tokens = Some(COMPANY_INFO_MAX_TOKENS);

    let reply = match model.generate_text(request).await {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("Company info generation failed for {}: {}", website, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch company information");
        }
    };

    let Some(fields) = prompts::parse_company_info(&reply) else {
        log::warn!("Unparseable company info for {}", website);
        return HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "Failed to parse company information",
            "rawResponse": reply
        }));
    };

    match state.db.save_company_info(&website, &fields) {
        Ok(info) => HttpResponse::Ok().json(info),
        Err(e) => db_error("save company information", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::FakeChatModel;
    use crate::ai::ChatModel;
    use crate::controllers::test_support;
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    const REPLY: &str = r#"Here you go:
{"name": "Acme", "description": "Makes anvils", "industry": "Manufacturing",
 "products": "Anvils", "uniqueFeatures": "Drop tested"}"#;

    #[actix_web::test]
    async fn test_generates_then_serves_cached_row() {
        let fake = Arc::new(FakeChatModel::replying(REPLY));
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

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/api/company-info")
                .insert_header(auth.clone())
                .set_json(json!({"website": "https://acme.test"}))
                .to_request();
            let info: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(info["name"], "Acme");
            assert_eq!(info["uniqueFeatures"], "Drop tested");
        }

        let requests = fake.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, DEFAULT_MODEL_NAME);
        assert_eq!(requests[0].max_tokens, Some(COMPANY_INFO_MAX_TOKENS));
        assert!(requests[0].messages[0].content.contains("https://acme.test"));
    }

    #[actix_web::test]
    async fn test_unparseable_reply_returns_raw_response() {
        let model: Arc<dyn ChatModel> = Arc::new(FakeChatModel::replying("I cannot browse."));
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
            .uri("/api/company-info")
            .insert_header(auth.clone())
            .set_json(json!({"website": "https://acme.test"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["rawResponse"], "I cannot browse.");

        let req = test::TestRequest::post()
            .uri("/api/company-info")
            .insert_header(auth)
            .set_json(json!({"website": "acme"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "Invalid website URL");
    }

    #[actix_web::test]
    async fn test_reply_without_fields_is_not_cached() {
        let reply = r#"{"error": "I cannot access that site"}"#;
        let model: Arc<dyn ChatModel> = Arc::new(FakeChatModel::replying(reply));
        let state = test_support::state(Some(model));
        let (_, auth) = test_support::sign_in(&state, "ada@example.com");
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/company-info")
            .insert_header(auth)
            .set_json(json!({"website": "https://acme.test"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Failed to parse company information");
        assert_eq!(body["rawResponse"], reply);

        assert!(state.db.get_company_info_by_website("https://acme.test").unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_without_model_is_unavailable() {
        let state = test_support::state(None);
        let (_, auth) = test_support::sign_in(&state, "ada@example.com");
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/company-info")
            .insert_header(auth)
            .set_json(json!({"website": "https://acme.test"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
