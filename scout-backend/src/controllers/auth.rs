use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::controllers::{db_error, error_response};
use crate::middleware::session_auth::{extract_token, SESSION_COOKIE};
use crate::models::{Session, User};
use crate::validation::{self, FieldErrors};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    success: bool,
    token: String,
    expires_at: i64,
    user: User,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/validate", web::get().to(validate)),
    );
}

fn session_cookie(session: &Session, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(ttl_hours))
        .finish()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Check the shape of an email/password pair. Registration also enforces
/// the minimum password length.
fn validate_credentials(body: &CredentialsRequest, registering: bool) -> Result<(String, String), HttpResponse> {
    let mut errors = FieldErrors::new();
    let email = body.email.as_deref().map(str::trim).unwrap_or_default();
    if !validation::is_email(email) {
        errors.add("email", "Invalid email address");
    }
    let password = body.password.clone().unwrap_or_default();
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if registering && password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
    errors.into_result(&["email", "password"])?;
    Ok((email.to_string(), password))
}

/// Open a session for `user` and answer with its token and cookie
fn start_session(state: &AppState, user: User, status: StatusCode) -> HttpResponse {
    let ttl_hours = state.config.session_ttl_hours;
    match state.db.create_session(&user.id, ttl_hours) {
        Ok(session) => HttpResponse::build(status)
            .cookie(session_cookie(&session, ttl_hours))
            .json(LoginResponse {
                success: true,
                token: session.token.clone(),
                expires_at: session.expires_at.timestamp(),
                user,
            }),
        Err(e) => db_error("create session", e),
    }
}

async fn register(state: web::Data<AppState>, body: web::Json<CredentialsRequest>) -> impl Responder {
    let (email, password) = match validate_credentials(&body, true) {
        Ok(credentials) => credentials,
        Err(resp) => return resp,
    };

    match state.db.get_user_by_email(&email) {
        Ok(Some(_)) => return error_response(StatusCode::CONFLICT, "User already exists"),
        Ok(None) => {}
        Err(e) => return db_error("register user", e),
    }

    let user = match state.db.create_user(&email, &password) {
        Ok(user) => user,
        Err(e) => return db_error("register user", e),
    };
    log::info!("Registered user {}", user.id);

    start_session(&state, user, StatusCode::CREATED)
}

async fn login(state: web::Data<AppState>, body: web::Json<CredentialsRequest>) -> impl Responder {
    let (email, password) = match validate_credentials(&body, false) {
        Ok(credentials) => credentials,
        Err(resp) => return resp,
    };

    match state.db.verify_user_password(&email, &password) {
        Ok(Some(user)) => start_session(&state, user, StatusCode::OK),
        Ok(None) => error_response(StatusCode::UNAUTHORIZED, "Invalid email or password"),
        Err(e) => db_error("log in", e),
    }
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Some(token) = extract_token(&req) {
        if let Err(e) = state.db.delete_session(&token) {
            return db_error("delete session", e);
        }
    }

    HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(serde_json::json!({ "success": true }))
}

async fn validate(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let token = match extract_token(&req) {
        Some(t) => t,
        None => {
            return HttpResponse::Ok().json(ValidateResponse { valid: false, user: None });
        }
    };

    match state.db.validate_session(&token) {
        Ok(Some(user)) => HttpResponse::Ok().json(ValidateResponse {
            valid: true,
            user: Some(user),
        }),
        Ok(None) => HttpResponse::Ok().json(ValidateResponse { valid: false, user: None }),
        Err(e) => {
            log::error!("Failed to validate session: {}", e);
            HttpResponse::Ok().json(ValidateResponse { valid: false, user: None })
        }
    }
}
