use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;

mod ai;
mod config;
mod controllers;
mod db;
mod middleware;
mod models;
mod render;
mod validation;

use ai::{ChatModel, OpenAIClient};
use config::Config;
use db::Database;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    /// `None` when no API key is configured; model-backed routes answer 503
    pub chat_model: Option<Arc<dyn ChatModel>>,
}

/// SPA fallback handler - serves index.html for client-side routing
async fn spa_fallback(state: web::Data<AppState>) -> actix_web::Result<NamedFile> {
    let dist = state.config.frontend_dist.as_deref().unwrap_or(".");
    Ok(NamedFile::open(Path::new(dist).join("index.html"))?)
}

fn build_chat_model(config: &Config) -> Option<Arc<dyn ChatModel>> {
    let Some(api_key) = config.openai_api_key.as_deref() else {
        log::warn!("OPENAI_API_KEY not set - chat and company info routes are disabled");
        return None;
    };

    match OpenAIClient::new(api_key, Some(&config.openai_endpoint), Some(config.ai_max_tokens)) {
        Ok(client) => {
            log::info!("Language model client ready ({})", config.openai_endpoint);
            Some(Arc::new(client))
        }
        Err(e) => {
            log::error!("Failed to create language model client: {}", e);
            None
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).map_err(|e| {
        log::error!("Failed to initialize database: {}", e);
        std::io::Error::other(e)
    })?;
    let db = Arc::new(db);

    let chat_model = build_chat_model(&config);

    // Only serve a frontend that has actually been built
    let frontend_dist = config
        .frontend_dist
        .clone()
        .filter(|dist| Path::new(dist).join("index.html").exists());
    match (&config.frontend_dist, &frontend_dist) {
        (_, Some(dist)) => log::info!("Serving frontend from: {}", dist),
        (Some(dist), None) => log::warn!("Frontend dist {} has no index.html - static file serving disabled", dist),
        (None, None) => {}
    }

    log::info!("Starting Scout server on port {}", port);

    let state = web::Data::new(AppState {
        db,
        config,
        chat_model,
    });

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .app_data(state.clone())
            .app_data(validation::json_config())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::auth::config)
            .configure(controllers::accounts::config)
            .configure(controllers::agents::config)
            .configure(controllers::agent_runs::config)
            .configure(controllers::company::config)
            .configure(controllers::company_info::config)
            .configure(controllers::chat::config)
            .configure(controllers::vote::config)
            .configure(controllers::documents::config)
            .configure(controllers::models::config);

        if let Some(dist) = frontend_dist.as_deref() {
            app = app.service(
                Files::new("/", dist)
                    .index_file("index.html")
                    .default_handler(web::to(spa_fallback)),
            );
        }

        app
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
