// src/main.rs
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowlab::auth::AuthService;
use flowlab::config::{load_config, Config, SecurityConfig};
use flowlab::error::ApiError;
use flowlab::notebook::{LabNotebook, SqliteNotebookStore};
use flowlab::{configure_routes, db, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (this calls load_env_file internally)
    let config = load_config()?;

    setup_logging(&config)?;
    config.print_startup_info();

    if config.is_production() {
        validate_production_config(&config)?;
    }

    let pool = db::create_pool(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    db::run_migrations(&pool).await.context("Failed to run migrations")?;

    let notebook = LabNotebook::new(Arc::new(SqliteNotebookStore::new(pool)));
    if config.notebook.seed_samples {
        notebook
            .seed_samples_if_empty()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed sample entries: {}", e))?;
    }

    let auth_service = Arc::new(AuthService::new(&config.auth));
    let app_state = Arc::new(AppState { notebook });

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server at http://{}", bind_address);

    let server_config = config.clone();
    let mut server = HttpServer::new(move || {
        let cors = setup_cors(&server_config.security.allowed_origins);
        let security_headers = setup_security_headers(&server_config.security);
        let json_config = web::JsonConfig::default()
            .limit(server_config.security.max_request_size)
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());
        let query_config = web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());

        App::new()
            .wrap(cors)
            .wrap(security_headers)
            .wrap(Logger::default())
            .app_data(json_config)
            .app_data(query_config)
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .configure(configure_routes)
    })
    .keep_alive(Duration::from_secs(config.server.keep_alive))
    .client_request_timeout(Duration::from_secs(config.server.client_timeout))
    .client_disconnect_timeout(Duration::from_secs(config.server.client_shutdown));

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await?;

    Ok(())
}

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn validate_production_config(config: &Config) -> anyhow::Result<()> {
    if config.security.allowed_origins.iter().any(|o| o == "*") {
        anyhow::bail!("Wildcard CORS origins not allowed in production!");
    }

    if config.auth.demo_accounts {
        anyhow::bail!("Demo accounts must be disabled in production (auth.demo_accounts = false)");
    }

    Ok(())
}

fn setup_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .expose_headers(vec![header::CONTENT_LENGTH])
        .max_age(3600);

    if allowed_origins.iter().any(|o| o == "*") {
        log::warn!("⚠️  Using wildcard CORS (*) in development mode");
        return cors.allow_any_origin();
    }

    for origin in allowed_origins.iter().filter(|o| !o.is_empty()) {
        cors = cors.allowed_origin(origin);
    }
    cors
}

fn setup_security_headers(config: &SecurityConfig) -> DefaultHeaders {
    let mut headers = DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"));

    if config.require_https {
        headers = headers.add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains",
        ));
    }

    headers
}
