// src/lib.rs
//! Flow-chemistry lab notebook service: role-based permissions plus the
//! lab-entry pipeline (stoichiometry, filtering, sorting, tags, repeat).

use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

pub mod auth;
pub mod auth_handlers;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod notebook;
pub mod notebook_handlers;
pub mod permissions;

use crate::notebook::LabNotebook;

pub struct AppState {
    pub notebook: LabNotebook,
}

/// Public routes first, then everything under `/api/v1` behind the session
/// middleware. Expects `web::Data<Arc<AppState>>` and
/// `web::Data<Arc<AuthService>>` in app data.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let session_auth = HttpAuthentication::bearer(auth::session_middleware);

    // Health check and public endpoints (no auth)
    cfg.route("/health", web::get().to(handlers::health))
        .route("/api/v1/auth/login", web::post().to(auth_handlers::login))
        .route("/api/v1/auth/register", web::post().to(auth_handlers::register))
        .route("/api/v1/roles", web::get().to(handlers::get_roles));

    // Protected API endpoints
    cfg.service(
        web::scope("/api/v1")
            .wrap(session_auth)
            .service(
                web::scope("/auth")
                    .route("/logout", web::post().to(auth_handlers::logout))
                    .route("/me", web::get().to(auth_handlers::get_profile)),
            )
            .route("/users/{id}/role", web::put().to(auth_handlers::update_user_role))
            .service(
                web::scope("/notebook")
                    .route("/entries", web::get().to(notebook_handlers::get_entries))
                    .route("/entries", web::post().to(notebook_handlers::create_entry))
                    .route("/entries/{id}", web::get().to(notebook_handlers::get_entry))
                    .route("/entries/{id}", web::put().to(notebook_handlers::update_entry))
                    .route("/entries/{id}", web::delete().to(notebook_handlers::delete_entry))
                    .route("/entries/{id}/repeat", web::post().to(notebook_handlers::repeat_entry))
                    .route(
                        "/entries/{id}/template",
                        web::post().to(notebook_handlers::save_as_template),
                    )
                    .route("/templates", web::get().to(notebook_handlers::get_templates))
                    .route("/tags", web::get().to(notebook_handlers::get_tags))
                    .route(
                        "/stoichiometry",
                        web::post().to(notebook_handlers::preview_stoichiometry),
                    ),
            ),
    );
}
