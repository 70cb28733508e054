// src/notebook_handlers.rs
use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::require_permission;
use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::notebook::{EntryQuery, NewLabEntry, ReagentInput, UpdateLabEntry};
use crate::permissions::Permission;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StoichiometryRequest {
    pub reagents: Vec<ReagentInput>,
}

// ==================== ENTRIES ====================

pub async fn get_entries(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<EntryQuery>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, Permission::ViewDashboard)?;

    let entries = app_state.notebook.list(&query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(entries)))
}

pub async fn get_entry(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, Permission::ViewDashboard)?;

    let entry = app_state.notebook.get(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(entry)))
}

pub async fn create_entry(
    app_state: web::Data<Arc<AppState>>,
    entry: web::Json<NewLabEntry>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user = require_permission(&http_request, Permission::CreateRecipe)?;

    let created = app_state.notebook.add_entry(entry.into_inner()).await?;
    log::info!("User {} created lab entry {}", user.email, created.id);

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        created,
        "Lab entry created successfully".to_string(),
    )))
}

pub async fn update_entry(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    update: web::Json<UpdateLabEntry>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user = require_permission(&http_request, Permission::EditRecipe)?;

    let updated = app_state.notebook.update_entry(&path, update.into_inner()).await?;
    log::info!("User {} updated lab entry {}", user.email, updated.id);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        updated,
        "Lab entry updated successfully".to_string(),
    )))
}

pub async fn delete_entry(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user = require_permission(&http_request, Permission::DeleteRecipe)?;
    let entry_id = path.into_inner();

    app_state.notebook.delete_entry(&entry_id).await?;
    log::info!("User {} deleted lab entry {}", user.email, entry_id);

    Ok(HttpResponse::Ok().json(ApiResponse::message_only(
        "Lab entry deleted successfully".to_string(),
    )))
}

/// Pre-filled form for running an entry again; nothing is saved.
pub async fn repeat_entry(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, Permission::CreateRecipe)?;

    let draft = app_state
        .notebook
        .repeat_draft(&path, Utc::now().date_naive())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(draft)))
}

pub async fn save_as_template(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, Permission::CreateRecipe)?;

    let template = app_state.notebook.save_as_template(&path).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        template,
        "Saved as template".to_string(),
    )))
}

// ==================== TEMPLATES, TAGS, PREVIEW ====================

pub async fn get_templates(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, Permission::ViewDashboard)?;

    let templates = app_state.notebook.templates().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(templates)))
}

pub async fn get_tags(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, Permission::ViewDashboard)?;

    let tags = app_state.notebook.tags().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(tags)))
}

pub async fn preview_stoichiometry(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<StoichiometryRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_permission(&http_request, Permission::ViewDashboard)?;

    let preview = app_state.notebook.preview_stoichiometry(&request.reagents)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(preview)))
}
