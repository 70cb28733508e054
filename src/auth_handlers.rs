// src/auth_handlers.rs
use std::sync::Arc;

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde::Serialize;
use validator::Validate;

use crate::auth::{
    get_current_user, require_permission, Account, AuthService, LoginRequest, LoginResponse,
    RegisterRequest, SessionToken, UpdateRoleRequest,
};
use crate::error::ApiResult;
use crate::handlers::ApiResponse;
use crate::permissions::{sorted_permissions_for, Permission};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub account: Account,
    pub permissions: Vec<Permission>,
}

// ======== AUTH HANDLERS ========

pub async fn login(
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let (token, user) = auth_service.login(&request.email, &request.password).await?;
    let response = LoginResponse {
        token,
        expires_in: auth_service.session_ttl_seconds(),
        user,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        response,
        "Login successful".to_string(),
    )))
}

pub async fn register(
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let (token, user) = auth_service
        .register(&request.name, &request.email, &request.password)
        .await?;
    let response = LoginResponse {
        token,
        expires_in: auth_service.session_ttl_seconds(),
        user,
    };

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        response,
        "Registration successful".to_string(),
    )))
}

pub async fn logout(
    auth_service: web::Data<Arc<AuthService>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let user = get_current_user(&http_request)?;
    let token = http_request.extensions().get::<SessionToken>().cloned();
    if let Some(SessionToken(token)) = token {
        auth_service.logout(&token).await;
    }

    log::info!("User {} logged out", user.email);
    Ok(HttpResponse::Ok().json(ApiResponse::message_only("Logged out".to_string())))
}

pub async fn get_profile(http_request: HttpRequest) -> ApiResult<HttpResponse> {
    let account = get_current_user(&http_request)?;
    let permissions = sorted_permissions_for(account.role);

    Ok(HttpResponse::Ok().json(ApiResponse::success(ProfileResponse { account, permissions })))
}

pub async fn update_user_role(
    auth_service: web::Data<Arc<AuthService>>,
    path: web::Path<String>,
    request: web::Json<UpdateRoleRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let actor = require_permission(&http_request, Permission::AssignRoles)?;
    let user_id = path.into_inner();

    let updated = auth_service.update_user_role(&actor, &user_id, request.role).await?;
    let message = format!("Role of {} set to {}", updated.name, updated.role.display_name());

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(updated, message)))
}
