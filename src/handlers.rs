// src/handlers.rs
use actix_web::HttpResponse;
use serde::Serialize;

use crate::error::ApiResult;
use crate::permissions::{list_roles, sorted_permissions_for, Permission, Role};

// ==================== COMMON STRUCTURES ====================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
        }
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: String) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleInfo {
    pub id: Role,
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: Vec<Permission>,
}

impl From<Role> for RoleInfo {
    fn from(role: Role) -> Self {
        Self {
            id: role,
            name: role.display_name(),
            description: role.description(),
            permissions: sorted_permissions_for(role),
        }
    }
}

// ==================== PUBLIC ====================

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// Roles in declaration order with their capabilities.
pub async fn get_roles() -> ApiResult<HttpResponse> {
    let roles: Vec<RoleInfo> = list_roles().into_iter().map(RoleInfo::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(roles)))
}
