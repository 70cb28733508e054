// src/auth.rs
use std::collections::HashMap;
use std::sync::Arc;

use actix_web::dev::ServiceRequest;
use actix_web::{web, HttpMessage, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::Validate;

use crate::config::{AuthConfig, MAX_SESSION_TTL_HOURS};
use crate::error::{ApiError, ApiResult};
use crate::notebook::models::validate_not_blank;
use crate::permissions::{has_permission, Permission, Role};

const DEMO_PASSWORD: &str = "password123";

// ======== ACCOUNTS ========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

struct StoredAccount {
    account: Account,
    password: String,
}

struct Session {
    user_id: String,
    expires_at: DateTime<Utc>,
}

// ======== REQUEST/RESPONSE STRUCTS ========

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: Account,
}

// ======== AUTH SERVICE ========

/// In-process accounts and bearer sessions.
pub struct AuthService {
    accounts: RwLock<HashMap<String, StoredAccount>>,
    sessions: RwLock<HashMap<String, Session>>,
    session_ttl: Duration,
    allow_self_registration: bool,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut accounts = HashMap::new();
        if config.demo_accounts {
            for stored in demo_accounts() {
                accounts.insert(stored.account.id.clone(), stored);
            }
        }

        Self {
            accounts: RwLock::new(accounts),
            sessions: RwLock::new(HashMap::new()),
            session_ttl: Duration::hours(config.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS)),
            allow_self_registration: config.allow_self_registration,
        }
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl.num_seconds()
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(String, Account)> {
        let account = {
            let accounts = self.accounts.read().await;
            accounts
                .values()
                .find(|stored| stored.account.email.eq_ignore_ascii_case(email.trim()) && stored.password == password)
                .map(|stored| stored.account.clone())
                .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?
        };

        let token = self.open_session(&account.id).await?;
        log::info!("User {} logged in", account.email);
        Ok((token, account))
    }

    /// Creates a guest account and signs it in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ApiResult<(String, Account)> {
        if !self.allow_self_registration {
            return Err(ApiError::Forbidden("Self registration is disabled".to_string()));
        }

        let email = email.trim().to_lowercase();
        let account = {
            let mut accounts = self.accounts.write().await;
            if accounts.values().any(|stored| stored.account.email.eq_ignore_ascii_case(&email)) {
                return Err(ApiError::validation_failed("email", "an account with this email already exists"));
            }

            let account = Account {
                id: Uuid::new_v4().to_string(),
                name: name.trim().to_string(),
                email,
                role: Role::Guest,
                avatar: None,
            };
            accounts.insert(
                account.id.clone(),
                StoredAccount {
                    account: account.clone(),
                    password: password.to_string(),
                },
            );
            account
        };

        let token = self.open_session(&account.id).await?;
        log::info!("Registered new guest account {}", account.email);
        Ok((token, account))
    }

    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// The account behind `token`, with its current role. Expired sessions
    /// are dropped on sight.
    pub async fn resolve(&self, token: &str) -> Option<Account> {
        let user_id = {
            let sessions = self.sessions.read().await;
            let session = sessions.get(token)?;
            if session.expires_at > Utc::now() {
                Some(session.user_id.clone())
            } else {
                None
            }
        };

        match user_id {
            Some(user_id) => self.find_account(&user_id).await,
            None => {
                self.sessions.write().await.remove(token);
                None
            }
        }
    }

    pub async fn find_account(&self, user_id: &str) -> Option<Account> {
        self.accounts
            .read()
            .await
            .get(user_id)
            .map(|stored| stored.account.clone())
    }

    pub async fn update_user_role(&self, actor: &Account, user_id: &str, role: Role) -> ApiResult<Account> {
        if !actor.role.can(Permission::AssignRoles) {
            return Err(ApiError::insufficient_permissions());
        }
        if actor.id == user_id {
            return Err(ApiError::BadRequest("You cannot change your own role".to_string()));
        }

        let mut accounts = self.accounts.write().await;
        let stored = accounts
            .get_mut(user_id)
            .ok_or_else(|| ApiError::user_not_found(user_id))?;
        stored.account.role = role;

        log::info!("User {} changed role of {} to {}", actor.email, stored.account.email, role);
        Ok(stored.account.clone())
    }

    async fn open_session(&self, user_id: &str) -> ApiResult<String> {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .ok_or_else(|| ApiError::InternalServerError("Session expiry out of range".to_string()))?;

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(
            token.clone(),
            Session {
                user_id: user_id.to_string(),
                expires_at,
            },
        );
        Ok(token)
    }

    #[cfg(test)]
    async fn expire_sessions(&self) {
        let past = Utc::now() - Duration::seconds(1);
        for session in self.sessions.write().await.values_mut() {
            session.expires_at = past;
        }
    }
}

fn demo_accounts() -> Vec<StoredAccount> {
    [
        ("1", "Admin User", "admin@example.com", Role::Admin, "/admin-avatar.jpg"),
        ("2", "Researcher", "researcher@example.com", Role::Researcher, "/researcher-avatar.jpg"),
        ("3", "Technician", "technician@example.com", Role::Technician, "/technician-avatar.jpg"),
        ("4", "Guest User", "guest@example.com", Role::Guest, "/guest-avatar.jpg"),
    ]
    .into_iter()
    .map(|(id, name, email, role, avatar)| StoredAccount {
        account: Account {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            avatar: Some(avatar.to_string()),
        },
        password: DEMO_PASSWORD.to_string(),
    })
    .collect()
}

// ======== HELPER FUNCTIONS ========

/// Bearer token of the request, as seen by the session middleware.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

pub fn get_current_user(req: &HttpRequest) -> ApiResult<Account> {
    req.extensions()
        .get::<Account>()
        .cloned()
        .ok_or_else(ApiError::not_authenticated)
}

/// 401 when nobody is signed in, 403 when the role lacks `permission`.
pub fn require_permission(req: &HttpRequest, permission: Permission) -> ApiResult<Account> {
    let account = get_current_user(req)?;
    if has_permission(Some(account.role), permission) {
        Ok(account)
    } else {
        log::warn!("{} ({}) denied {}", account.email, account.role, permission);
        Err(ApiError::insufficient_permissions())
    }
}

// ======== SESSION MIDDLEWARE ========

pub async fn session_middleware(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let auth_service = match req.app_data::<web::Data<Arc<AuthService>>>() {
        Some(svc) => svc.clone(),
        None => {
            log::error!("AuthService not found in app data");
            return Err((
                ApiError::InternalServerError("Auth service not available".to_string()).into(),
                req,
            ));
        }
    };

    let token = credentials.token().to_string();
    match auth_service.resolve(&token).await {
        Some(account) => {
            req.extensions_mut().insert(account);
            req.extensions_mut().insert(SessionToken(token));
            Ok(req)
        }
        None => {
            log::warn!("Rejected unknown or expired session token");
            Err((
                ApiError::Unauthorized("Invalid or expired session".to_string()).into(),
                req,
            ))
        }
    }
}
