//! User API endpoints.
//!
//! RESTful routes for user management. Handlers validate payload shapes,
//! then hand off to the `portal-users` store inside `spawn_blocking` so the
//! async runtime never blocks on SQLite.

use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
};
use portal_users::{
    create_user, delete_user, get_user, list_users, search_users, update_user, NewUser, User,
    UserError, UserPatch,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Maximum length for a user name.
const MAX_NAME_LEN: usize = 100;
/// Maximum length for an email address.
const MAX_EMAIL_LEN: usize = 255;
/// Password length bounds.
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 100;
/// List pagination defaults and caps.
const DEFAULT_LIST_LIMIT: u32 = 100;
const MAX_LIST_LIMIT: u32 = 500;
/// Search defaults and caps.
const DEFAULT_SEARCH_LIMIT: u32 = 50;
const MAX_SEARCH_LIMIT: u32 = 200;
const MAX_SEARCH_TERM_LEN: usize = 100;

/// Maps a [`UserError`] to the correct HTTP status code, logging non-client
/// errors.
///
/// `NotFound` → 404, `EmailTaken` → 409, everything else → 500.
fn user_err_to_status(e: UserError) -> StatusCode {
    match e {
        UserError::NotFound(_) => StatusCode::NOT_FOUND,
        UserError::EmailTaken(_) => StatusCode::CONFLICT,
        ref err => {
            tracing::error!(error = %err, "user operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Cheap structural email check; real validation is delivery.
fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn envelope(message: &str, data: Value) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

#[derive(Deserialize, Default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<u32>,
}

fn validate_name(name: &str) -> Result<(), StatusCode> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), StatusCode> {
    if email.len() > MAX_EMAIL_LEN || !looks_like_email(email) {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), StatusCode> {
    if password.len() < MIN_PASSWORD_LEN || password.len() > MAX_PASSWORD_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

/// POST /api/v1/users
pub async fn create_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    validate_name(&payload.name)?;
    validate_email(&payload.email)?;
    if let Some(ref password) = payload.password {
        validate_password(password)?;
    }

    let params = NewUser {
        name: payload.name,
        email: payload.email,
        password: payload.password,
        is_active: payload.is_active,
    };

    let pool = state.pool.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection for create_user");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        create_user(&conn, &params).map_err(user_err_to_status)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "create_user task join error");
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok((
        StatusCode::CREATED,
        envelope("user created", serde_json::to_value(user).unwrap_or(Value::Null)),
    ))
}

/// GET /api/v1/users
pub async fn list_users_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, StatusCode> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let pool = state.pool.clone();
    let users: Vec<User> = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection for list_users");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        list_users(&conn, limit, offset).map_err(user_err_to_status)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "list_users task join error");
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    let message = format!("retrieved {} users", users.len());
    Ok(envelope(
        &message,
        serde_json::to_value(users).unwrap_or(Value::Null),
    ))
}

/// GET /api/v1/users/{id}
pub async fn get_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    let pool = state.pool.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection for get_user");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        get_user(&conn, id).map_err(user_err_to_status)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "get_user task join error");
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(envelope(
        "user retrieved",
        serde_json::to_value(user).unwrap_or(Value::Null),
    ))
}

/// PUT /api/v1/users/{id}
pub async fn update_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<Value>, StatusCode> {
    if let Some(ref name) = payload.name {
        validate_name(name)?;
    }
    if let Some(ref email) = payload.email {
        validate_email(email)?;
    }

    let patch = UserPatch {
        name: payload.name,
        email: payload.email,
        is_active: payload.is_active,
    };

    let pool = state.pool.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection for update_user");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        update_user(&conn, id, &patch).map_err(user_err_to_status)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "update_user task join error");
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(envelope(
        "user updated",
        serde_json::to_value(user).unwrap_or(Value::Null),
    ))
}

/// DELETE /api/v1/users/{id}
pub async fn delete_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection for delete_user");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        delete_user(&conn, id).map_err(user_err_to_status)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "delete_user task join error");
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(envelope("user deleted", Value::Null))
}

/// GET /api/v1/users/search
pub async fn search_users_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, StatusCode> {
    if params.q.is_empty() || params.q.len() > MAX_SEARCH_TERM_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let pool = state.pool.clone();
    let term = params.q;
    let users: Vec<User> = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection for search_users");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        search_users(&conn, &term, limit).map_err(user_err_to_status)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "search_users task join error");
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    let message = format!("found {} matching users", users.len());
    Ok(envelope(
        &message,
        serde_json::to_value(users).unwrap_or(Value::Null),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("ada@example.com"));
        assert!(looks_like_email("a.b+c@sub.example.org"));
        assert!(!looks_like_email("no-at-sign"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ada@nodot"));
        assert!(!looks_like_email("ada@.example.com"));
        assert!(!looks_like_email("ada@example.com."));
    }
}
