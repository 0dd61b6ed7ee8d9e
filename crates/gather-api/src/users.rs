use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use gather_db::fmt_ts;
use gather_types::api::{Claims, UpdateUserRequest};
use gather_types::models::AccessLevel;

use crate::auth::is_valid_email;
use crate::auth::AppState;
use crate::credentials::hash_password;
use crate::error::ApiError;
use crate::view::user_response;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.access_level != AccessLevel::Host {
        return Err(ApiError::Forbidden);
    }

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_users())
        .await
        .map_err(ApiError::internal)??;

    let users = rows
        .iter()
        .map(user_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(users))
}

/// A user may fetch their own profile; hosts may fetch anyone's.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.sub != id && claims.access_level != AccessLevel::Host {
        return Err(ApiError::Forbidden);
    }

    let db = state.clone();
    let user_id = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&user_id))
        .await
        .map_err(ApiError::internal)??
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user_response(&row)?))
}

/// Profile edit, self only. The password is rehashed only when the
/// request carries a new one; the stored hash is otherwise untouched.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.sub != id {
        return Err(ApiError::Forbidden);
    }

    let db = state.clone();
    let user_id = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&user_id))
        .await
        .map_err(ApiError::internal)??
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let first_name = req.first_name.unwrap_or_else(|| row.first_name.clone());
    let last_name = req.last_name.unwrap_or_else(|| row.last_name.clone());
    let email = req.email.unwrap_or_else(|| row.email.clone());
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(ApiError::Validation("All fields are required".into()));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email format".into()));
    }
    let password_hash = match req.password.as_deref() {
        Some(p) if !p.is_empty() => hash_password(p)?,
        _ => row.password.clone(),
    };

    let db = state.clone();
    let user_id = id.to_string();
    let now = fmt_ts(Utc::now());
    let (f, l, e, h) = (
        first_name.clone(),
        last_name.clone(),
        email.clone(),
        password_hash,
    );
    tokio::task::spawn_blocking(move || db.db.update_user(&user_id, &f, &l, &e, &h, &now))
        .await
        .map_err(ApiError::internal)??;

    let db = state.clone();
    let user_id = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&user_id))
        .await
        .map_err(ApiError::internal)??
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user_response(&row)?))
}
