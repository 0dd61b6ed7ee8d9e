use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use gather_db::{Database, fmt_ts};
use gather_types::api::{AuthResponse, Claims, SigninRequest, SignupRequest, UserResponse};
use gather_types::models::{AccessLevel, DEFAULT_AVATAR};

use crate::credentials::{hash_password, verify_password};
use crate::error::ApiError;
use crate::token::issue_token;
use crate::view::user_response;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.first_name.trim().is_empty()
        || req.last_name.trim().is_empty()
        || req.email.trim().is_empty()
        || req.password.is_empty()
    {
        return Err(ApiError::Validation("All fields are required".into()));
    }
    let access_level = AccessLevel::try_from(req.access_level)
        .map_err(|_| ApiError::Validation("Invalid access level".into()))?;
    if !is_valid_email(&req.email) {
        return Err(ApiError::Validation("Invalid email format".into()));
    }

    let db = state.clone();
    let email = req.email.clone();
    let existing = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&email))
        .await
        .map_err(ApiError::internal)??;
    if existing.is_some() {
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    // Plaintext stops here; only the hash is ever persisted.
    let password_hash = hash_password(&req.password)?;

    let user_id = Uuid::new_v4();
    let now = Utc::now();
    let db = state.clone();
    let id = user_id.to_string();
    let (first_name, last_name, email) =
        (req.first_name.clone(), req.last_name.clone(), req.email.clone());
    let stamp = fmt_ts(now);
    tokio::task::spawn_blocking(move || {
        db.db.create_user(
            &id,
            &first_name,
            &last_name,
            &email,
            &password_hash,
            access_level,
            DEFAULT_AVATAR,
            &stamp,
        )
    })
    .await
    .map_err(ApiError::internal)??;

    info!("new {:?} signup: {}", access_level, user_id);

    let user = UserResponse {
        id: user_id,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        access_level,
        avatar: DEFAULT_AVATAR.into(),
        is_first_login: true,
        created_at: now,
        updated_at: now,
    };
    let access_token = issue_token(&state.jwt_secret, &user).map_err(ApiError::internal)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse { access_token, user }),
    ))
}

pub async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".into(),
        ));
    }

    let db = state.clone();
    let email = req.email.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&email))
        .await
        .map_err(ApiError::internal)??
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&req.password, &row.password)? {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let user = user_response(&row)?;
    let access_token = issue_token(&state.jwt_secret, &user).map_err(ApiError::internal)?;

    Ok(Json(AuthResponse { access_token, user }))
}

/// Confirms the presented token still maps to a live account and returns
/// the fresh profile.
pub async fn validate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let id = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&id))
        .await
        .map_err(ApiError::internal)??
        .ok_or_else(|| ApiError::Unauthorized("Invalid token".into()))?;

    Ok(Json(user_response(&row)?))
}

/// Structural email check: one @, a non-empty local part, and a dotted
/// domain. Deliverability is the mail server's problem.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && tld.len() >= 2,
        None => false,
    }
}
