use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use gather_db::fmt_ts;
use gather_types::api::{Claims, CreateBookingRequest, HostNotesRequest};
use gather_types::models::AccessLevel;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::view::{Counterpart, booking_detail_response, booking_response};

/// Reserve a seat. The storage layer runs the whole precondition chain
/// and the seat decrement as one transaction.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.access_level != AccessLevel::Guest {
        return Err(ApiError::Forbidden);
    }

    let booking_id = Uuid::new_v4();
    let db = state.clone();
    let id = booking_id.to_string();
    let event_id = req.event_id.to_string();
    let guest_id = claims.sub.to_string();
    let now = fmt_ts(Utc::now());
    let row =
        tokio::task::spawn_blocking(move || db.db.create_booking(&id, &event_id, &guest_id, &now))
            .await
            .map_err(ApiError::internal)??;

    info!(
        "guest {} booked event {} (booking {})",
        claims.sub, req.event_id, booking_id
    );
    Ok((StatusCode::CREATED, Json(booking_response(&row)?)))
}

pub async fn guest_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.access_level != AccessLevel::Guest {
        return Err(ApiError::Forbidden);
    }

    let db = state.clone();
    let guest_id = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.guest_bookings(&guest_id))
        .await
        .map_err(ApiError::internal)??;

    let bookings = rows
        .iter()
        .map(|row| booking_detail_response(row, Counterpart::Host))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(bookings))
}

pub async fn host_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.access_level != AccessLevel::Host {
        return Err(ApiError::Forbidden);
    }

    let db = state.clone();
    let host_id = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.host_bookings(&host_id))
        .await
        .map_err(ApiError::internal)??;

    let bookings = rows
        .iter()
        .map(|row| booking_detail_response(row, Counterpart::Guest))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(bookings))
}

/// Cancel as the booking's guest or the event's host. Cancellation is
/// terminal and idempotent; the seat goes back to the ledger once.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let booking_id = id.to_string();
    let actor_id = claims.sub.to_string();
    let level = claims.access_level;
    let now = fmt_ts(Utc::now());
    let row = tokio::task::spawn_blocking(move || {
        db.db.cancel_booking(&booking_id, &actor_id, level, &now)
    })
    .await
    .map_err(ApiError::internal)??;

    info!("booking {} cancelled by {}", id, claims.sub);
    Ok(Json(booking_response(&row)?))
}

pub async fn set_host_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<HostNotesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.access_level != AccessLevel::Host {
        return Err(ApiError::Forbidden);
    }

    let db = state.clone();
    let booking_id = id.to_string();
    let actor_id = claims.sub.to_string();
    let now = fmt_ts(Utc::now());
    let row = tokio::task::spawn_blocking(move || {
        db.db.set_host_notes(&booking_id, &actor_id, &req.notes, &now)
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(booking_response(&row)?))
}
