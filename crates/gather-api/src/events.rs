use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use gather_db::fmt_ts;
use gather_db::models::EventWithHostRow;
use gather_types::api::{
    Claims, CreateEventRequest, EventQuery, MessageResponse, UpdateEventRequest,
};
use gather_types::models::{AccessLevel, DEFAULT_EVENT_IMAGE};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::view::event_response;

const MAX_TITLE_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = match query.date_range.as_deref() {
        None => None,
        Some(range) => Some(
            date_window(range, Utc::now())
                .ok_or_else(|| ApiError::Validation("Invalid date range".into()))?,
        ),
    };

    let db = state.clone();
    let host = query.host.map(|h| h.to_string());
    let bounds = window.map(|(from, to)| (fmt_ts(from), fmt_ts(to)));
    let rows = tokio::task::spawn_blocking(move || {
        db.db.list_events(
            host.as_deref(),
            bounds.as_ref().map(|(f, _)| f.as_str()),
            bounds.as_ref().map(|(_, t)| t.as_str()),
        )
    })
    .await
    .map_err(ApiError::internal)??;

    let events = rows
        .iter()
        .map(event_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_event_with_host(&id.to_string()))
        .await
        .map_err(ApiError::internal)??
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
    Ok(Json(event_response(&row)?))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.access_level != AccessLevel::Host {
        return Err(ApiError::Forbidden);
    }
    validate_text(&req.title, &req.description)?;
    if req.date <= Utc::now() {
        return Err(ApiError::Validation("Date must be in the future".into()));
    }
    if req.location.trim().is_empty() {
        return Err(ApiError::Validation("Location is required".into()));
    }

    let event_id = Uuid::new_v4();
    let image = req.image.unwrap_or_else(|| DEFAULT_EVENT_IMAGE.into());
    let db = state.clone();
    let id = event_id.to_string();
    let host_id = claims.sub.to_string();
    let (title, description, location) =
        (req.title.clone(), req.description.clone(), req.location.clone());
    let (date, image_path, seats) = (fmt_ts(req.date), image, req.seats_available);
    let now = fmt_ts(Utc::now());
    tokio::task::spawn_blocking(move || {
        db.db.create_event(
            &id,
            &title,
            &description,
            &date,
            &location,
            &image_path,
            &host_id,
            seats,
            &now,
        )
    })
    .await
    .map_err(ApiError::internal)??;

    info!("event {} created by host {}", event_id, claims.sub);

    let db = state.clone();
    let id = event_id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_event_with_host(&id))
        .await
        .map_err(ApiError::internal)??
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
    Ok((StatusCode::CREATED, Json(event_response(&row)?)))
}

pub async fn update_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = owned_event(&state, &claims, id).await?;
    let event = &row.event;

    let title = req.title.unwrap_or_else(|| event.title.clone());
    let description = req.description.unwrap_or_else(|| event.description.clone());
    validate_text(&title, &description)?;
    let date = req.date.map(fmt_ts).unwrap_or_else(|| event.date.clone());
    let location = req.location.unwrap_or_else(|| event.location.clone());
    let image = req.image.unwrap_or_else(|| event.image.clone());
    let seats = req
        .seats_available
        .unwrap_or(u32::try_from(event.seats_available).unwrap_or(0));

    let db = state.clone();
    let event_id = id.to_string();
    let now = fmt_ts(Utc::now());
    tokio::task::spawn_blocking(move || {
        db.db.update_event(
            &event_id,
            &title,
            &description,
            &date,
            &location,
            &image,
            seats,
            &now,
        )
    })
    .await
    .map_err(ApiError::internal)??;

    let db = state.clone();
    let event_id = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_event_with_host(&event_id))
        .await
        .map_err(ApiError::internal)??
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
    Ok(Json(event_response(&row)?))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    owned_event(&state, &claims, id).await?;

    let db = state.clone();
    let event_id = id.to_string();
    tokio::task::spawn_blocking(move || db.db.delete_event(&event_id))
        .await
        .map_err(ApiError::internal)??;

    info!("event {} deleted by host {}", id, claims.sub);
    Ok(Json(MessageResponse {
        message: "Event deleted".into(),
    }))
}

/// Fetches the event and enforces the owning-host access rule shared by
/// update and delete.
async fn owned_event(
    state: &AppState,
    claims: &Claims,
    id: Uuid,
) -> Result<EventWithHostRow, ApiError> {
    if claims.access_level != AccessLevel::Host {
        return Err(ApiError::Forbidden);
    }
    let db = state.clone();
    let event_id = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_event_with_host(&event_id))
        .await
        .map_err(ApiError::internal)??
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;
    if row.event.host_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden);
    }
    Ok(row)
}

fn validate_text(title: &str, description: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() || description.trim().is_empty() {
        return Err(ApiError::Validation(
            "Title and description are required".into(),
        ));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(ApiError::Validation(
            "Title cannot exceed 100 characters".into(),
        ));
    }
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::Validation(
            "Description cannot exceed 1000 characters".into(),
        ));
    }
    Ok(())
}

/// Resolves the named range to an inclusive UTC window: `weekend` is the
/// coming Friday through Sunday, `nextWeek` is Monday through Sunday of
/// the following week.
fn date_window(range: &str, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let today = now.date_naive();
    let dow = i64::from(today.weekday().num_days_from_sunday());
    match range {
        "weekend" => {
            let friday = today + Duration::days((5 - dow).rem_euclid(7));
            let sunday = friday + Duration::days(2);
            Some((
                friday.and_hms_opt(0, 0, 0)?.and_utc(),
                sunday.and_hms_opt(23, 59, 59)?.and_utc(),
            ))
        }
        "nextWeek" => {
            // The coming Monday, or a week out when today is Monday.
            let until_monday = match (1 - dow).rem_euclid(7) {
                0 => 7,
                d => d,
            };
            let monday = today + Duration::days(until_monday);
            let sunday = monday + Duration::days(6);
            Some((
                monday.and_hms_opt(0, 0, 0)?.and_utc(),
                sunday.and_hms_opt(23, 59, 59)?.and_utc(),
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn weekend_window_from_midweek() {
        // Wednesday 2026-08-26.
        let now = Utc.with_ymd_and_hms(2026, 8, 26, 15, 0, 0).unwrap();
        let (from, to) = date_window("weekend", now).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 8, 28, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2026, 8, 30, 23, 59, 59).unwrap());
    }

    #[test]
    fn weekend_window_on_friday_starts_today() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 9, 0, 0).unwrap();
        let (from, _) = date_window("weekend", now).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 8, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn next_week_window_spans_monday_to_sunday() {
        // Wednesday 2026-08-26 — next week is Aug 31 .. Sep 6.
        let now = Utc.with_ymd_and_hms(2026, 8, 26, 15, 0, 0).unwrap();
        let (from, to) = date_window("nextWeek", now).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 8, 31, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2026, 9, 6, 23, 59, 59).unwrap());
    }

    #[test]
    fn next_week_from_monday_is_the_following_monday() {
        let now = Utc.with_ymd_and_hms(2026, 8, 31, 8, 0, 0).unwrap();
        let (from, _) = date_window("nextWeek", now).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 9, 7, 0, 0, 0).unwrap());
    }

    #[test]
    fn unknown_range_is_rejected() {
        assert!(date_window("tomorrow", Utc::now()).is_none());
    }
}
