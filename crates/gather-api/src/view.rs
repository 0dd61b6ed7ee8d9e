//! Projections from stored rows to wire responses. All the stored-text
//! parsing (ids, timestamps, enums) lives here; a value that fails to
//! parse means a corrupt row and surfaces as a 500.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use gather_db::models::{BookingDetailRow, BookingRow, EventWithHostRow, UserRow};
use gather_db::parse_ts;
use gather_types::api::{
    BookedEvent, BookingDetailResponse, BookingResponse, EventResponse, PersonSummary,
    UserResponse,
};
use gather_types::models::{AccessLevel, BookingStatus};

use crate::error::ApiError;

pub(crate) fn parse_id(s: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(s).map_err(|_| ApiError::internal(anyhow::anyhow!("corrupt id: {s}")))
}

pub(crate) fn ts(s: &str) -> Result<DateTime<Utc>, ApiError> {
    Ok(parse_ts(s)?)
}

fn status(s: &str) -> Result<BookingStatus, ApiError> {
    BookingStatus::parse(s)
        .ok_or_else(|| ApiError::internal(anyhow::anyhow!("corrupt booking status: {s}")))
}

fn seats(n: i64) -> u32 {
    u32::try_from(n).unwrap_or(0)
}

pub(crate) fn user_response(row: &UserRow) -> Result<UserResponse, ApiError> {
    let access_level = AccessLevel::from_i64(row.access_level).ok_or_else(|| {
        ApiError::internal(anyhow::anyhow!("corrupt access level: {}", row.access_level))
    })?;
    Ok(UserResponse {
        id: parse_id(&row.id)?,
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        email: row.email.clone(),
        access_level,
        avatar: row.avatar.clone(),
        is_first_login: row.is_first_login,
        created_at: ts(&row.created_at)?,
        updated_at: ts(&row.updated_at)?,
    })
}

pub(crate) fn event_response(row: &EventWithHostRow) -> Result<EventResponse, ApiError> {
    Ok(EventResponse {
        id: parse_id(&row.event.id)?,
        title: row.event.title.clone(),
        description: row.event.description.clone(),
        date: ts(&row.event.date)?,
        location: row.event.location.clone(),
        image: row.event.image.clone(),
        host: PersonSummary {
            id: parse_id(&row.event.host_id)?,
            first_name: row.host_first_name.clone(),
            last_name: row.host_last_name.clone(),
            email: row.host_email.clone(),
            avatar: row.host_avatar.clone(),
        },
        seats_available: seats(row.event.seats_available),
        created_at: ts(&row.event.created_at)?,
        updated_at: ts(&row.event.updated_at)?,
    })
}

pub(crate) fn booking_response(row: &BookingRow) -> Result<BookingResponse, ApiError> {
    Ok(BookingResponse {
        id: parse_id(&row.id)?,
        event: parse_id(&row.event_id)?,
        guest: parse_id(&row.guest_id)?,
        status: status(&row.status)?,
        host_notes: row.host_notes.clone(),
        guest_notes: row.guest_notes.clone(),
        created_at: ts(&row.created_at)?,
        updated_at: ts(&row.updated_at)?,
    })
}

/// Which side of the booking the joined counterpart user belongs on.
pub(crate) enum Counterpart {
    Host,
    Guest,
}

pub(crate) fn booking_detail_response(
    row: &BookingDetailRow,
    counterpart: Counterpart,
) -> Result<BookingDetailResponse, ApiError> {
    let person = PersonSummary {
        id: parse_id(&row.other_id)?,
        first_name: row.other_first_name.clone(),
        last_name: row.other_last_name.clone(),
        email: row.other_email.clone(),
        avatar: row.other_avatar.clone(),
    };
    let (host, guest) = match counterpart {
        Counterpart::Host => (Some(person), None),
        Counterpart::Guest => (None, Some(person)),
    };
    Ok(BookingDetailResponse {
        id: parse_id(&row.booking.id)?,
        event: BookedEvent {
            id: parse_id(&row.booking.event_id)?,
            title: row.event_title.clone(),
            date: ts(&row.event_date)?,
            location: row.event_location.clone(),
            image: row.event_image.clone(),
            seats_available: seats(row.event_seats_available),
        },
        status: status(&row.booking.status)?,
        host_notes: row.booking.host_notes.clone(),
        guest_notes: row.booking.guest_notes.clone(),
        host,
        guest,
        created_at: ts(&row.booking.created_at)?,
        updated_at: ts(&row.booking.updated_at)?,
    })
}
