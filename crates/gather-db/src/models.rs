/// Database row types — these map directly to SQLite rows.
/// Distinct from the gather-types API models to keep the DB layer
/// independent. Timestamps stay as stored text; the API layer parses them.

pub struct UserRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub access_level: i64,
    pub avatar: String,
    pub is_first_login: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub image: String,
    pub host_id: String,
    pub seats_available: i64,
    pub initial_capacity: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Event joined with its host's public fields, for event listings.
pub struct EventWithHostRow {
    pub event: EventRow,
    pub host_first_name: String,
    pub host_last_name: String,
    pub host_email: String,
    pub host_avatar: String,
}

#[derive(Debug)]
pub struct BookingRow {
    pub id: String,
    pub event_id: String,
    pub guest_id: String,
    pub status: String,
    pub host_notes: String,
    pub guest_notes: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Booking joined with its event and one counterpart user: the event's
/// host for guest listings, the booking's guest for host listings.
pub struct BookingDetailRow {
    pub booking: BookingRow,
    pub event_title: String,
    pub event_date: String,
    pub event_location: String,
    pub event_image: String,
    pub event_seats_available: i64,
    pub other_id: String,
    pub other_first_name: String,
    pub other_last_name: String,
    pub other_email: String,
    pub other_avatar: String,
}
