use rusqlite::{Connection, OptionalExtension};

use gather_types::models::AccessLevel;

use crate::models::{BookingDetailRow, BookingRow, EventRow, EventWithHostRow, UserRow};
use crate::{Database, StoreError, StoreResult};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
        access_level: AccessLevel,
        avatar: &str,
        now: &str,
    ) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users
                     (id, first_name, last_name, email, password, access_level,
                      avatar, is_first_login, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
                rusqlite::params![
                    id,
                    first_name,
                    last_name,
                    email,
                    password_hash,
                    u8::from(access_level),
                    avatar,
                    now
                ],
            )
            .map_err(|e| map_unique(e, "users.email", StoreError::EmailTaken))?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn list_users(&self) -> StoreResult<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users ORDER BY created_at"
            ))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Full-row update; the handler merges partial input into the stored
    /// row first. The password value must already be hashed.
    pub fn update_user(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
        now: &str,
    ) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE users
                     SET first_name = ?2, last_name = ?3, email = ?4,
                         password = ?5, updated_at = ?6
                     WHERE id = ?1",
                    rusqlite::params![id, first_name, last_name, email, password_hash, now],
                )
                .map_err(|e| map_unique(e, "users.email", StoreError::EmailTaken))?;
            if changed == 0 {
                return Err(StoreError::UserNotFound);
            }
            Ok(())
        })
    }

    // -- Events --

    pub fn create_event(
        &self,
        id: &str,
        title: &str,
        description: &str,
        date: &str,
        location: &str,
        image: &str,
        host_id: &str,
        seats_available: u32,
        now: &str,
    ) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events
                     (id, title, description, date, location, image, host_id,
                      seats_available, initial_capacity, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9, ?9)",
                rusqlite::params![
                    id,
                    title,
                    description,
                    date,
                    location,
                    image,
                    host_id,
                    seats_available,
                    now
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_event(&self, id: &str) -> StoreResult<Option<EventRow>> {
        self.with_conn(|conn| query_event(conn, id))
    }

    pub fn get_event_with_host(&self, id: &str) -> StoreResult<Option<EventWithHostRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {EVENT_COLS}, u.first_name, u.last_name, u.email, u.avatar
                     FROM events e JOIN users u ON u.id = e.host_id
                     WHERE e.id = ?1"
                ),
                [id],
                event_with_host_from_row,
            )
            .optional()
            .map_err(StoreError::from)
        })
    }

    /// Event listing with the optional host and date-window filters.
    /// Date bounds compare lexicographically; every stored timestamp uses
    /// the same RFC 3339 UTC format, so that is equivalent to time order.
    pub fn list_events(
        &self,
        host_id: Option<&str>,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> StoreResult<Vec<EventWithHostRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {EVENT_COLS}, u.first_name, u.last_name, u.email, u.avatar
                 FROM events e JOIN users u ON u.id = e.host_id"
            );
            let mut clauses: Vec<String> = Vec::new();
            let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

            if let Some(host) = host_id.as_ref() {
                params.push(host);
                clauses.push(format!("e.host_id = ?{}", params.len()));
            }
            if let Some(from) = date_from.as_ref() {
                params.push(from);
                clauses.push(format!("e.date >= ?{}", params.len()));
            }
            if let Some(to) = date_to.as_ref() {
                params.push(to);
                clauses.push(format!("e.date <= ?{}", params.len()));
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY e.date");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), event_with_host_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Full-row update after the handler has merged partial input and
    /// checked ownership. Capacity is re-based so it always equals free
    /// seats plus currently confirmed bookings, keeping cancellation
    /// increments bounded correctly after an edit.
    pub fn update_event(
        &self,
        id: &str,
        title: &str,
        description: &str,
        date: &str,
        location: &str,
        image: &str,
        seats_available: u32,
        now: &str,
    ) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let confirmed: i64 = tx.query_row(
                "SELECT COUNT(*) FROM bookings WHERE event_id = ?1 AND status = 'confirmed'",
                [id],
                |row| row.get(0),
            )?;

            let changed = tx.execute(
                "UPDATE events
                 SET title = ?2, description = ?3, date = ?4, location = ?5,
                     image = ?6, seats_available = ?7, initial_capacity = ?8,
                     updated_at = ?9
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    title,
                    description,
                    date,
                    location,
                    image,
                    seats_available,
                    seats_available as i64 + confirmed,
                    now
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::EventNotFound);
            }

            tx.commit()?;
            Ok(())
        })
    }

    /// Removes the event and its booking history together.
    pub fn delete_event(&self, id: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM bookings WHERE event_id = ?1", [id])?;
            let changed = tx.execute("DELETE FROM events WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(StoreError::EventNotFound);
            }
            tx.commit()?;
            Ok(())
        })
    }

    // -- Bookings --

    /// Reserve one seat. The whole sequence — existence check, capacity
    /// check, duplicate check, conditional decrement, insert — commits as
    /// one transaction, so two concurrent creates against a single
    /// remaining seat cannot both succeed. Precondition failures are
    /// reported in this order: missing event, no seats, duplicate.
    pub fn create_booking(
        &self,
        id: &str,
        event_id: &str,
        guest_id: &str,
        now: &str,
    ) -> StoreResult<BookingRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let seats: Option<i64> = tx
                .query_row(
                    "SELECT seats_available FROM events WHERE id = ?1",
                    [event_id],
                    |row| row.get(0),
                )
                .optional()?;
            let seats = seats.ok_or(StoreError::EventNotFound)?;
            if seats <= 0 {
                return Err(StoreError::NoSeatsAvailable);
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM bookings
                     WHERE event_id = ?1 AND guest_id = ?2 AND status = 'confirmed'",
                    [event_id, guest_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(StoreError::AlreadyBooked);
            }

            // Guarded decrement: if another writer took the last seat
            // between our read and here, zero rows change and we bail.
            let changed = tx.execute(
                "UPDATE events
                 SET seats_available = seats_available - 1, updated_at = ?2
                 WHERE id = ?1 AND seats_available > 0",
                rusqlite::params![event_id, now],
            )?;
            if changed == 0 {
                return Err(StoreError::NoSeatsAvailable);
            }

            tx.execute(
                "INSERT INTO bookings
                     (id, event_id, guest_id, status, host_notes, guest_notes,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'confirmed', '', '', ?4, ?4)",
                rusqlite::params![id, event_id, guest_id, now],
            )
            .map_err(|e| map_unique(e, "bookings", StoreError::AlreadyBooked))?;

            let booking = query_booking(&tx, id)?.ok_or(StoreError::BookingNotFound)?;
            tx.commit()?;
            Ok(booking)
        })
    }

    /// Cancel a booking as the booking's guest or the event's host.
    /// The status flip is guarded on the prior state, and the seat is
    /// restored only when the flip actually happened — cancelling twice
    /// increments the ledger once.
    pub fn cancel_booking(
        &self,
        booking_id: &str,
        actor_id: &str,
        actor_level: AccessLevel,
        now: &str,
    ) -> StoreResult<BookingRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let target: Option<(String, String, String)> = tx
                .query_row(
                    "SELECT b.event_id, b.guest_id, e.host_id
                     FROM bookings b JOIN events e ON e.id = b.event_id
                     WHERE b.id = ?1",
                    [booking_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;
            let (event_id, guest_id, host_id) = target.ok_or(StoreError::BookingNotFound)?;

            let permitted = match actor_level {
                AccessLevel::Guest => guest_id == actor_id,
                AccessLevel::Host => host_id == actor_id,
            };
            if !permitted {
                return Err(StoreError::Forbidden);
            }

            let flipped = tx.execute(
                "UPDATE bookings
                 SET status = 'cancelled', updated_at = ?2
                 WHERE id = ?1 AND status = 'confirmed'",
                rusqlite::params![booking_id, now],
            )?;
            if flipped == 1 {
                // Bounded restore: never past the event's recorded capacity.
                tx.execute(
                    "UPDATE events
                     SET seats_available = seats_available + 1, updated_at = ?2
                     WHERE id = ?1 AND seats_available < initial_capacity",
                    rusqlite::params![event_id, now],
                )?;
            }

            let booking = query_booking(&tx, booking_id)?.ok_or(StoreError::BookingNotFound)?;
            tx.commit()?;
            Ok(booking)
        })
    }

    pub fn set_host_notes(
        &self,
        booking_id: &str,
        actor_id: &str,
        notes: &str,
        now: &str,
    ) -> StoreResult<BookingRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let host_id: Option<String> = tx
                .query_row(
                    "SELECT e.host_id
                     FROM bookings b JOIN events e ON e.id = b.event_id
                     WHERE b.id = ?1",
                    [booking_id],
                    |row| row.get(0),
                )
                .optional()?;
            let host_id = host_id.ok_or(StoreError::BookingNotFound)?;
            if host_id != actor_id {
                return Err(StoreError::Forbidden);
            }

            tx.execute(
                "UPDATE bookings SET host_notes = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![booking_id, notes, now],
            )?;

            let booking = query_booking(&tx, booking_id)?.ok_or(StoreError::BookingNotFound)?;
            tx.commit()?;
            Ok(booking)
        })
    }

    /// A guest's bookings with each event and its host joined on.
    pub fn guest_bookings(&self, guest_id: &str) -> StoreResult<Vec<BookingDetailRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLS},
                        e.title, e.date, e.location, e.image, e.seats_available,
                        u.id, u.first_name, u.last_name, u.email, u.avatar
                 FROM bookings b
                 JOIN events e ON e.id = b.event_id
                 JOIN users u ON u.id = e.host_id
                 WHERE b.guest_id = ?1
                 ORDER BY b.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([guest_id], booking_detail_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Bookings across every event the host owns, with each guest joined on.
    pub fn host_bookings(&self, host_id: &str) -> StoreResult<Vec<BookingDetailRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLS},
                        e.title, e.date, e.location, e.image, e.seats_available,
                        u.id, u.first_name, u.last_name, u.email, u.avatar
                 FROM bookings b
                 JOIN events e ON e.id = b.event_id
                 JOIN users u ON u.id = b.guest_id
                 WHERE e.host_id = ?1
                 ORDER BY b.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([host_id], booking_detail_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

const USER_COLS: &str = "id, first_name, last_name, email, password, access_level, \
                         avatar, is_first_login, created_at, updated_at";

const EVENT_COLS: &str = "e.id, e.title, e.description, e.date, e.location, e.image, \
                          e.host_id, e.seats_available, e.initial_capacity, \
                          e.created_at, e.updated_at";

const BOOKING_COLS: &str = "b.id, b.event_id, b.guest_id, b.status, b.host_notes, \
                            b.guest_notes, b.created_at, b.updated_at";

fn map_unique(err: rusqlite::Error, needle: &str, mapped: StoreError) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(needle) =>
        {
            mapped
        }
        _ => StoreError::Sqlite(err),
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password: row.get(4)?,
        access_level: row.get(5)?,
        avatar: row.get(6)?,
        is_first_login: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLS} FROM users WHERE {column} = ?1"),
        [value],
        user_from_row,
    )
    .optional()
    .map_err(StoreError::from)
}

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        date: row.get(3)?,
        location: row.get(4)?,
        image: row.get(5)?,
        host_id: row.get(6)?,
        seats_available: row.get(7)?,
        initial_capacity: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn query_event(conn: &Connection, id: &str) -> StoreResult<Option<EventRow>> {
    conn.query_row(
        &format!("SELECT {EVENT_COLS} FROM events e WHERE e.id = ?1"),
        [id],
        event_from_row,
    )
    .optional()
    .map_err(StoreError::from)
}

fn event_with_host_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventWithHostRow> {
    Ok(EventWithHostRow {
        event: event_from_row(row)?,
        host_first_name: row.get(11)?,
        host_last_name: row.get(12)?,
        host_email: row.get(13)?,
        host_avatar: row.get(14)?,
    })
}

fn booking_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingRow> {
    Ok(BookingRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        guest_id: row.get(2)?,
        status: row.get(3)?,
        host_notes: row.get(4)?,
        guest_notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn query_booking(conn: &Connection, id: &str) -> StoreResult<Option<BookingRow>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLS} FROM bookings b WHERE b.id = ?1"),
        [id],
        booking_from_row,
    )
    .optional()
    .map_err(StoreError::from)
}

fn booking_detail_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingDetailRow> {
    Ok(BookingDetailRow {
        booking: booking_from_row(row)?,
        event_title: row.get(8)?,
        event_date: row.get(9)?,
        event_location: row.get(10)?,
        event_image: row.get(11)?,
        event_seats_available: row.get(12)?,
        other_id: row.get(13)?,
        other_first_name: row.get(14)?,
        other_last_name: row.get(15)?,
        other_email: row.get(16)?,
        other_avatar: row.get(17)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use gather_types::models::{AccessLevel, DEFAULT_AVATAR, DEFAULT_EVENT_IMAGE};
    use uuid::Uuid;

    use super::*;
    use crate::fmt_ts;

    fn now() -> String {
        fmt_ts(Utc::now())
    }

    fn future_date() -> String {
        fmt_ts(Utc::now() + Duration::days(7))
    }

    fn seed_user(db: &Database, level: AccessLevel) -> String {
        let id = Uuid::new_v4().to_string();
        let email = format!("{id}@example.com");
        db.create_user(
            &id,
            "Test",
            "User",
            &email,
            "$argon2id$stub",
            level,
            DEFAULT_AVATAR,
            &now(),
        )
        .unwrap();
        id
    }

    fn seed_event(db: &Database, host_id: &str, seats: u32) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_event(
            &id,
            "Picnic",
            "A picnic in the park",
            &future_date(),
            "The park",
            DEFAULT_EVENT_IMAGE,
            host_id,
            seats,
            &now(),
        )
        .unwrap();
        id
    }

    fn seats_of(db: &Database, event_id: &str) -> i64 {
        db.get_event(event_id).unwrap().unwrap().seats_available
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(
            "u1", "A", "B", "a@b.com", "h", AccessLevel::Guest, DEFAULT_AVATAR, &now(),
        )
        .unwrap();
        let err = db
            .create_user(
                "u2", "C", "D", "a@b.com", "h", AccessLevel::Guest, DEFAULT_AVATAR, &now(),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[test]
    fn booking_decrements_seats() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 2);

        let booking = db
            .create_booking(&Uuid::new_v4().to_string(), &event, &guest, &now())
            .unwrap();
        assert_eq!(booking.status, "confirmed");
        assert_eq!(seats_of(&db, &event), 1);
    }

    #[test]
    fn booking_missing_event_fails_first() {
        let db = Database::open_in_memory().unwrap();
        let guest = seed_user(&db, AccessLevel::Guest);
        let err = db
            .create_booking("b1", "no-such-event", &guest, &now())
            .unwrap_err();
        assert!(matches!(err, StoreError::EventNotFound));
    }

    #[test]
    fn booking_full_event_fails_and_leaves_ledger_alone() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let a = seed_user(&db, AccessLevel::Guest);
        let b = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 1);

        db.create_booking("b1", &event, &a, &now()).unwrap();
        assert_eq!(seats_of(&db, &event), 0);

        let err = db.create_booking("b2", &event, &b, &now()).unwrap_err();
        assert!(matches!(err, StoreError::NoSeatsAvailable));
        assert_eq!(seats_of(&db, &event), 0);
    }

    #[test]
    fn double_booking_same_guest_fails() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 5);

        db.create_booking("b1", &event, &guest, &now()).unwrap();
        let err = db.create_booking("b2", &event, &guest, &now()).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyBooked));
        assert_eq!(seats_of(&db, &event), 4);
    }

    #[test]
    fn contended_bookings_respect_capacity() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let host = seed_user(&db, AccessLevel::Host);
        let event = seed_event(&db, &host, 3);
        let guests: Vec<String> =
            (0..8).map(|_| seed_user(&db, AccessLevel::Guest)).collect();

        let handles: Vec<_> = guests
            .into_iter()
            .map(|guest| {
                let db = Arc::clone(&db);
                let event = event.clone();
                std::thread::spawn(move || {
                    db.create_booking(&Uuid::new_v4().to_string(), &event, &guest, &now())
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 3);
        assert_eq!(seats_of(&db, &event), 0);
    }

    #[test]
    fn contended_duplicate_bookings_admit_exactly_one() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 10);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                let event = event.clone();
                let guest = guest.clone();
                std::thread::spawn(move || {
                    db.create_booking(&Uuid::new_v4().to_string(), &event, &guest, &now())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StoreError::AlreadyBooked)));
        assert_eq!(seats_of(&db, &event), 9);
    }

    #[test]
    fn cancel_restores_seat_once() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 1);

        db.create_booking("b1", &event, &guest, &now()).unwrap();
        assert_eq!(seats_of(&db, &event), 0);

        let cancelled = db
            .cancel_booking("b1", &guest, AccessLevel::Guest, &now())
            .unwrap();
        assert_eq!(cancelled.status, "cancelled");
        assert_eq!(seats_of(&db, &event), 1);

        // Second cancel is a no-op on the ledger.
        let again = db
            .cancel_booking("b1", &guest, AccessLevel::Guest, &now())
            .unwrap();
        assert_eq!(again.status, "cancelled");
        assert_eq!(seats_of(&db, &event), 1);
    }

    #[test]
    fn cancel_requires_participant() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let other_host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let stranger = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 2);
        db.create_booking("b1", &event, &guest, &now()).unwrap();

        let err = db
            .cancel_booking("b1", &stranger, AccessLevel::Guest, &now())
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));

        let err = db
            .cancel_booking("b1", &other_host, AccessLevel::Host, &now())
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));

        // The owning host may cancel on the guest's behalf.
        db.cancel_booking("b1", &host, AccessLevel::Host, &now())
            .unwrap();
        assert_eq!(seats_of(&db, &event), 2);
    }

    #[test]
    fn rebooking_after_cancellation_is_allowed() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 1);

        db.create_booking("b1", &event, &guest, &now()).unwrap();
        db.cancel_booking("b1", &guest, AccessLevel::Guest, &now())
            .unwrap();

        db.create_booking("b2", &event, &guest, &now()).unwrap();
        assert_eq!(seats_of(&db, &event), 0);
    }

    #[test]
    fn host_notes_permitted_on_cancelled_booking() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 1);

        db.create_booking("b1", &event, &guest, &now()).unwrap();
        db.cancel_booking("b1", &guest, AccessLevel::Guest, &now())
            .unwrap();

        let updated = db
            .set_host_notes("b1", &host, "no-show refunded", &now())
            .unwrap();
        assert_eq!(updated.host_notes, "no-show refunded");

        let err = db
            .set_host_notes("b1", &guest, "not my field", &now())
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));
    }

    #[test]
    fn booking_listings_join_counterparties() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 4);
        db.create_booking("b1", &event, &guest, &now()).unwrap();

        let mine = db.guest_bookings(&guest).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].other_id, host);
        assert_eq!(mine[0].event_title, "Picnic");

        let theirs = db.host_bookings(&host).unwrap();
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].other_id, guest);
    }

    #[test]
    fn event_update_rebases_capacity_around_confirmed_bookings() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 2);
        db.create_booking("b1", &event, &guest, &now()).unwrap();

        // Host grows the room: 5 free seats on top of the 1 booked.
        db.update_event(
            &event,
            "Picnic",
            "Bigger park",
            &future_date(),
            "The park",
            DEFAULT_EVENT_IMAGE,
            5,
            &now(),
        )
        .unwrap();

        let row = db.get_event(&event).unwrap().unwrap();
        assert_eq!(row.seats_available, 5);
        assert_eq!(row.initial_capacity, 6);

        // Cancelling the old booking still fits under capacity.
        db.cancel_booking("b1", &guest, AccessLevel::Guest, &now())
            .unwrap();
        assert_eq!(seats_of(&db, &event), 6);
    }

    #[test]
    fn delete_event_takes_bookings_with_it() {
        let db = Database::open_in_memory().unwrap();
        let host = seed_user(&db, AccessLevel::Host);
        let guest = seed_user(&db, AccessLevel::Guest);
        let event = seed_event(&db, &host, 2);
        db.create_booking("b1", &event, &guest, &now()).unwrap();

        db.delete_event(&event).unwrap();
        assert!(db.get_event(&event).unwrap().is_none());
        assert!(db.guest_bookings(&guest).unwrap().is_empty());

        let err = db.delete_event(&event).unwrap_err();
        assert!(matches!(err, StoreError::EventNotFound));
    }
}
