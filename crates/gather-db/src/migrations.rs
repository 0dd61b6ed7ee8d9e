use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            first_name      TEXT NOT NULL,
            last_name       TEXT NOT NULL,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            access_level    INTEGER NOT NULL CHECK (access_level IN (1, 2)),
            avatar          TEXT NOT NULL DEFAULT '/images/default-avatar.png',
            is_first_login  INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id                TEXT PRIMARY KEY,
            title             TEXT NOT NULL,
            description       TEXT NOT NULL,
            date              TEXT NOT NULL,
            location          TEXT NOT NULL,
            image             TEXT NOT NULL DEFAULT '/uploads/event/default-event.png',
            host_id           TEXT NOT NULL REFERENCES users(id),
            seats_available   INTEGER NOT NULL CHECK (seats_available >= 0),
            initial_capacity  INTEGER NOT NULL CHECK (seats_available <= initial_capacity),
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_events_host
            ON events(host_id);

        CREATE INDEX IF NOT EXISTS idx_events_date
            ON events(date);

        CREATE TABLE IF NOT EXISTS bookings (
            id           TEXT PRIMARY KEY,
            event_id     TEXT NOT NULL REFERENCES events(id),
            guest_id     TEXT NOT NULL REFERENCES users(id),
            status       TEXT NOT NULL DEFAULT 'confirmed'
                             CHECK (status IN ('confirmed', 'cancelled')),
            host_notes   TEXT NOT NULL DEFAULT '',
            guest_notes  TEXT NOT NULL DEFAULT '',
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        -- One live reservation per guest per event. Keyed on confirmed rows
        -- only, so a guest may book again after cancelling.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_active
            ON bookings(event_id, guest_id) WHERE status = 'confirmed';

        CREATE INDEX IF NOT EXISTS idx_bookings_guest
            ON bookings(guest_id);

        CREATE INDEX IF NOT EXISTS idx_bookings_event
            ON bookings(event_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
