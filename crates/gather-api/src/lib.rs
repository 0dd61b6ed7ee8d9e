pub mod auth;
pub mod bookings;
pub mod credentials;
pub mod error;
pub mod events;
pub mod middleware;
pub mod token;
pub mod users;
mod view;
