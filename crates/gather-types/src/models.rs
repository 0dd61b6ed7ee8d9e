use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a user is allowed to do. Guests book seats, hosts run events.
/// Serialized as the numeric level the API has always used (1 = guest,
/// 2 = host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AccessLevel {
    Guest = 1,
    Host = 2,
}

#[derive(Debug, Error)]
#[error("invalid access level: {0}")]
pub struct InvalidAccessLevel(pub u8);

impl TryFrom<u8> for AccessLevel {
    type Error = InvalidAccessLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AccessLevel::Guest),
            2 => Ok(AccessLevel::Host),
            other => Err(InvalidAccessLevel(other)),
        }
    }
}

impl From<AccessLevel> for u8 {
    fn from(level: AccessLevel) -> u8 {
        level as u8
    }
}

impl AccessLevel {
    pub fn from_i64(value: i64) -> Option<Self> {
        u8::try_from(value).ok().and_then(|v| AccessLevel::try_from(v).ok())
    }
}

/// Booking lifecycle. Confirmed is the initial state; cancelled is
/// terminal — a booking never transitions back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

pub const DEFAULT_AVATAR: &str = "/images/default-avatar.png";
pub const DEFAULT_EVENT_IMAGE: &str = "/uploads/event/default-event.png";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_level_round_trips_through_json() {
        let json = serde_json::to_string(&AccessLevel::Host).unwrap();
        assert_eq!(json, "2");
        let back: AccessLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccessLevel::Host);
    }

    #[test]
    fn access_level_rejects_unknown_values() {
        assert!(serde_json::from_str::<AccessLevel>("3").is_err());
        assert!(AccessLevel::from_i64(0).is_none());
        assert_eq!(AccessLevel::from_i64(1), Some(AccessLevel::Guest));
    }

    #[test]
    fn booking_status_text_forms() {
        assert_eq!(BookingStatus::Confirmed.as_str(), "confirmed");
        assert_eq!(BookingStatus::parse("cancelled"), Some(BookingStatus::Cancelled));
        assert_eq!(BookingStatus::parse("pending"), None);
    }
}
