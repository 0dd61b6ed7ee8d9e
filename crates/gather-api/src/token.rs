//! Stateless session tokens: a signed, expiring claim bundle. There is no
//! revocation list; expiry is the only invalidation.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use gather_types::api::{Claims, UserResponse};

/// Uniform session lifetime for every issued token.
pub const TOKEN_TTL_HOURS: i64 = 24;

pub fn issue_token(secret: &str, user: &UserResponse) -> anyhow::Result<String> {
    let exp = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;
    let claims = Claims {
        sub: user.id,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        access_level: user.access_level,
        is_first_login: user.is_first_login,
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Fails closed: signature mismatch, expiry, and malformed input all come
/// back as errors — a decode failure is never treated as a valid session.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
